//! Pulsewatch - Pulse-burst monitor
//!
//! Runs the burst monitor against a simulated line driven by a periodic
//! burst pattern, printing the latest burst and the rolling-average reports.

use anyhow::{Context, Result};
use clap::Parser;
use pulsewatch::{
    BurstGenerator, BurstMonitor, Clock, MonitorConfig, PublishedStatus, SimulatedLine,
    StatsReport, SystemClock,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Interval of the status readout, matching one report period
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "pulsewatch", version, about = "Pulse-burst detector and rolling statistics monitor")]
struct Args {
    /// Config file (default: <data_dir>/pulsewatch/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Line to monitor (overrides the config file)
    #[arg(long)]
    pin: Option<u8>,

    /// Pulses per simulated burst
    #[arg(long, default_value_t = 20)]
    pulses: u16,

    /// Full period of one simulated pulse in µs
    #[arg(long, default_value_t = 100)]
    pulse_period_us: u32,

    /// Silence between simulated bursts in ms
    #[arg(long, default_value_t = 50)]
    off_period_ms: u32,

    /// Make every Nth simulated burst oversized
    #[arg(long)]
    outlier_every: Option<u32>,

    /// Stop after this many seconds (0 = until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,

    /// Write the effective config back to the config file
    #[arg(long)]
    save_config: bool,
}

/// Config file path: `<data_dir>/pulsewatch/config.json`
fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pulsewatch")
        .join("config.json")
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pulsewatch=info".parse()?),
        )
        .init();

    let args = Args::parse();

    println!(
        "Pulsewatch v{} ({}) - Pulse Burst Monitor",
        pulsewatch::VERSION,
        pulsewatch::BUILD_DATE
    );
    println!();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config = MonitorConfig::load(&config_path);
    if let Some(pin) = args.pin {
        config.monitor_pin = pin;
    }
    config
        .validate()
        .context("Invalid monitor configuration")?;

    if args.save_config {
        config
            .save(&config_path)
            .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
    }

    run(&args, config)
}

fn run(args: &Args, config: MonitorConfig) -> Result<()> {
    let pin = config.monitor_pin;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let line = Arc::new(SimulatedLine::new([pin]));

    let mut monitor = BurstMonitor::new(config, Arc::clone(&clock), line.clone());
    monitor.init(pin).context("Failed to initialize monitor")?;
    monitor.start().context("Failed to start monitor")?;
    let reports = monitor.reports();

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let generator = BurstGenerator::new(
        args.pulses,
        args.pulse_period_us,
        args.off_period_ms.saturating_mul(1_000),
    );
    info!(
        pin,
        pulses = generator.pulses_per_burst(),
        pulse_period_us = generator.pulse_period_us(),
        off_period_us = generator.off_period_us(),
        "Simulated burst pattern"
    );
    let driver = spawn_driver(
        generator,
        line,
        pin,
        args.outlier_every,
        Arc::clone(&running),
    )?;

    println!("Monitoring pin {}. Press Ctrl+C to stop.", pin);
    println!();

    let started = Instant::now();
    let deadline = (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs));
    let mut last_status = String::new();

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }

        match monitor.read_latest(Duration::from_millis(100)) {
            Ok(Some(status)) => {
                let line = status_line(&status);
                if line != last_status {
                    println!("{}", line);
                    last_status = line;
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to read latest burst");
                break;
            }
        }

        for report in reports.try_iter() {
            print_report(&report, args.json)?;
        }

        std::thread::sleep(STATUS_INTERVAL);
    }

    println!();
    println!("Stopping...");
    running.store(false, Ordering::SeqCst);
    if driver.join().is_err() {
        error!("Burst driver panicked");
    }
    monitor.stop()?;
    println!("Done.");

    Ok(())
}

/// Toggle `pin` on the generator's schedule until `running` is cleared
fn spawn_driver(
    mut generator: BurstGenerator,
    line: Arc<SimulatedLine>,
    pin: u8,
    outlier_every: Option<u32>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let normal_pulses = generator.pulses_per_burst();
    let outlier_pulses = pulsewatch::MAX_PULSE_COUNT.saturating_add(5);

    std::thread::Builder::new()
        .name("burst-driver".to_string())
        .spawn(move || {
            let origin = Instant::now();
            let mut burst_index = 0u32;

            while running.load(Ordering::Relaxed) {
                let (at_us, is_burst_start) = generator.next_edge();
                if is_burst_start {
                    burst_index = burst_index.wrapping_add(1);
                    let next_is_outlier =
                        outlier_every.is_some_and(|n| n > 0 && (burst_index + 1) % n == 0);
                    generator.set_pulses_per_burst(if next_is_outlier {
                        outlier_pulses
                    } else {
                        normal_pulses
                    });
                }

                let target = origin + Duration::from_micros(at_us);
                let now = Instant::now();
                if target > now {
                    std::thread::sleep(target - now);
                }
                line.toggle(pin);
            }
        })
        .context("Failed to spawn burst driver")
}

fn status_line(status: &PublishedStatus) -> String {
    let state = if status.active { "ACTIVE" } else { "IDLE" };
    match &status.record {
        Some(r) => format!(
            "Burst: {:>3} pulses | {:>8.2} kHz | First: {:>4} us | Burst: {:>6} us | Off: {:>7.2} ms | {}",
            r.pulse_count,
            r.frequency_khz,
            r.first_pulse_period_us,
            r.burst_duration_us,
            r.off_period_us as f32 / 1000.0,
            state
        ),
        None => format!("Burst: waiting for first burst | {}", state),
    }
}

fn print_report(report: &StatsReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!();
        println!("{}", report);
        println!();
    }
    Ok(())
}
