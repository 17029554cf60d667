//! Criterion benchmarks for the burst pipeline.
//!
//! The edge handler runs once per transition, so it is the hot path; the
//! poll cycle and window means run at most once per poll interval.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pulsewatch_core::pulse::generator::BurstGenerator;
use pulsewatch_core::pulse::poller::BurstPoller;
use pulsewatch_core::pulse::publisher::ResultPublisher;
use pulsewatch_core::pulse::record::BurstRecord;
use pulsewatch_core::pulse::segmenter::BurstSegmenter;
use pulsewatch_core::stats::aggregator::StatsAggregator;
use pulsewatch_core::stats::window::{RollingWindow, WindowSample};
use pulsewatch_core::MonitorConfig;

fn bench_on_edge(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmenter");

    for pulses in [10u16, 20, 40] {
        let mut gen = BurstGenerator::new(pulses, 100, 50_000);
        let edges: Vec<u32> = (0..1_000).map(|_| gen.next_edge().0 as u32).collect();

        group.bench_with_input(BenchmarkId::new("on_edge", pulses), &edges, |b, edges| {
            let segmenter = BurstSegmenter::new(2_000);
            b.iter(|| {
                for &t in edges {
                    segmenter.on_edge(black_box(t));
                }
            });
        });
    }

    group.finish();
}

fn bench_poll_cycle(c: &mut Criterion) {
    let config = MonitorConfig::default();
    let segmenter = Arc::new(BurstSegmenter::new(config.burst_timeout_us));
    let publisher = Arc::new(ResultPublisher::new());
    let aggregator = StatsAggregator::new(&config).expect("window allocation");
    let mut poller = BurstPoller::new(
        Arc::clone(&segmenter),
        publisher,
        aggregator,
        config.report_interval_ms,
        0,
    );

    let mut gen = BurstGenerator::new(20, 100, 50_000);
    c.bench_function("poll_cycle_with_burst", |b| {
        b.iter(|| {
            let burst = gen.next_burst();
            for &t in &burst {
                segmenter.on_edge(t as u32);
            }
            let end = *burst.last().unwrap_or(&0) as u32 + 5_000;
            black_box(poller.poll(end, end / 1_000));
        });
    });
}

fn bench_window_means(c: &mut Criterion) {
    let mut group = c.benchmark_group("window");

    for size in [10usize, 100, 1_000] {
        let mut window = RollingWindow::with_capacity(size).expect("window allocation");
        for i in 0..size {
            let record = BurstRecord {
                pulse_count: 20,
                burst_duration_us: 2_000 + i as u32,
                off_period_us: 50_000,
                frequency_khz: 10_000.0,
                first_pulse_period_us: 100,
                timestamp_ms: i as u32,
                success: true,
            };
            window.push(WindowSample::from(&record));
        }

        group.bench_with_input(BenchmarkId::new("means", size), &window, |b, w| {
            b.iter(|| black_box(w.means()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_on_edge, bench_poll_cycle, bench_window_means);
criterion_main!(benches);
