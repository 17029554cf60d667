//! Periodic rolling-average report

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::window::WindowMeans;
use crate::pulse::record::BurstRecord;

/// First valid burst, kept for drift comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub pulse_count: u16,
    pub frequency_khz: f32,
    pub first_pulse_period_us: u32,
    pub burst_duration_us: u32,
    pub off_period_us: u32,
    /// Millisecond clock when the baseline was captured
    pub captured_at_ms: u32,
}

impl Baseline {
    pub fn capture(record: &BurstRecord, now_ms: u32) -> Self {
        Self {
            pulse_count: record.pulse_count,
            frequency_khz: record.frequency_khz,
            first_pulse_period_us: record.first_pulse_period_us,
            burst_duration_us: record.burst_duration_us,
            off_period_us: record.off_period_us,
            captured_at_ms: now_ms,
        }
    }
}

/// Percentage change of the rolling means relative to the baseline
///
/// A metric whose baseline value is zero has no defined change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BaselineChange {
    pub pulse_count_pct: Option<f32>,
    pub frequency_pct: Option<f32>,
}

impl BaselineChange {
    pub fn between(means: &WindowMeans, baseline: &Baseline) -> Self {
        Self {
            pulse_count_pct: percent_change(means.pulse_count, baseline.pulse_count as f32),
            frequency_pct: percent_change(means.frequency_khz, baseline.frequency_khz),
        }
    }
}

fn percent_change(current: f32, reference: f32) -> Option<f32> {
    if reference == 0.0 {
        None
    } else {
        Some((current - reference) / reference * 100.0)
    }
}

/// Summary emitted once per report interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub generated_at: DateTime<Utc>,
    pub means: WindowMeans,
    pub baseline: Option<Baseline>,
    pub change: Option<BaselineChange>,
}

impl StatsReport {
    pub fn new(means: WindowMeans, baseline: Option<Baseline>) -> Self {
        let change = baseline.as_ref().map(|b| BaselineChange::between(&means, b));
        Self {
            generated_at: Utc::now(),
            means,
            baseline,
            change,
        }
    }
}

fn fmt_pct(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.means;
        writeln!(f, "--- Pulse Burst Rolling Average ---")?;
        writeln!(
            f,
            "Current - Pulses: {:.1}, Freq: {:.2} kHz",
            m.pulse_count, m.frequency_khz
        )?;
        writeln!(
            f,
            "Current - Pulse period: {:.1} us, Burst: {:.1} us, Off: {:.2} ms",
            m.first_pulse_period_us,
            m.burst_duration_us,
            m.off_period_us / 1000.0
        )?;

        if let Some(b) = &self.baseline {
            writeln!(
                f,
                "First   - Pulses: {}, Freq: {:.2} kHz",
                b.pulse_count, b.frequency_khz
            )?;
            writeln!(
                f,
                "First   - Pulse period: {} us, Burst: {} us, Off: {:.2} ms",
                b.first_pulse_period_us,
                b.burst_duration_us,
                b.off_period_us as f32 / 1000.0
            )?;
        }
        if let Some(c) = &self.change {
            writeln!(
                f,
                "Change  - Pulses: {}, Freq: {}",
                fmt_pct(c.pulse_count_pct),
                fmt_pct(c.frequency_pct)
            )?;
        }

        write!(f, "Bursts in average: {}", m.samples)
    }
}
