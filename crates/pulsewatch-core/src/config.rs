//! Monitor configuration
//!
//! Stored as JSON. Every field has a default so that a partial file (or an
//! empty object) still loads.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::pulse::monitor::MonitorError;

fn default_monitor_pin() -> u8 {
    crate::DEFAULT_MONITOR_PIN
}

fn default_burst_timeout_us() -> u32 {
    crate::BURST_TIMEOUT_US
}

fn default_poll_interval_ms() -> u64 {
    crate::POLL_INTERVAL_MS
}

fn default_report_interval_ms() -> u32 {
    crate::REPORT_INTERVAL_MS
}

fn default_window_size() -> usize {
    crate::WINDOW_SIZE
}

fn default_max_pulse_count() -> u16 {
    crate::MAX_PULSE_COUNT
}

fn default_baseline_min_hold_ms() -> u32 {
    crate::BASELINE_MIN_HOLD_MS
}

/// What to do with a burst whose pulse count exceeds the limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierPolicy {
    /// Drop the burst and invalidate the whole rolling window
    #[default]
    ResetWindow,
    /// Drop only the offending burst; window and baseline are untouched
    DiscardSample,
}

/// Tunables for burst detection and aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Line to monitor
    #[serde(default = "default_monitor_pin")]
    pub monitor_pin: u8,
    /// Silence after the last edge that ends a burst (µs)
    #[serde(default = "default_burst_timeout_us")]
    pub burst_timeout_us: u32,
    /// Period of the burst-end polling loop (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Period of the rolling-average report (ms)
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u32,
    /// Number of bursts in the rolling window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Bursts with more pulses than this are anomalous
    #[serde(default = "default_max_pulse_count")]
    pub max_pulse_count: u16,
    /// Minimum time a baseline survives window invalidations (ms)
    #[serde(default = "default_baseline_min_hold_ms")]
    pub baseline_min_hold_ms: u32,
    #[serde(default)]
    pub outlier_policy: OutlierPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_pin: default_monitor_pin(),
            burst_timeout_us: default_burst_timeout_us(),
            poll_interval_ms: default_poll_interval_ms(),
            report_interval_ms: default_report_interval_ms(),
            window_size: default_window_size(),
            max_pulse_count: default_max_pulse_count(),
            baseline_min_hold_ms: default_baseline_min_hold_ms(),
            outlier_policy: OutlierPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Load config from disk, falling back to defaults on any error
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded monitor config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse monitor config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No monitor config found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Monitor config saved to disk");
        Ok(())
    }

    /// Reject values the monitor cannot run with
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.window_size == 0 {
            return Err(MonitorError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        if self.burst_timeout_us == 0 {
            return Err(MonitorError::InvalidConfig(
                "burst_timeout_us must be non-zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.report_interval_ms == 0 {
            return Err(MonitorError::InvalidConfig(
                "report_interval_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.monitor_pin, 6);
        assert_eq!(config.burst_timeout_us, 2000);
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.report_interval_ms, 1000);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.max_pulse_count, 40);
        assert_eq!(config.baseline_min_hold_ms, 3000);
        assert_eq!(config.outlier_policy, OutlierPolicy::ResetWindow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"monitor_pin": 4, "outlier_policy": "discard_sample"}"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.monitor_pin, 4);
        assert_eq!(config.outlier_policy, OutlierPolicy::DiscardSample);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.burst_timeout_us, 2000);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = MonitorConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MonitorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        let config = MonitorConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = MonitorConfig {
            monitor_pin: 12,
            window_size: 5,
            outlier_policy: OutlierPolicy::DiscardSample,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = MonitorConfig::load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_garbage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(MonitorConfig::load(&path), MonitorConfig::default());
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = MonitorConfig::load(&dir.path().join("absent.json"));
        assert_eq!(loaded, MonitorConfig::default());
    }
}
