//! Monitor configuration.
//!
//! Loaded from a TOML file where every section is optional:
//!
//! ```toml
//! [monitor]
//! interval = "30s"
//!
//! [thresholds.nodes]
//! warning_max = 10.0
//! critical_max = 25.0
//!
//! [alerts]
//! max_alerts = 1000
//! ```
//!
//! A missing `[thresholds.*]` section keeps the built-in default. A present
//! section is taken as written, so an omitted bound means no ceiling.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::alerts::AlertManagerConfig;
use crate::checks::{DEFAULT_NODE_THRESHOLD, DEFAULT_QUEUE_THRESHOLD, DEFAULT_UTILIZATION_THRESHOLD};
use crate::error::{ConfigError, ConfigResult};
use crate::status::Threshold;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Per-check threshold overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Percent of nodes down or draining.
    pub nodes: Threshold,
    /// Pending job count.
    pub queue: Threshold,
    /// Peak CPU/memory percent.
    pub utilization: Threshold,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODE_THRESHOLD,
            queue: DEFAULT_QUEUE_THRESHOLD,
            utilization: DEFAULT_UTILIZATION_THRESHOLD,
        }
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Time between evaluation ticks.
    pub interval: Duration,
    pub thresholds: ThresholdConfig,
    pub alerts: AlertManagerConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            thresholds: ThresholdConfig::default(),
            alerts: AlertManagerConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let interval = match file.monitor.interval {
            None => DEFAULT_INTERVAL,
            Some(IntervalValue::Seconds(secs)) => Duration::from_secs(secs),
            Some(IntervalValue::Text(text)) => {
                parse_duration(&text).ok_or(ConfigError::InvalidInterval(text))?
            }
        };
        let config = Self {
            interval,
            thresholds: file.thresholds,
            alerts: file.alerts,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        let file = ConfigFile {
            monitor: MonitorSection {
                interval: Some(IntervalValue::Text(format_duration(self.interval))),
            },
            thresholds: self.thresholds.clone(),
            alerts: self.alerts.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let checks = [
            ("nodes", &self.thresholds.nodes),
            ("queue", &self.thresholds.queue),
            ("utilization", &self.thresholds.utilization),
        ];
        for (check, threshold) in checks {
            if let (Some(warning), Some(critical)) = (threshold.warning_max, threshold.critical_max) {
                if warning > critical {
                    return Err(ConfigError::InvertedThreshold {
                        check: check.to_string(),
                        warning,
                        critical,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    monitor: MonitorSection,
    thresholds: ThresholdConfig,
    alerts: AlertManagerConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MonitorSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<IntervalValue>,
}

/// `interval = "30s"` or `interval = 30`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum IntervalValue {
    Seconds(u64),
    Text(String),
}

/// Parse a duration string like "5s", "500ms", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.trim().parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.trim().parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else if d.as_secs() % 60 == 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}s", d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.thresholds.nodes, Threshold::new(10.0, 25.0));
        assert_eq!(config.thresholds.queue, Threshold::new(100.0, 500.0));
        assert_eq!(config.thresholds.utilization, Threshold::new(90.0, 95.0));
        assert_eq!(config.alerts.max_alerts, 1000);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn parses_full_file() {
        let config = MonitorConfig::from_toml_str(
            r#"
            [monitor]
            interval = "500ms"

            [thresholds.queue]
            warning_max = 50
            critical_max = 200

            [thresholds.utilization]
            warning_max = 80.5

            [alerts]
            max_alerts = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.thresholds.queue, Threshold::new(50.0, 200.0));
        assert_eq!(config.thresholds.utilization.warning_max, Some(80.5));
        assert_eq!(config.thresholds.utilization.critical_max, None);
        assert_eq!(config.thresholds.nodes, DEFAULT_NODE_THRESHOLD);
        assert_eq!(config.alerts.max_alerts, 10);
    }

    #[test]
    fn interval_as_bare_seconds() {
        let config = MonitorConfig::from_toml_str("[monitor]\ninterval = 15\n").unwrap();
        assert_eq!(config.interval, Duration::from_secs(15));
    }

    #[test]
    fn rejects_bad_interval() {
        let err = MonitorConfig::from_toml_str("[monitor]\ninterval = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval(_)));

        let err = MonitorConfig::from_toml_str("[monitor]\ninterval = \"0s\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval));
    }

    #[test]
    fn rejects_inverted_threshold() {
        let err = MonitorConfig::from_toml_str(
            "[thresholds.nodes]\nwarning_max = 30\ncritical_max = 20\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedThreshold { ref check, .. } if check == "nodes"));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = MonitorConfig::default().with_interval(Duration::from_secs(90));
        config.thresholds.queue = Threshold::new(5.0, 10.0);
        let text = config.to_toml_string().unwrap();
        let parsed = MonitorConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("45"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("later"), None);
    }

    #[test]
    fn parse_duration_rejects_overflowing_minutes() {
        assert_eq!(parse_duration("307445734561825862m"), None);
        assert_eq!(
            parse_duration("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );

        let err = MonitorConfig::from_toml_str("[monitor]\ninterval = \"307445734561825862m\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval(_)));
    }

    #[test]
    fn format_duration_values() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
    }
}
