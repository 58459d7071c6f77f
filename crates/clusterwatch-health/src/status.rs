//! Health status levels and threshold classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health of a single check or of the whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    /// The check could not be evaluated.
    Unknown,
}

impl HealthStatus {
    /// Aggregation rank: Critical > Unknown > Warning > Healthy.
    ///
    /// A failed measurement outranks a known warning so it is never read
    /// as "probably fine".
    pub fn severity_rank(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Unknown => 2,
            HealthStatus::Critical => 3,
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a set of check statuses. Empty input is Healthy.
pub fn aggregate_status<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses
        .into_iter()
        .max_by_key(|s| s.severity_rank())
        .unwrap_or(HealthStatus::Healthy)
}

/// Warning and critical ceilings for a measured value.
///
/// A missing bound means no ceiling at that tier. A value equal to a
/// bound stays in the lower tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_max: Option<f64>,
}

impl Threshold {
    pub fn new(warning_max: f64, critical_max: f64) -> Self {
        Self {
            warning_max: Some(warning_max),
            critical_max: Some(critical_max),
        }
    }

    /// No ceilings: every value is Healthy.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn classify(&self, value: f64) -> HealthStatus {
        if self.critical_max.is_some_and(|c| value > c) {
            HealthStatus::Critical
        } else if self.warning_max.is_some_and(|w| value > w) {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}
