//! clusterwatch-health — cluster health assessment and alerting.
//!
//! Turns node availability, job queue depth and resource utilization into
//! per-check statuses, an overall cluster status, and operator alerts.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── Background tick loop (start/stop, watch-channel shutdown)
//!   │   ├── HealthCheck::evaluate() per check, on the blocking pool
//!   │   ├── HealthState::merge() → overall status, issues, counters
//!   │   └── AlertManager::generate_alert() per non-healthy result
//!   └── health() → ClusterHealth snapshot
//! ```
//!
//! # Aggregation
//!
//! Any Critical check makes the cluster Critical. Otherwise any Unknown
//! check makes it Unknown, then any Warning makes it Warning. A check that
//! could not be evaluated is never read as healthy.

pub mod alerts;
pub mod checks;
pub mod config;
pub mod error;
pub mod monitor;
pub mod state;
pub mod status;

pub use alerts::{Alert, AlertManager, AlertManagerConfig, AlertStatistics, AlertType};
pub use checks::{
    CheckOutcome, HealthCheck, NodeAvailabilityCheck, QueueDepthCheck, ResourceUtilizationCheck,
};
pub use config::{MonitorConfig, ThresholdConfig};
pub use error::{AlertError, AlertResult, ConfigError, ConfigResult};
pub use monitor::HealthMonitor;
pub use state::{CheckResult, ClusterHealth, HealthIssue, HealthState, StatusCounts};
pub use status::{HealthStatus, Threshold, aggregate_status};

pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
