//! Check evaluators.
//!
//! Each check reads from the data provider, classifies one measured value
//! against its threshold, and reports a status with a message that restates
//! the measurement. Provider failures become `Unknown`, never errors.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use clusterwatch_provider::{ClusterProvider, JobFilter, JobState, NodeFilter, count_node_states};

use crate::epoch_secs;
use crate::status::{HealthStatus, Threshold};

/// Default node unavailability thresholds (percent of nodes).
pub const DEFAULT_NODE_THRESHOLD: Threshold = Threshold {
    warning_max: Some(10.0),
    critical_max: Some(25.0),
};

/// Default pending job thresholds (absolute job count).
pub const DEFAULT_QUEUE_THRESHOLD: Threshold = Threshold {
    warning_max: Some(100.0),
    critical_max: Some(500.0),
};

/// Default CPU/memory utilization thresholds (percent).
pub const DEFAULT_UTILIZATION_THRESHOLD: Threshold = Threshold {
    warning_max: Some(90.0),
    critical_max: Some(95.0),
};

/// The result of a single evaluation, before it is merged into state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub threshold: Threshold,
    /// Unix timestamp (seconds) of the evaluation.
    pub evaluated_at: u64,
}

impl CheckOutcome {
    pub fn new(
        name: impl Into<String>,
        status: HealthStatus,
        message: impl Into<String>,
        threshold: Threshold,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            threshold,
            evaluated_at: epoch_secs(),
        }
    }
}

/// A named health check.
///
/// Implementations must not panic on malformed provider data. `evaluate`
/// may block on provider I/O; the monitor runs it on a blocking thread.
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    /// Threshold reported with results this check could not produce
    /// itself, such as when evaluation panicked.
    fn threshold(&self) -> Threshold {
        Threshold::none()
    }

    fn evaluate(&self, provider: &dyn ClusterProvider) -> CheckOutcome;
}

// ── Nodes ─────────────────────────────────────────────────────────

/// Percentage of nodes that are down or draining.
#[derive(Debug, Clone)]
pub struct NodeAvailabilityCheck {
    threshold: Threshold,
}

impl NodeAvailabilityCheck {
    pub const NAME: &'static str = "nodes";

    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }
}

impl Default for NodeAvailabilityCheck {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_THRESHOLD)
    }
}

impl HealthCheck for NodeAvailabilityCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn threshold(&self) -> Threshold {
        self.threshold
    }

    fn evaluate(&self, provider: &dyn ClusterProvider) -> CheckOutcome {
        let list = match provider.nodes().list(&NodeFilter::all()) {
            Ok(list) => list,
            Err(e) => {
                warn!(check = Self::NAME, error = %e, "node listing failed");
                return CheckOutcome::new(
                    Self::NAME,
                    HealthStatus::Unknown,
                    format!("Failed to get node list: {e}"),
                    self.threshold,
                );
            }
        };

        let counts = count_node_states(&list.nodes);
        if counts.total == 0 {
            debug!(check = Self::NAME, "no nodes reported");
            return CheckOutcome::new(
                Self::NAME,
                HealthStatus::Critical,
                "No nodes found in cluster",
                self.threshold,
            );
        }

        let unavailable_pct = counts.unavailable_fraction() * 100.0;
        let status = self.threshold.classify(unavailable_pct);
        debug!(
            check = Self::NAME,
            total = counts.total,
            down = counts.down,
            drain = counts.drain,
            unavailable_pct,
            %status,
            "node availability evaluated"
        );

        let message = if status.is_healthy() {
            format!(
                "All nodes healthy ({} total, {} down, {} drain)",
                counts.total, counts.down, counts.drain
            )
        } else {
            format!(
                "{unavailable_pct:.1}% of nodes unavailable ({} down, {} drain out of {} total)",
                counts.down, counts.drain, counts.total
            )
        };
        CheckOutcome::new(Self::NAME, status, message, self.threshold)
    }
}

// ── Queue ─────────────────────────────────────────────────────────

/// Number of pending jobs.
#[derive(Debug, Clone)]
pub struct QueueDepthCheck {
    threshold: Threshold,
}

impl QueueDepthCheck {
    pub const NAME: &'static str = "queue";

    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }
}

impl Default for QueueDepthCheck {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_THRESHOLD)
    }
}

impl HealthCheck for QueueDepthCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn threshold(&self) -> Threshold {
        self.threshold
    }

    fn evaluate(&self, provider: &dyn ClusterProvider) -> CheckOutcome {
        let list = match provider.jobs().list(&JobFilter::with_state(JobState::Pending)) {
            Ok(list) => list,
            Err(e) => {
                warn!(check = Self::NAME, error = %e, "job listing failed");
                return CheckOutcome::new(
                    Self::NAME,
                    HealthStatus::Unknown,
                    format!("Failed to get job list: {e}"),
                    self.threshold,
                );
            }
        };

        let pending = list.jobs.len();
        let status = self.threshold.classify(pending as f64);
        debug!(check = Self::NAME, pending, %status, "queue depth evaluated");

        let message = if status.is_healthy() {
            format!("Queue healthy with {pending} pending jobs")
        } else {
            format!(
                "{pending} pending jobs (threshold: warning {}, critical {})",
                format_bound(self.threshold.warning_max),
                format_bound(self.threshold.critical_max)
            )
        };
        CheckOutcome::new(Self::NAME, status, message, self.threshold)
    }
}

/// Whole numbers print without decimals.
fn format_bound(bound: Option<f64>) -> String {
    match bound {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

// ── Utilization ───────────────────────────────────────────────────

/// Peak of CPU and memory utilization.
#[derive(Debug, Clone)]
pub struct ResourceUtilizationCheck {
    threshold: Threshold,
}

impl ResourceUtilizationCheck {
    pub const NAME: &'static str = "utilization";

    pub fn new(threshold: Threshold) -> Self {
        Self { threshold }
    }
}

impl Default for ResourceUtilizationCheck {
    fn default() -> Self {
        Self::new(DEFAULT_UTILIZATION_THRESHOLD)
    }
}

impl HealthCheck for ResourceUtilizationCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn threshold(&self) -> Threshold {
        self.threshold
    }

    fn evaluate(&self, provider: &dyn ClusterProvider) -> CheckOutcome {
        let Some(source) = provider.metrics() else {
            debug!(check = Self::NAME, "no metrics source");
            return CheckOutcome::new(
                Self::NAME,
                HealthStatus::Unknown,
                "Cluster metrics not available",
                self.threshold,
            );
        };

        let metrics = match source.stats() {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(check = Self::NAME, error = %e, "cluster stats failed");
                return CheckOutcome::new(
                    Self::NAME,
                    HealthStatus::Unknown,
                    format!("Failed to get cluster metrics: {e}"),
                    self.threshold,
                );
            }
        };

        let cpu = metrics.cpu_usage;
        let (status, message) = match metrics.memory_usage() {
            None => {
                let status = self.threshold.classify(cpu);
                let message = if status.is_healthy() {
                    format!("CPU utilization healthy: {cpu:.1}% (memory data unavailable)")
                } else {
                    format!("High CPU utilization: {cpu:.1}% (memory data unavailable)")
                };
                (status, message)
            }
            Some(mem) => {
                let peak = cpu.max(mem);
                let status = self.threshold.classify(peak);
                let message = if status.is_healthy() {
                    format!("Resource utilization healthy: CPU {cpu:.1}%, Memory {mem:.1}%")
                } else {
                    format!(
                        "High resource utilization: CPU {cpu:.1}%, Memory {mem:.1}% (max {peak:.1}%)"
                    )
                };
                (status, message)
            }
        };
        debug!(
            check = Self::NAME,
            cpu,
            memory = metrics.memory_usage,
            %status,
            "resource utilization evaluated"
        );
        CheckOutcome::new(Self::NAME, status, message, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use clusterwatch_provider::*;

    use super::*;

    fn provider_with_nodes(states: &[NodeState]) -> StaticProvider {
        StaticProvider::new().with_nodes(
            states
                .iter()
                .enumerate()
                .map(|(i, s)| Node::new(format!("node{}", i + 1), s.clone()))
                .collect(),
        )
    }

    fn nodes_of(healthy: usize, down: usize, drain: usize) -> Vec<NodeState> {
        let mut states = vec![NodeState::Idle; healthy];
        states.extend(vec![NodeState::Down; down]);
        states.extend(vec![NodeState::Drain; drain]);
        states
    }

    fn pending_jobs(count: usize) -> StaticProvider {
        StaticProvider::new().with_jobs(
            (0..count)
                .map(|i| Job::new(i.to_string(), JobState::Pending))
                .collect(),
        )
    }

    fn metrics(cpu: f64, mem: f64) -> StaticProvider {
        StaticProvider::new().with_metrics(ClusterMetrics::new(cpu, mem))
    }

    #[test]
    fn nodes_all_healthy() {
        let provider = provider_with_nodes(&[NodeState::Idle, NodeState::Allocated, NodeState::Mixed]);
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.name, "nodes");
        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.message, "All nodes healthy (3 total, 0 down, 0 drain)");
        assert_eq!(outcome.threshold, DEFAULT_NODE_THRESHOLD);
        assert!(outcome.evaluated_at > 0);
    }

    #[test]
    fn nodes_warning_at_twenty_percent() {
        let provider = provider_with_nodes(&nodes_of(16, 3, 1));
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Warning);
        assert!(
            outcome
                .message
                .contains("20.0% of nodes unavailable (3 down, 1 drain out of 20 total)")
        );
    }

    #[test]
    fn nodes_critical_at_thirty_percent() {
        let mut states = nodes_of(7, 1, 1);
        states.push(NodeState::Draining);
        let provider = provider_with_nodes(&states);
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert!(
            outcome
                .message
                .contains("30.0% of nodes unavailable (1 down, 2 drain out of 10 total)")
        );
    }

    #[test]
    fn nodes_just_above_warning() {
        let provider = provider_with_nodes(&nodes_of(8, 1, 0));
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Warning);
    }

    #[test]
    fn nodes_all_down() {
        let provider = provider_with_nodes(&nodes_of(0, 3, 0));
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert!(outcome.message.contains("100.0% of nodes unavailable"));
    }

    #[test]
    fn no_nodes_is_critical() {
        let outcome = NodeAvailabilityCheck::default().evaluate(&StaticProvider::new());
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert_eq!(outcome.message, "No nodes found in cluster");
    }

    #[test]
    fn node_listing_error_is_unknown() {
        let provider =
            StaticProvider::new().with_node_error(ProviderError::Other("connection failed".into()));
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Unknown);
        assert_eq!(outcome.message, "Failed to get node list: connection failed");
        assert_eq!(outcome.threshold, DEFAULT_NODE_THRESHOLD);
    }

    #[test]
    fn missing_node_entry_counts_toward_total() {
        let provider = StaticProvider::new();
        provider.set_nodes(vec![
            Some(Node::new("node1", NodeState::Idle)),
            None,
            Some(Node::new("node3", NodeState::Idle)),
        ]);
        let outcome = NodeAvailabilityCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.message, "All nodes healthy (3 total, 0 down, 0 drain)");
    }

    #[test]
    fn queue_healthy() {
        let outcome = QueueDepthCheck::default().evaluate(&pending_jobs(0));
        assert_eq!(outcome.name, "queue");
        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.message, "Queue healthy with 0 pending jobs");
    }

    #[test]
    fn queue_warning_and_critical() {
        let outcome = QueueDepthCheck::default().evaluate(&pending_jobs(150));
        assert_eq!(outcome.status, HealthStatus::Warning);
        assert!(
            outcome
                .message
                .contains("150 pending jobs (threshold: warning 100, critical 500)")
        );

        let outcome = QueueDepthCheck::default().evaluate(&pending_jobs(600));
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert!(outcome.message.contains("600 pending jobs"));
    }

    #[test]
    fn queue_ignores_non_pending_jobs() {
        let provider = StaticProvider::new().with_jobs(
            (0..200)
                .map(|i| Job::new(i.to_string(), JobState::Running))
                .collect(),
        );
        let outcome = QueueDepthCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Healthy);
    }

    #[test]
    fn queue_message_reflects_overrides() {
        let check = QueueDepthCheck::new(Threshold::new(10.0, 20.5));
        let outcome = check.evaluate(&pending_jobs(15));
        assert_eq!(outcome.status, HealthStatus::Warning);
        assert!(outcome.message.contains("(threshold: warning 10, critical 20.5)"));
    }

    #[test]
    fn queue_listing_error_is_unknown() {
        let provider = StaticProvider::new().with_job_error(ProviderError::Other("API error".into()));
        let outcome = QueueDepthCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Unknown);
        assert_eq!(outcome.message, "Failed to get job list: API error");
    }

    struct RecordingJobs {
        seen: Mutex<Vec<JobFilter>>,
    }

    impl JobSource for RecordingJobs {
        fn list(&self, filter: &JobFilter) -> ProviderResult<JobList> {
            self.seen.lock().unwrap().push(filter.clone());
            Ok(JobList::default())
        }
    }

    impl NodeSource for RecordingJobs {
        fn list(&self, _filter: &NodeFilter) -> ProviderResult<NodeList> {
            Ok(NodeList::default())
        }
    }

    impl ClusterProvider for RecordingJobs {
        fn nodes(&self) -> &dyn NodeSource {
            self
        }

        fn jobs(&self) -> &dyn JobSource {
            self
        }

        fn metrics(&self) -> Option<&dyn MetricsSource> {
            None
        }
    }

    #[test]
    fn queue_requests_only_pending_jobs() {
        let provider = RecordingJobs {
            seen: Mutex::new(Vec::new()),
        };
        QueueDepthCheck::default().evaluate(&provider);
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].states, vec![JobState::Pending]);
    }

    #[test]
    fn utilization_levels() {
        let cases = [
            (50.0, 60.0, HealthStatus::Healthy, "Resource utilization healthy: CPU 50.0%, Memory 60.0%"),
            (92.0, 50.0, HealthStatus::Warning, "High resource utilization: CPU 92.0%, Memory 50.0% (max 92.0%)"),
            (50.0, 91.0, HealthStatus::Warning, "High resource utilization: CPU 50.0%, Memory 91.0% (max 91.0%)"),
            (97.0, 50.0, HealthStatus::Critical, "High resource utilization: CPU 97.0%, Memory 50.0% (max 97.0%)"),
            (50.0, 96.0, HealthStatus::Critical, "High resource utilization: CPU 50.0%, Memory 96.0% (max 96.0%)"),
            (0.0, 0.0, HealthStatus::Healthy, "Resource utilization healthy: CPU 0.0%, Memory 0.0%"),
        ];
        for (cpu, mem, status, message) in cases {
            let outcome = ResourceUtilizationCheck::default().evaluate(&metrics(cpu, mem));
            assert_eq!(outcome.name, "utilization");
            assert_eq!(outcome.status, status, "cpu {cpu} mem {mem}");
            assert_eq!(outcome.message, message);
        }
    }

    #[test]
    fn utilization_without_memory_data() {
        let outcome = ResourceUtilizationCheck::default().evaluate(&metrics(50.0, -1.0));
        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.message, "CPU utilization healthy: 50.0% (memory data unavailable)");

        let outcome = ResourceUtilizationCheck::default().evaluate(&metrics(96.0, -1.0));
        assert_eq!(outcome.status, HealthStatus::Critical);
        assert_eq!(outcome.message, "High CPU utilization: 96.0% (memory data unavailable)");
    }

    #[test]
    fn utilization_without_metrics_source() {
        let provider = StaticProvider::new().without_metrics_source();
        let outcome = ResourceUtilizationCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Unknown);
        assert_eq!(outcome.message, "Cluster metrics not available");
        assert_eq!(outcome.threshold, DEFAULT_UTILIZATION_THRESHOLD);
    }

    #[test]
    fn utilization_stats_error() {
        let provider =
            StaticProvider::new().with_metrics_error(ProviderError::Other("stats error".into()));
        let outcome = ResourceUtilizationCheck::default().evaluate(&provider);
        assert_eq!(outcome.status, HealthStatus::Unknown);
        assert_eq!(outcome.message, "Failed to get cluster metrics: stats error");
    }

    #[test]
    fn format_bound_trims_whole_numbers() {
        assert_eq!(format_bound(Some(100.0)), "100");
        assert_eq!(format_bound(Some(2.5)), "2.5");
        assert_eq!(format_bound(None), "none");
    }
}
