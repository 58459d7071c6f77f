//! Health monitor: background task that evaluates checks on a fixed cadence.
//!
//! Each tick runs every registered check concurrently on the blocking pool,
//! merges the outcomes into the shared `HealthState`, and hands every
//! non-healthy result to the `AlertManager`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use clusterwatch_provider::ClusterProvider;

use crate::alerts::AlertManager;
use crate::checks::{
    CheckOutcome, HealthCheck, NodeAvailabilityCheck, QueueDepthCheck, ResourceUtilizationCheck,
};
use crate::config::MonitorConfig;
use crate::state::{ClusterHealth, HealthState};
use crate::status::HealthStatus;

/// Handle to the running tick loop.
struct MonitorTask {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

/// Everything a tick needs, shared with the background task.
struct Engine {
    provider: Arc<dyn ClusterProvider>,
    /// Registered checks in registration order.
    checks: RwLock<Vec<Arc<dyn HealthCheck>>>,
    state: HealthState,
    alerts: Arc<AlertManager>,
}

/// Periodically assesses cluster health.
pub struct HealthMonitor {
    engine: Arc<Engine>,
    interval: Duration,
    task: Mutex<Option<MonitorTask>>,
}

impl HealthMonitor {
    /// Create a monitor with the node, queue and utilization checks
    /// registered using the configured thresholds.
    pub fn new(provider: Arc<dyn ClusterProvider>, config: MonitorConfig) -> Self {
        let checks: Vec<Arc<dyn HealthCheck>> = vec![
            Arc::new(NodeAvailabilityCheck::new(config.thresholds.nodes)),
            Arc::new(QueueDepthCheck::new(config.thresholds.queue)),
            Arc::new(ResourceUtilizationCheck::new(config.thresholds.utilization)),
        ];
        Self {
            engine: Arc::new(Engine {
                provider,
                checks: RwLock::new(checks),
                state: HealthState::new(),
                alerts: Arc::new(AlertManager::new(config.alerts)),
            }),
            interval: config.interval,
            task: Mutex::new(None),
        }
    }

    /// Add a check, replacing any registered check with the same name.
    /// Takes effect from the next tick.
    pub async fn register_check(&self, check: Arc<dyn HealthCheck>) {
        let mut checks = self.engine.checks.write().await;
        let name = check.name().to_string();
        match checks.iter().position(|c| c.name() == name) {
            Some(pos) => checks[pos] = check,
            None => checks.push(check),
        }
        debug!(check = %name, "health check registered");
    }

    /// Names of the registered checks in registration order.
    pub async fn check_names(&self) -> Vec<String> {
        let checks = self.engine.checks.read().await;
        checks.iter().map(|c| c.name().to_string()).collect()
    }

    /// Start the tick loop. No-op if already running.
    ///
    /// The first tick runs immediately, then one every `interval`.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("health monitor already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::clone(&self.engine);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            run_monitor_loop(engine, interval, shutdown_rx).await;
        });

        *task = Some(MonitorTask {
            handle,
            shutdown_tx,
        });
        info!(interval_ms = self.interval.as_millis() as u64, "health monitor started");
    }

    /// Stop the tick loop and wait for it to exit. No-op if not running.
    ///
    /// A tick already in progress finishes first; no tick starts after
    /// this returns. The task slot stays locked until the loop has exited,
    /// so a concurrent `start` or `stop` waits for it.
    pub async fn stop(&self) {
        let mut slot = self.task.lock().await;
        let Some(task) = slot.take() else {
            debug!("health monitor not running");
            return;
        };

        let _ = task.shutdown_tx.send(true);
        if let Err(e) = task.handle.await {
            error!(error = %e, "health monitor task failed");
        }
        drop(slot);
        info!("health monitor stopped");
    }

    /// Whether the tick loop is running. Waits out an in-progress `stop`.
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Run one evaluation cycle now and return the resulting overall status.
    pub async fn run_checks(&self) -> HealthStatus {
        self.engine.tick().await
    }

    /// Independent copy of the current cluster health.
    pub async fn health(&self) -> ClusterHealth {
        self.engine.state.snapshot().await
    }

    /// Shared handle to the alert manager fed by this monitor.
    pub fn alert_manager(&self) -> Arc<AlertManager> {
        Arc::clone(&self.engine.alerts)
    }

    /// Configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            let _ = task.shutdown_tx.send(true);
            debug!("health monitor dropped while running");
        }
    }
}

impl Engine {
    async fn tick(&self) -> HealthStatus {
        let checks: Vec<Arc<dyn HealthCheck>> = self.checks.read().await.clone();

        let pending: Vec<_> = checks
            .into_iter()
            .map(|check| {
                let provider = Arc::clone(&self.provider);
                let name = check.name().to_string();
                let threshold = check.threshold();
                let handle =
                    tokio::task::spawn_blocking(move || check.evaluate(provider.as_ref()));
                (name, threshold, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(pending.len());
        for (name, threshold, handle) in pending {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(check = %name, error = %e, "health check panicked");
                    outcomes.push(CheckOutcome::new(
                        name.clone(),
                        HealthStatus::Unknown,
                        format!("Check {name} panicked"),
                        threshold,
                    ));
                }
            }
        }

        let previous = self.state.overall_status().await;
        let unhealthy = self.state.merge(outcomes).await;
        let overall = self.state.overall_status().await;

        for result in &unhealthy {
            self.alerts.generate_alert(result).await;
        }

        if overall != previous {
            info!(
                %previous,
                %overall,
                unhealthy = unhealthy.len(),
                "cluster health changed"
            );
        } else {
            debug!(%overall, unhealthy = unhealthy.len(), "health checks complete");
        }
        overall
    }
}

/// The tick loop. Exits when the shutdown signal fires or its sender is
/// dropped.
async fn run_monitor_loop(
    engine: Arc<Engine>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("health loop starting");

    loop {
        engine.tick().await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                debug!("health loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use clusterwatch_provider::*;

    use super::*;
    use crate::status::Threshold;

    fn healthy_provider() -> Arc<StaticProvider> {
        Arc::new(
            StaticProvider::new()
                .with_nodes(vec![
                    Node::new("node1", NodeState::Idle),
                    Node::new("node2", NodeState::Allocated),
                    Node::new("node3", NodeState::Mixed),
                ])
                .with_metrics(ClusterMetrics::new(50.0, 60.0)),
        )
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig::default().with_interval(Duration::from_millis(50))
    }

    struct PanickingCheck;

    impl HealthCheck for PanickingCheck {
        fn name(&self) -> &str {
            "broken"
        }

        fn threshold(&self) -> Threshold {
            Threshold::new(1.0, 2.0)
        }

        fn evaluate(&self, _provider: &dyn ClusterProvider) -> CheckOutcome {
            panic!("evaluator bug");
        }
    }

    #[tokio::test]
    async fn new_monitor_registers_builtin_checks() {
        let monitor = HealthMonitor::new(healthy_provider(), test_config());
        assert_eq!(monitor.interval(), Duration::from_millis(50));
        assert_eq!(monitor.check_names().await, vec!["nodes", "queue", "utilization"]);

        let health = monitor.health().await;
        assert_eq!(health.overall_status, HealthStatus::Unknown);
        assert!(health.checks.is_empty());
        assert!(!monitor.is_running().await);
    }

    #[tokio::test]
    async fn run_checks_populates_state() {
        let monitor = HealthMonitor::new(healthy_provider(), test_config());
        let overall = monitor.run_checks().await;
        assert_eq!(overall, HealthStatus::Healthy);

        let health = monitor.health().await;
        assert!(health.last_updated.is_some());
        for name in ["nodes", "queue", "utilization"] {
            let check = &health.checks[name];
            assert_eq!(check.status, HealthStatus::Healthy, "{name}");
            assert_eq!(check.check_count, 1);
            assert!(!check.message.is_empty());
        }
        assert!(health.checks["nodes"].message.contains("All nodes healthy"));
        assert!(health.checks["queue"].message.contains("Queue healthy"));
        assert!(health.checks["utilization"].message.contains("Resource utilization healthy"));
        assert!(monitor.alert_manager().active_alerts().await.is_empty());
    }

    #[tokio::test]
    async fn critical_cluster_raises_alerts() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_nodes(vec![
                    Node::new("node1", NodeState::Down),
                    Node::new("node2", NodeState::Down),
                    Node::new("node3", NodeState::Down),
                ])
                .with_jobs(
                    (0..600)
                        .map(|i| Job::new(i.to_string(), JobState::Pending))
                        .collect(),
                )
                .with_metrics(ClusterMetrics::new(98.0, 97.0)),
        );
        let monitor = HealthMonitor::new(provider, test_config());
        assert_eq!(monitor.run_checks().await, HealthStatus::Critical);

        let health = monitor.health().await;
        assert!(health.checks["nodes"].message.contains("100.0% of nodes unavailable"));
        assert!(health.checks["queue"].message.contains("600 pending jobs"));
        assert!(health.checks["utilization"].message.contains("High resource utilization"));
        assert_eq!(health.issues.len(), 3);

        let alerts = monitor.alert_manager().active_alerts().await;
        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.severity == HealthStatus::Critical));

        // A second cycle updates the same alerts.
        monitor.run_checks().await;
        assert_eq!(monitor.alert_manager().active_alerts().await.len(), 3);
    }

    #[tokio::test]
    async fn provider_failure_is_unknown_not_fatal() {
        let provider = healthy_provider();
        provider.set_node_error(Some(ProviderError::Other("connection failed".into())));
        let monitor = HealthMonitor::new(provider.clone(), test_config());

        assert_eq!(monitor.run_checks().await, HealthStatus::Unknown);
        let health = monitor.health().await;
        assert_eq!(
            health.checks["nodes"].message,
            "Failed to get node list: connection failed"
        );

        provider.set_node_error(None);
        assert_eq!(monitor.run_checks().await, HealthStatus::Healthy);
        assert!(monitor.health().await.issues.is_empty());
    }

    #[tokio::test]
    async fn panicking_check_becomes_unknown() {
        let monitor = HealthMonitor::new(healthy_provider(), test_config());
        monitor.register_check(Arc::new(PanickingCheck)).await;

        assert_eq!(monitor.run_checks().await, HealthStatus::Unknown);
        let health = monitor.health().await;
        let broken = &health.checks["broken"];
        assert_eq!(broken.status, HealthStatus::Unknown);
        assert_eq!(broken.message, "Check broken panicked");
        assert_eq!(broken.threshold, Threshold::new(1.0, 2.0));
        assert_eq!(health.checks["nodes"].status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn register_check_replaces_same_name() {
        let monitor = HealthMonitor::new(healthy_provider(), test_config());
        monitor
            .register_check(Arc::new(QueueDepthCheck::new(Threshold::none())))
            .await;
        assert_eq!(monitor.check_names().await, vec!["nodes", "queue", "utilization"]);
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let monitor = HealthMonitor::new(healthy_provider(), test_config());

        monitor.stop().await;
        assert!(!monitor.is_running().await);

        monitor.start().await;
        monitor.start().await;
        assert!(monitor.is_running().await);

        monitor.stop().await;
        monitor.stop().await;
        assert!(!monitor.is_running().await);

        // The immediate first tick ran before shutdown completed.
        let count = monitor.health().await.checks["nodes"].check_count;
        assert!(count >= 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(monitor.health().await.checks["nodes"].check_count, count);
    }
}
