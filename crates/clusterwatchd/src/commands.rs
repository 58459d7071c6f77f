//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::{info, warn};

use clusterwatch_health::config::parse_duration;
use clusterwatch_health::{HealthMonitor, HealthStatus, MonitorConfig};
use clusterwatch_provider::StaticProvider;
use clusterwatch_score::compute_health_score;

/// Load the monitor config, applying the command-line interval override.
pub fn load_config(path: Option<&Path>, interval: Option<&str>) -> anyhow::Result<MonitorConfig> {
    let mut config = match path {
        Some(path) => {
            let config = MonitorConfig::from_file(path)?;
            info!(path = %path.display(), "config loaded");
            config
        }
        None => MonitorConfig::default(),
    };

    if let Some(raw) = interval {
        config.interval = parse_duration(raw).ok_or_else(|| anyhow!("invalid --interval {raw:?}"))?;
    }
    config.validate()?;
    Ok(config)
}

pub fn load_provider(path: &Path) -> anyhow::Result<Arc<StaticProvider>> {
    let provider = StaticProvider::from_json_file(path)
        .with_context(|| format!("Failed to load cluster snapshot {}", path.display()))?;
    Ok(Arc::new(provider))
}

/// Run the monitor and report cluster health every interval until Ctrl-C.
pub async fn run(provider: Arc<StaticProvider>, config: MonitorConfig) -> anyhow::Result<()> {
    info!("clusterwatch daemon starting");

    let interval = config.interval;
    let monitor = HealthMonitor::new(provider, config);
    let alerts = monitor.alert_manager();
    monitor.start().await;

    let mut report = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = report.tick() => {
                let health = monitor.health().await;
                let counts = health.counts();
                let active = alerts.active_alerts().await.len();
                if health.overall_status == HealthStatus::Healthy {
                    info!(
                        overall = %health.overall_status,
                        checks = counts.total,
                        "cluster healthy"
                    );
                } else {
                    warn!(
                        overall = %health.overall_status,
                        warning = counts.warning,
                        critical = counts.critical,
                        unknown = counts.unknown,
                        issues = health.issues.len(),
                        active_alerts = active,
                        "cluster unhealthy"
                    );
                }
            }
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    monitor.stop().await;
    info!("clusterwatch daemon stopped");
    Ok(())
}

/// Run every check once and print health and active alerts.
pub async fn check(provider: Arc<StaticProvider>, config: MonitorConfig) -> anyhow::Result<()> {
    let monitor = HealthMonitor::new(provider, config);
    let overall = monitor.run_checks().await;
    let health = monitor.health().await;
    let alerts = monitor.alert_manager().active_alerts().await;
    info!(%overall, "health check complete");

    let out = serde_json::json!({
        "health": health,
        "alerts": alerts,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn score(provider: &StaticProvider) -> anyhow::Result<()> {
    let snapshot = provider.snapshot();
    let score = compute_health_score(&snapshot.nodes, &snapshot.jobs, snapshot.metrics.as_ref());
    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(())
}
