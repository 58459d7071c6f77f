//! Alert lifecycle for non-healthy checks.
//!
//! Alerts are raised from check results and stay active until an operator
//! acknowledges them. A check that stays unhealthy updates its existing
//! unacknowledged alert instead of raising a duplicate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::epoch_secs;
use crate::error::{AlertError, AlertResult};
use crate::state::CheckResult;
use crate::status::HealthStatus;

/// Source category of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Raised by a health check.
    Health,
}

/// An operator-facing alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub alert_type: AlertType,
    /// Mirrors the status of the triggering check.
    pub severity: HealthStatus,
    pub title: String,
    pub message: String,
    /// Name of the triggering check.
    pub component: String,
    pub acknowledged: bool,
    pub created_at: u64,
    pub updated_at: u64,
    /// How many evaluations reported this problem while the alert was open.
    pub occurrences: u64,
}

impl Alert {
    fn from_result(id: u64, result: &CheckResult, now: u64) -> Self {
        Self {
            id,
            alert_type: AlertType::Health,
            severity: result.status,
            title: alert_title(result),
            message: result.message.clone(),
            component: result.name.clone(),
            acknowledged: false,
            created_at: now,
            updated_at: now,
            occurrences: 1,
        }
    }

    fn refresh(&mut self, result: &CheckResult, now: u64) {
        self.severity = result.status;
        self.title = alert_title(result);
        self.message = result.message.clone();
        self.updated_at = now;
        self.occurrences += 1;
    }
}

fn alert_title(result: &CheckResult) -> String {
    format!("{} health check {}", result.name, result.status)
}

/// Alert manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertManagerConfig {
    /// Maximum number of alerts retained. Only acknowledged alerts are
    /// pruned, oldest first.
    pub max_alerts: usize,
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self { max_alerts: 1000 }
    }
}

/// Alert counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// Alerts ever created (updates of an open alert are not counted).
    pub total_generated: u64,
    pub active: u64,
    pub acknowledged: u64,
    /// Active alerts per severity.
    pub active_by_severity: HashMap<HealthStatus, u64>,
}

/// Raises, deduplicates and acknowledges alerts.
#[derive(Debug)]
pub struct AlertManager {
    config: AlertManagerConfig,
    /// All retained alerts in creation order.
    alerts: RwLock<Vec<Alert>>,
    next_id: AtomicU64,
    total_generated: AtomicU64,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertManagerConfig::default())
    }
}

impl AlertManager {
    pub fn new(config: AlertManagerConfig) -> Self {
        Self {
            config,
            alerts: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            total_generated: AtomicU64::new(0),
        }
    }

    /// Raise an alert for a non-healthy result.
    ///
    /// Returns the id of the new or updated alert, or `None` for a healthy
    /// result.
    pub async fn generate_alert(&self, result: &CheckResult) -> Option<u64> {
        if result.status.is_healthy() {
            return None;
        }

        let now = epoch_secs();
        let mut alerts = self.alerts.write().await;

        if let Some(existing) = alerts.iter_mut().find(|a| {
            !a.acknowledged && a.alert_type == AlertType::Health && a.component == result.name
        }) {
            let escalated = existing.severity != result.status;
            existing.refresh(result, now);
            if escalated {
                info!(
                    alert_id = existing.id,
                    component = %existing.component,
                    severity = %existing.severity,
                    "alert severity changed"
                );
            } else {
                debug!(
                    alert_id = existing.id,
                    component = %existing.component,
                    occurrences = existing.occurrences,
                    "alert still open"
                );
            }
            return Some(existing.id);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let alert = Alert::from_result(id, result, now);
        warn!(
            alert_id = id,
            component = %alert.component,
            severity = %alert.severity,
            message = %alert.message,
            "alert raised"
        );
        alerts.push(alert);
        self.total_generated.fetch_add(1, Ordering::Relaxed);
        self.prune(&mut alerts);
        Some(id)
    }

    /// Unacknowledged alerts in creation order.
    pub async fn active_alerts(&self) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts.iter().filter(|a| !a.acknowledged).cloned().collect()
    }

    /// Every retained alert, acknowledged or not, in creation order.
    pub async fn all_alerts(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    /// Unacknowledged alerts with the given severity, in creation order.
    pub async fn alerts_by_severity(&self, severity: HealthStatus) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts
            .iter()
            .filter(|a| !a.acknowledged && a.severity == severity)
            .cloned()
            .collect()
    }

    /// Look up an alert by id, acknowledged or not.
    pub async fn get(&self, id: u64) -> Option<Alert> {
        let alerts = self.alerts.read().await;
        alerts.iter().find(|a| a.id == id).cloned()
    }

    /// Mark an alert acknowledged.
    pub async fn acknowledge(&self, id: u64) -> AlertResult<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AlertError::NotFound(id))?;
        if alert.acknowledged {
            return Err(AlertError::AlreadyAcknowledged(id));
        }
        alert.acknowledged = true;
        alert.updated_at = epoch_secs();
        info!(alert_id = id, component = %alert.component, "alert acknowledged");
        Ok(())
    }

    /// Acknowledge every active alert for a component. Returns how many
    /// were acknowledged.
    pub async fn acknowledge_component(&self, component: &str) -> usize {
        let now = epoch_secs();
        let mut alerts = self.alerts.write().await;
        let mut count = 0;
        for alert in alerts
            .iter_mut()
            .filter(|a| !a.acknowledged && a.component == component)
        {
            alert.acknowledged = true;
            alert.updated_at = now;
            count += 1;
        }
        if count > 0 {
            info!(%component, count, "component alerts acknowledged");
        }
        count
    }

    /// Drop acknowledged alerts. Returns how many were removed.
    pub async fn clear_acknowledged(&self) -> usize {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| !a.acknowledged);
        let removed = before - alerts.len();
        debug!(removed, "acknowledged alerts cleared");
        removed
    }

    /// Counters over generated and retained alerts.
    pub async fn statistics(&self) -> AlertStatistics {
        let alerts = self.alerts.read().await;
        let mut stats = AlertStatistics {
            total_generated: self.total_generated.load(Ordering::Relaxed),
            ..Default::default()
        };
        for alert in alerts.iter() {
            if alert.acknowledged {
                stats.acknowledged += 1;
            } else {
                stats.active += 1;
                *stats.active_by_severity.entry(alert.severity).or_insert(0) += 1;
            }
        }
        stats
    }

    fn prune(&self, alerts: &mut Vec<Alert>) {
        while alerts.len() > self.config.max_alerts {
            match alerts.iter().position(|a| a.acknowledged) {
                Some(pos) => {
                    let removed = alerts.remove(pos);
                    debug!(alert_id = removed.id, "acknowledged alert pruned");
                }
                None => break,
            }
        }
    }
}
