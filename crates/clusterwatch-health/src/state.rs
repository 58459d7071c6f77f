//! Aggregate health state.
//!
//! Holds the latest result of every check, the open issues derived from
//! them, and the overall status. The monitor is the only writer; readers
//! get deep copies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::checks::CheckOutcome;
use crate::epoch_secs;
use crate::status::{HealthStatus, Threshold, aggregate_status};

/// Latest result of a named check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    pub threshold: Threshold,
    /// Unix timestamp (seconds) of the latest evaluation.
    pub last_check: u64,
    /// Number of evaluations since the check was first seen.
    pub check_count: u64,
}

/// An open problem reported by a non-healthy check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    /// `<component>-<first_seen>-<sequence>`, unique for the life of the state.
    pub id: String,
    pub component: String,
    pub severity: HealthStatus,
    pub message: String,
    pub first_seen: u64,
    pub last_seen: u64,
}

/// Number of checks in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub unknown: usize,
    pub total: usize,
}

/// Point-in-time view of cluster health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub overall_status: HealthStatus,
    pub checks: HashMap<String, CheckResult>,
    /// Open issues in order of first appearance.
    pub issues: Vec<HealthIssue>,
    /// Unix timestamp (seconds) of the latest merge, `None` before the
    /// first one.
    pub last_updated: Option<u64>,
    /// Issues opened so far; keeps issue ids unique within a second.
    #[serde(skip)]
    issues_opened: u64,
}

impl Default for ClusterHealth {
    fn default() -> Self {
        Self {
            overall_status: HealthStatus::Unknown,
            checks: HashMap::new(),
            issues: Vec::new(),
            last_updated: None,
            issues_opened: 0,
        }
    }
}

impl ClusterHealth {
    /// Number of checks in each status.
    pub fn counts(&self) -> StatusCounts {
        self.checks.values().fold(
            StatusCounts {
                total: self.checks.len(),
                ..Default::default()
            },
            |mut counts, check| {
                match check.status {
                    HealthStatus::Healthy => counts.healthy += 1,
                    HealthStatus::Warning => counts.warning += 1,
                    HealthStatus::Critical => counts.critical += 1,
                    HealthStatus::Unknown => counts.unknown += 1,
                }
                counts
            },
        )
    }

    /// Fold a batch of outcomes in and return the non-healthy results.
    pub(crate) fn apply(&mut self, outcomes: Vec<CheckOutcome>) -> Vec<CheckResult> {
        let now = epoch_secs();
        let mut unhealthy = Vec::new();

        for outcome in outcomes {
            let result = match self.checks.get_mut(&outcome.name) {
                Some(existing) => {
                    existing.status = outcome.status;
                    existing.message = outcome.message;
                    existing.threshold = outcome.threshold;
                    existing.last_check = outcome.evaluated_at;
                    existing.check_count += 1;
                    existing.clone()
                }
                None => {
                    let created = CheckResult {
                        name: outcome.name.clone(),
                        status: outcome.status,
                        message: outcome.message,
                        threshold: outcome.threshold,
                        last_check: outcome.evaluated_at,
                        check_count: 1,
                    };
                    self.checks.insert(outcome.name, created.clone());
                    created
                }
            };

            self.track_issue(&result, now);
            if !result.status.is_healthy() {
                unhealthy.push(result);
            }
        }

        self.overall_status = aggregate_status(self.checks.values().map(|c| c.status));
        self.last_updated = Some(now);
        unhealthy
    }

    fn track_issue(&mut self, result: &CheckResult, now: u64) {
        let pos = self.issues.iter().position(|i| i.component == result.name);
        match (pos, result.status.is_healthy()) {
            (Some(pos), true) => {
                self.issues.remove(pos);
            }
            (Some(pos), false) => {
                let issue = &mut self.issues[pos];
                issue.severity = result.status;
                issue.message = result.message.clone();
                issue.last_seen = now;
            }
            (None, false) => {
                self.issues_opened += 1;
                self.issues.push(HealthIssue {
                    id: format!("{}-{now}-{}", result.name, self.issues_opened),
                    component: result.name.clone(),
                    severity: result.status,
                    message: result.message.clone(),
                    first_seen: now,
                    last_seen: now,
                });
            }
            (None, true) => {}
        }
    }
}

/// Concurrency-safe holder of the current `ClusterHealth`.
#[derive(Debug, Default)]
pub struct HealthState {
    inner: RwLock<ClusterHealth>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of outcomes under the write lock.
    ///
    /// Existing checks are updated in place and their counter incremented;
    /// new checks start at one. Returns the non-healthy results.
    pub async fn merge(&self, outcomes: Vec<CheckOutcome>) -> Vec<CheckResult> {
        let mut health = self.inner.write().await;
        health.apply(outcomes)
    }

    /// Deep copy of the current state.
    pub async fn snapshot(&self) -> ClusterHealth {
        self.inner.read().await.clone()
    }

    pub async fn overall_status(&self) -> HealthStatus {
        self.inner.read().await.overall_status
    }
}
