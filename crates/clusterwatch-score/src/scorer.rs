//! Health score computation.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use clusterwatch_provider::{ClusterMetrics, Job, JobState, Node, count_node_states};

/// Points deducted per percent of unavailable nodes.
pub const NODE_WEIGHT: f64 = 2.0;
/// Points deducted per percent of failed jobs.
pub const JOB_WEIGHT: f64 = 1.0;
/// Usage above this percent is penalized.
pub const RESOURCE_CEILING: f64 = 95.0;
/// Points deducted for each resource above the ceiling.
pub const RESOURCE_PENALTY: f64 = 10.0;

/// Qualitative band of a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthTier {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthTier {
    /// >=90 Excellent, >=75 Good, >=60 Fair, >=40 Poor, else Critical.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthTier::Excellent
        } else if score >= 75.0 {
            HealthTier::Good
        } else if score >= 60.0 {
            HealthTier::Fair
        } else if score >= 40.0 {
            HealthTier::Poor
        } else {
            HealthTier::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTier::Excellent => "EXCELLENT",
            HealthTier::Good => "GOOD",
            HealthTier::Fair => "FAIR",
            HealthTier::Poor => "POOR",
            HealthTier::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for HealthTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual deductions behind a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub nodes: f64,
    pub jobs: f64,
    pub resources: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.nodes + self.jobs + self.resources
    }
}

/// Composite health score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// 0.0..=100.0
    pub score: f64,
    pub tier: HealthTier,
    pub breakdown: ScoreBreakdown,
}

/// Score a cluster snapshot. No data at all scores 100.
pub fn compute_health_score(
    nodes: &[Option<Node>],
    jobs: &[Option<Job>],
    metrics: Option<&ClusterMetrics>,
) -> HealthScore {
    let breakdown = ScoreBreakdown {
        nodes: node_deduction(nodes),
        jobs: job_deduction(jobs),
        resources: resource_deduction(metrics),
    };
    let score = (100.0 - breakdown.total()).clamp(0.0, 100.0);
    let tier = HealthTier::from_score(score);
    debug!(
        score,
        %tier,
        nodes = breakdown.nodes,
        jobs = breakdown.jobs,
        resources = breakdown.resources,
        "health score computed"
    );
    HealthScore {
        score,
        tier,
        breakdown,
    }
}

/// Percent of nodes down or draining, weighted. Zero with no nodes.
pub fn node_deduction(nodes: &[Option<Node>]) -> f64 {
    let counts = count_node_states(nodes);
    if counts.total == 0 {
        return 0.0;
    }
    percent(counts.unavailable(), counts.total) * NODE_WEIGHT
}

/// Percent of all listed jobs that failed, weighted. Zero with no jobs.
pub fn job_deduction(jobs: &[Option<Job>]) -> f64 {
    if jobs.is_empty() {
        return 0.0;
    }
    let failed = jobs
        .iter()
        .flatten()
        .filter(|j| j.state == JobState::Failed)
        .count();
    percent(failed, jobs.len()) * JOB_WEIGHT
}

/// Fixed penalty per resource strictly above the ceiling. Unreported
/// memory is not penalized.
pub fn resource_deduction(metrics: Option<&ClusterMetrics>) -> f64 {
    let Some(metrics) = metrics else {
        return 0.0;
    };
    let mut deduction = 0.0;
    if metrics.cpu_usage > RESOURCE_CEILING {
        deduction += RESOURCE_PENALTY;
    }
    if metrics.memory_usage().is_some_and(|m| m > RESOURCE_CEILING) {
        deduction += RESOURCE_PENALTY;
    }
    deduction
}

// Multiply before dividing so whole percentages stay exact.
fn percent(part: usize, total: usize) -> f64 {
    part as f64 * 100.0 / total as f64
}
