//! clusterwatch-score — composite cluster health score.
//!
//! A pure function over a node listing, a job listing and optional
//! cluster metrics, producing a 0-100 score and a qualitative tier.
//! Independent of the health monitor and its cadence.
//!
//! # Deductions
//!
//! - **Nodes**: percent of nodes down or draining, times 2
//! - **Jobs**: percent of jobs failed, times 1
//! - **Resources**: 10 each for CPU and memory above 95%

pub mod scorer;

pub use scorer::{
    HealthScore, HealthTier, ScoreBreakdown, compute_health_score, job_deduction, node_deduction,
    resource_deduction,
};
