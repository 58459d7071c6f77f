//! Snapshot types returned by the workload manager client.
//!
//! These mirror what the workload manager reports for nodes, jobs, and
//! cluster-wide statistics. All types are serializable so snapshots can be
//! captured to and replayed from JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Node ──────────────────────────────────────────────────────────

/// State tag of a compute node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeState {
    Idle,
    Allocated,
    Mixed,
    Down,
    Drain,
    Draining,
    Drained,
    /// A tag this client does not recognise.
    Unknown(String),
}

impl NodeState {
    /// Parse a workload manager state tag.
    ///
    /// Compound tags such as `IDLE+DRAIN` or `MIXED*` are reduced to the
    /// most significant flag: down beats drain, drain beats the base state.
    pub fn parse(tag: &str) -> Self {
        let upper = tag.trim().to_ascii_uppercase();
        let parts: Vec<&str> = upper
            .split('+')
            .map(|p| p.trim_end_matches(['*', '~', '#', '!', '%', '$', '@', '^', '-']))
            .filter(|p| !p.is_empty())
            .collect();

        let has = |flag: &str| parts.iter().any(|p| *p == flag);
        if has("DOWN") {
            return NodeState::Down;
        }
        if has("DRAINING") {
            return NodeState::Draining;
        }
        if has("DRAINED") {
            return NodeState::Drained;
        }
        if has("DRAIN") {
            return NodeState::Drain;
        }

        match parts.first().copied() {
            Some("IDLE") => NodeState::Idle,
            Some("ALLOCATED") | Some("ALLOC") => NodeState::Allocated,
            Some("MIXED") | Some("MIX") => NodeState::Mixed,
            _ => NodeState::Unknown(tag.trim().to_string()),
        }
    }

    /// Canonical upper-case tag.
    pub fn as_str(&self) -> &str {
        match self {
            NodeState::Idle => "IDLE",
            NodeState::Allocated => "ALLOCATED",
            NodeState::Mixed => "MIXED",
            NodeState::Down => "DOWN",
            NodeState::Drain => "DRAIN",
            NodeState::Draining => "DRAINING",
            NodeState::Drained => "DRAINED",
            NodeState::Unknown(tag) => tag,
        }
    }

    pub fn is_down(&self) -> bool {
        matches!(self, NodeState::Down)
    }

    /// Drain, draining and drained all count as drain.
    pub fn is_drain(&self) -> bool {
        matches!(
            self,
            NodeState::Drain | NodeState::Draining | NodeState::Drained
        )
    }
}

impl From<String> for NodeState {
    fn from(tag: String) -> Self {
        NodeState::parse(&tag)
    }
}

impl From<NodeState> for String {
    fn from(state: NodeState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compute node as reported by the workload manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub state: NodeState,
    #[serde(default)]
    pub partitions: Vec<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, state: NodeState) -> Self {
        Self {
            name: name.into(),
            state,
            partitions: Vec::new(),
        }
    }
}

/// Result of a node listing.
///
/// Entries the client could not decode are kept as `None` so they still
/// count toward `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeList {
    pub nodes: Vec<Option<Node>>,
    pub total: usize,
}

impl NodeList {
    pub fn new(nodes: Vec<Option<Node>>) -> Self {
        let total = nodes.len();
        Self { nodes, total }
    }
}

/// Down/drain tallies over a node listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStateCounts {
    pub total: usize,
    pub down: usize,
    pub drain: usize,
}

impl NodeStateCounts {
    pub fn unavailable(&self) -> usize {
        self.down + self.drain
    }

    /// Fraction (0.0..=1.0) of nodes that are down or draining.
    /// Zero when there are no nodes.
    pub fn unavailable_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unavailable() as f64 / self.total as f64
        }
    }
}

/// Count down and drain nodes. Undecodable entries count toward the total
/// only.
pub fn count_node_states(nodes: &[Option<Node>]) -> NodeStateCounts {
    nodes.iter().fold(
        NodeStateCounts {
            total: nodes.len(),
            ..Default::default()
        },
        |mut counts, node| {
            if let Some(node) = node {
                if node.state.is_down() {
                    counts.down += 1;
                } else if node.state.is_drain() {
                    counts.drain += 1;
                }
            }
            counts
        },
    )
}

/// Filter for node listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    #[serde(default)]
    pub states: Vec<NodeState>,
    #[serde(default)]
    pub partitions: Vec<String>,
}

impl NodeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, node: &Node) -> bool {
        (self.states.is_empty() || self.states.contains(&node.state))
            && (self.partitions.is_empty()
                || node.partitions.iter().any(|p| self.partitions.contains(p)))
    }
}

// ── Job ───────────────────────────────────────────────────────────

/// State tag of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    Unknown(String),
}

impl JobState {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "PD" => JobState::Pending,
            "RUNNING" | "R" => JobState::Running,
            "COMPLETED" | "CD" => JobState::Completed,
            "FAILED" | "F" => JobState::Failed,
            "CANCELLED" | "CA" => JobState::Cancelled,
            "TIMEOUT" | "TO" => JobState::Timeout,
            _ => JobState::Unknown(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
            JobState::Timeout => "TIMEOUT",
            JobState::Unknown(tag) => tag,
        }
    }
}

impl From<String> for JobState {
    fn from(tag: String) -> Self {
        JobState::parse(&tag)
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as reported by the workload manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub partition: String,
    pub state: JobState,
    /// Unix timestamp (seconds) when the job was submitted.
    #[serde(default)]
    pub submit_time: u64,
}

impl Job {
    pub fn new(id: impl Into<String>, state: JobState) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            user: String::new(),
            partition: String::new(),
            state,
            submit_time: 0,
        }
    }
}

/// Result of a job listing. Undecodable entries are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    pub jobs: Vec<Option<Job>>,
    pub total: usize,
}

impl JobList {
    pub fn new(jobs: Vec<Option<Job>>) -> Self {
        let total = jobs.len();
        Self { jobs, total }
    }
}

/// Filter for job listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub states: Vec<JobState>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub partitions: Vec<String>,
}

impl JobFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(state: JobState) -> Self {
        Self {
            states: vec![state],
            ..Default::default()
        }
    }

    pub fn matches(&self, job: &Job) -> bool {
        (self.states.is_empty() || self.states.contains(&job.state))
            && (self.users.is_empty() || self.users.contains(&job.user))
            && (self.partitions.is_empty() || self.partitions.contains(&job.partition))
    }
}

// ── Metrics ───────────────────────────────────────────────────────

/// Point-in-time cluster statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetrics {
    /// CPU utilization percentage (0-100).
    pub cpu_usage: f64,
    /// Memory utilization percentage (0-100). Negative means the
    /// workload manager did not report memory.
    pub memory_usage: f64,
    #[serde(default)]
    pub total_nodes: u32,
    #[serde(default)]
    pub total_jobs: u32,
}

impl ClusterMetrics {
    /// Sentinel value for unreported memory usage.
    pub const MEMORY_UNAVAILABLE: f64 = -1.0;

    pub fn new(cpu_usage: f64, memory_usage: f64) -> Self {
        Self {
            cpu_usage,
            memory_usage,
            total_nodes: 0,
            total_jobs: 0,
        }
    }

    pub fn memory_available(&self) -> bool {
        self.memory_usage >= 0.0
    }

    /// Memory usage, or `None` when the sentinel is set.
    pub fn memory_usage(&self) -> Option<f64> {
        self.memory_available().then_some(self.memory_usage)
    }
}
