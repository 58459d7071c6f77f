//! In-memory provider backed by a fixed cluster snapshot.
//!
//! Used by tests and by the daemon when replaying a captured snapshot.
//! Data and injected failures can be swapped at any time, so a running
//! monitor observes the change on its next tick.

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::source::{ClusterProvider, JobSource, MetricsSource, NodeSource};
use crate::types::*;

/// A captured view of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<Option<Node>>,
    #[serde(default)]
    pub jobs: Vec<Option<Job>>,
    #[serde(default)]
    pub metrics: Option<ClusterMetrics>,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<Option<Node>>,
    jobs: Vec<Option<Job>>,
    metrics: Option<ClusterMetrics>,
    node_error: Option<ProviderError>,
    job_error: Option<ProviderError>,
    metrics_error: Option<ProviderError>,
}

/// Thread-safe in-memory `ClusterProvider`.
#[derive(Debug)]
pub struct StaticProvider {
    inner: RwLock<Inner>,
    metrics_source: bool,
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticProvider {
    /// An empty cluster with a metrics source that reports 0% usage.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                metrics: Some(ClusterMetrics::new(0.0, 0.0)),
                ..Default::default()
            }),
            metrics_source: true,
        }
    }

    /// Build a provider from a captured snapshot. A snapshot without
    /// metrics yields a provider with no metrics source.
    pub fn from_snapshot(snapshot: ClusterSnapshot) -> Self {
        let metrics_source = snapshot.metrics.is_some();
        Self {
            inner: RwLock::new(Inner {
                nodes: snapshot.nodes,
                jobs: snapshot.jobs,
                metrics: snapshot.metrics,
                ..Default::default()
            }),
            metrics_source,
        }
    }

    /// Load a JSON snapshot from disk.
    pub fn from_json_file(path: &Path) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Other(format!("{}: {e}", path.display())))?;
        let snapshot: ClusterSnapshot =
            serde_json::from_str(&content).map_err(|e| ProviderError::Decode(e.to_string()))?;
        debug!(
            ?path,
            nodes = snapshot.nodes.len(),
            jobs = snapshot.jobs.len(),
            "cluster snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn with_nodes(self, nodes: Vec<Node>) -> Self {
        self.set_nodes(nodes.into_iter().map(Some).collect());
        self
    }

    pub fn with_jobs(self, jobs: Vec<Job>) -> Self {
        self.set_jobs(jobs.into_iter().map(Some).collect());
        self
    }

    pub fn with_metrics(self, metrics: ClusterMetrics) -> Self {
        self.set_metrics(metrics);
        self
    }

    /// Remove the metrics source entirely.
    pub fn without_metrics_source(mut self) -> Self {
        self.metrics_source = false;
        self
    }

    pub fn with_node_error(self, error: ProviderError) -> Self {
        self.write().node_error = Some(error);
        self
    }

    pub fn with_job_error(self, error: ProviderError) -> Self {
        self.write().job_error = Some(error);
        self
    }

    pub fn with_metrics_error(self, error: ProviderError) -> Self {
        self.write().metrics_error = Some(error);
        self
    }

    /// Replace the node listing, including undecodable (`None`) entries.
    pub fn set_nodes(&self, nodes: Vec<Option<Node>>) {
        self.write().nodes = nodes;
    }

    pub fn set_jobs(&self, jobs: Vec<Option<Job>>) {
        self.write().jobs = jobs;
    }

    pub fn set_metrics(&self, metrics: ClusterMetrics) {
        self.write().metrics = Some(metrics);
    }

    pub fn set_node_error(&self, error: Option<ProviderError>) {
        self.write().node_error = error;
    }

    pub fn set_job_error(&self, error: Option<ProviderError>) {
        self.write().job_error = error;
    }

    pub fn set_metrics_error(&self, error: Option<ProviderError>) {
        self.write().metrics_error = error;
    }

    /// Current contents as a snapshot.
    pub fn snapshot(&self) -> ClusterSnapshot {
        let inner = self.read();
        ClusterSnapshot {
            nodes: inner.nodes.clone(),
            jobs: inner.jobs.clone(),
            metrics: if self.metrics_source { inner.metrics } else { None },
        }
    }

    // A poisoned lock only means a writer panicked mid-assignment; the
    // plain data inside is still usable.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl NodeSource for StaticProvider {
    fn list(&self, filter: &NodeFilter) -> ProviderResult<NodeList> {
        let inner = self.read();
        if let Some(err) = &inner.node_error {
            return Err(err.clone());
        }
        let nodes: Vec<Option<Node>> = inner
            .nodes
            .iter()
            .filter(|n| match n {
                Some(node) => filter.matches(node),
                None => true,
            })
            .cloned()
            .collect();
        Ok(NodeList::new(nodes))
    }
}

impl JobSource for StaticProvider {
    fn list(&self, filter: &JobFilter) -> ProviderResult<JobList> {
        let inner = self.read();
        if let Some(err) = &inner.job_error {
            return Err(err.clone());
        }
        let jobs: Vec<Option<Job>> = inner
            .jobs
            .iter()
            .filter(|j| j.as_ref().is_some_and(|job| filter.matches(job)))
            .cloned()
            .collect();
        Ok(JobList::new(jobs))
    }
}

impl MetricsSource for StaticProvider {
    fn stats(&self) -> ProviderResult<ClusterMetrics> {
        let inner = self.read();
        if let Some(err) = &inner.metrics_error {
            return Err(err.clone());
        }
        inner
            .metrics
            .ok_or_else(|| ProviderError::Other("no metrics reported".to_string()))
    }
}

impl ClusterProvider for StaticProvider {
    fn nodes(&self) -> &dyn NodeSource {
        self
    }

    fn jobs(&self) -> &dyn JobSource {
        self
    }

    fn metrics(&self) -> Option<&dyn MetricsSource> {
        if self.metrics_source {
            Some(self)
        } else {
            None
        }
    }
}
