//! Read-only data source traits.
//!
//! The health engine only ever reads from the workload manager. Each
//! resource is exposed through its own source so an implementation can
//! back them with different commands or endpoints.

use crate::error::ProviderResult;
use crate::types::{ClusterMetrics, JobFilter, JobList, NodeFilter, NodeList};

/// Lists compute nodes.
pub trait NodeSource: Send + Sync {
    fn list(&self, filter: &NodeFilter) -> ProviderResult<NodeList>;
}

/// Lists jobs, optionally filtered by state.
pub trait JobSource: Send + Sync {
    fn list(&self, filter: &JobFilter) -> ProviderResult<JobList>;
}

/// Reports point-in-time cluster statistics.
pub trait MetricsSource: Send + Sync {
    fn stats(&self) -> ProviderResult<ClusterMetrics>;
}

/// Entry point to the workload manager client.
///
/// Calls may block (the usual client shells out to the workload manager
/// CLI), so async callers should run them on a blocking thread.
pub trait ClusterProvider: Send + Sync {
    fn nodes(&self) -> &dyn NodeSource;

    fn jobs(&self) -> &dyn JobSource;

    /// `None` when the client has no metrics source at all, which is
    /// distinct from a source whose `stats()` call fails.
    fn metrics(&self) -> Option<&dyn MetricsSource>;
}
