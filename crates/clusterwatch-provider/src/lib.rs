//! clusterwatch-provider — read-only view of a workload-managed cluster.
//!
//! Defines the narrow contract the health engine consumes from the
//! workload manager client: node listings, job listings filtered by
//! state, and cluster-wide CPU/memory statistics.
//!
//! # Architecture
//!
//! ```text
//! ClusterProvider
//!   ├── nodes()   → NodeSource::list(NodeFilter)    → NodeList
//!   ├── jobs()    → JobSource::list(JobFilter)      → JobList
//!   └── metrics() → Option<MetricsSource>::stats()  → ClusterMetrics
//! ```
//!
//! `StaticProvider` implements the contract in memory, for tests and for
//! replaying captured JSON snapshots.

pub mod error;
pub mod fixture;
pub mod source;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use fixture::{ClusterSnapshot, StaticProvider};
pub use source::{ClusterProvider, JobSource, MetricsSource, NodeSource};
pub use types::*;
