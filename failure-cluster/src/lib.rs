//! Failure Cluster Library
//!
//! Collapses the failures of a bulk test run into a small number of ranked
//! root-cause clusters, so "73 tests failed because of X" replaces 73
//! near-duplicate messages that differ only in device IDs, addresses or
//! timestamps.
//!
//! # Pipeline
//!
//! - **Normalizer**: masks variable substrings (IPs, hex, UUIDs, paths,
//!   numbers, device identifiers) with fixed placeholders
//! - **Signature**: category + normalized message + location + fingerprint
//! - **Similarity**: score in `[0, 1]` between two signatures
//! - **Engine**: greedy single-pass clustering, ranking and pagination
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use failure_cluster::{cluster, ClusterParams, FailureRecord};
//!
//! let records = vec![
//!     FailureRecord::new("test_ping_a", "AssertionError: IP 10.0.0.1 unreachable"),
//!     FailureRecord::new("test_ping_b", "AssertionError: IP 10.0.0.2 unreachable"),
//! ];
//! let report = cluster(&records, &ClusterParams::default());
//! assert_eq!(report.summary.unique_clusters, 1);
//! ```
//!
//! The engine is pure and synchronous: it holds no state between calls and
//! performs no I/O.

pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod params;
pub mod report;
pub mod signature;
pub mod similarity;
pub mod types;

// Re-export the main entry points
pub use engine::{cluster, try_cluster, ClusteringEngine};
pub use error::{ClusterError, ClusterResult};
pub use normalize::{Normalizer, NormalizerConfig};
pub use params::{ClusterParams, SortBy};
pub use signature::{ErrorCategory, ErrorSignature, SourceLocation};
pub use types::{Cluster, ClusterReport, ClusterSummary, FailureRecord, MatchType, PageInfo};
