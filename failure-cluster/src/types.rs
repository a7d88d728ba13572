//! Input records and clustering output types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signature::{ErrorCategory, ErrorSignature};

/// Priority bucket for records that carry no priority
pub const UNKNOWN_PRIORITY: &str = "unknown";

// ============================================================================
// Input
// ============================================================================

/// One failed test, as loaded by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub test_name: String,

    /// Raw failure message; absent is treated as empty
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Any other identifying metadata, passed through for drill-down
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl FailureRecord {
    /// Create a record with a test name and raw message
    pub fn new(test_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::without_message(test_name)
        }
    }

    /// Create a record whose message is missing
    pub fn without_message(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            message: None,
            stack_trace: None,
            priority: None,
            topology: None,
            module: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_topology(mut self, topology: impl Into<String>) -> Self {
        self.topology = Some(topology.into());
        self
    }

    /// Raw message, empty when absent
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// Priority bucket used for per-priority counts
    pub fn priority_key(&self) -> &str {
        self.priority.as_deref().unwrap_or(UNKNOWN_PRIORITY)
    }
}

// ============================================================================
// Output
// ============================================================================

/// How a cluster's members were admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Every member shares the representative's fingerprint
    Exact,
    /// At least one member was admitted by similarity threshold
    Fuzzy,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// A group of failures believed to share one root cause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Signature of the first member
    pub signature: ErrorSignature,
    pub match_type: MatchType,
    pub count: usize,
    /// Distinct topologies, sorted
    pub topologies: Vec<String>,
    /// Member count per priority
    pub priorities: BTreeMap<String, usize>,
    /// Raw message of the first member
    pub sample_message: String,
    pub members: Vec<FailureRecord>,
}

impl Cluster {
    pub fn error_category(&self) -> &ErrorCategory {
        &self.signature.error_category
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.test_name.as_str())
    }
}

/// Run-level counts, independent of pagination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub total_failures: usize,
    /// Clusters meeting `min_cluster_size`
    pub unique_clusters: usize,
    /// Largest member count among those clusters, 0 if none
    pub largest_cluster: usize,
    /// Size-1 clusters among all clusters formed
    pub unclustered: usize,
}

/// The slice of the ranked list that was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub skip: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    pub returned: usize,
}

/// Result of one clustering call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub clusters: Vec<Cluster>,
    pub summary: ClusterSummary,
    pub page: PageInfo,
}
