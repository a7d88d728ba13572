//! Clustering parameters
//!
//! The engine's behavior is only defined for valid parameters; callers
//! validate with [`ClusterParams::validate`] before clustering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};

/// Ranking key for the returned clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Member count descending, category ascending
    #[default]
    Count,
    /// Category ascending, member count descending
    ErrorCategory,
}

impl FromStr for SortBy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "error_category" | "error-category" | "category" => Ok(Self::ErrorCategory),
            _ => Err(ClusterError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Count => write!(f, "count"),
            SortBy::ErrorCategory => write!(f, "error_category"),
        }
    }
}

/// Parameters for one clustering call (also the `[clustering]` config section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Minimum similarity for a fuzzy match, in (0, 1]
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Clusters smaller than this are left off the page
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    #[serde(default)]
    pub sort_by: SortBy,

    #[serde(default)]
    pub skip: usize,

    /// Page size; `None` returns everything after `skip`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

fn default_threshold() -> f64 {
    0.8
}

fn default_min_cluster_size() -> usize {
    1
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_cluster_size: default_min_cluster_size(),
            sort_by: SortBy::default(),
            skip: 0,
            limit: None,
        }
    }
}

impl ClusterParams {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size;
        self
    }

    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_page(mut self, skip: usize, limit: Option<usize>) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// Reject parameters outside the engine's contract
    pub fn validate(&self) -> ClusterResult<()> {
        // written to also reject NaN
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ClusterError::InvalidThreshold(self.threshold));
        }
        if self.min_cluster_size == 0 {
            return Err(ClusterError::InvalidMinClusterSize);
        }
        Ok(())
    }
}
