//! Error types
//!
//! Normalization, extraction, similarity and clustering never fail. The only
//! fallible surfaces are parameter validation and configuration loading.

use thiserror::Error;

/// Result alias for fallible clustering operations
pub type ClusterResult<T> = Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Invalid threshold {0}: must be in (0, 1]")]
    InvalidThreshold(f64),

    #[error("Invalid min_cluster_size 0: must be at least 1")]
    InvalidMinClusterSize,

    #[error("Unknown sort key '{0}': expected 'count' or 'error_category'")]
    UnknownSortKey(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}
