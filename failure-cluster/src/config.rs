//! Configuration loading (.failure-cluster.toml)
//!
//! ```toml
//! [normalizer]
//! extra_id_patterns = ['\bchassis[A-Z]\b']
//!
//! [clustering]
//! threshold = 0.85
//! min_cluster_size = 2
//! sort_by = "error_category"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::ClusteringEngine;
use crate::error::ClusterResult;
use crate::normalize::{Normalizer, NormalizerConfig};
use crate::params::ClusterParams;

/// Project-local config file name
pub const CONFIG_FILE_NAME: &str = ".failure-cluster.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. `start` and its parent directories
/// 2. `<config_dir>/failure-cluster/config.toml`
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        current = dir.parent();
    }

    // Fallback: global config
    let global_path = dirs::config_dir()?.join("failure-cluster").join("config.toml");
    global_path.exists().then_some(global_path)
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub clustering: ClusterParams,
}

impl FileConfig {
    /// Discover and load the config for the current directory.
    ///
    /// Returns `None` when no file exists anywhere on the search path.
    pub fn load() -> ClusterResult<Option<Self>> {
        let cwd = std::env::current_dir()?;
        Self::load_from_dir(&cwd)
    }

    /// Discover and load starting from `dir`
    pub fn load_from_dir(dir: &Path) -> ClusterResult<Option<Self>> {
        if let Some(config_path) = find_config_file(dir) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path).map(Some);
        }

        tracing::debug!("No {} found", CONFIG_FILE_NAME);
        Ok(None)
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> ClusterResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ClusterResult<Self> {
        let config: FileConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Compile the normalizer patterns into an engine
    pub fn build_engine(&self) -> ClusterResult<ClusteringEngine> {
        let normalizer = Normalizer::from_config(&self.normalizer)?;
        Ok(ClusteringEngine::new(normalizer))
    }
}
