//! Configuration management for tasktree
//!
//! Repository-level settings live in `.tasktree/config.toml`. Every field
//! has a default, so a missing file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::system::{IdentifierPolicy, DEFAULT_MIN_ID_LEN};
use crate::{Error, Result};

/// Name of the per-repository directory holding config and snapshot.
pub const CONFIG_DIR: &str = ".tasktree";

const CONFIG_FILE: &str = "config.toml";

/// Repository-level tasktree configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTreeConfig {
    /// Minimum number of characters in a task id
    #[serde(default = "default_min_id_length")]
    pub min_id_length: usize,

    /// Snapshot file, relative to the `.tasktree` directory
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,
}

fn default_min_id_length() -> usize {
    DEFAULT_MIN_ID_LEN
}

fn default_snapshot_file() -> PathBuf {
    PathBuf::from("tree.json")
}

impl TaskTreeConfig {
    /// Load configuration from `{dir}/config.toml` or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            config.policy()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Write this configuration to `{dir}/config.toml`
    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(dir.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Write default configuration to `{dir}/config.toml`
    pub fn write_default(dir: &Path) -> Result<()> {
        Self::default().write(dir)
    }

    /// Identifier policy described by this configuration
    pub fn policy(&self) -> Result<IdentifierPolicy> {
        IdentifierPolicy::new(self.min_id_length)
    }

    /// Absolute location of the snapshot file for a `.tasktree` directory
    pub fn snapshot_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.snapshot_file)
    }
}

impl Default for TaskTreeConfig {
    fn default() -> Self {
        Self {
            min_id_length: default_min_id_length(),
            snapshot_file: default_snapshot_file(),
        }
    }
}
