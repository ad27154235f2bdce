//! Server configuration.
//!
//! This module provides configuration management for the Cairn server:
//! the data directory, the WAL section, and the object space schema.
//!
//! ```toml
//! data_dir = "/var/lib/cairn"
//!
//! [wal]
//! sync_mode = "normal"
//!
//! [[object_space]]
//! id = 0
//!
//! [[object_space.index]]
//! type = "HASH"
//! unique = true
//!
//! [[object_space.index.key_field]]
//! fieldno = 0
//! type = "NUM"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use cairn_common::config::SpaceConfig;
use cairn_common::constants::{
    DEFAULT_WAL_SEGMENT_SIZE, GROUP_COMMIT_BATCH_SIZE, MAX_WAL_RECORD_SIZE,
};
use cairn_common::error::{CairnError, CairnResult};
use cairn_wal::{SyncPolicy, WalConfig};

/// WAL sync mode as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalSyncMode {
    /// Never sync.
    None,
    /// Sync once per batch.
    #[default]
    Normal,
    /// Sync after every record.
    Full,
}

impl From<WalSyncMode> for SyncPolicy {
    fn from(mode: WalSyncMode) -> Self {
        match mode {
            WalSyncMode::None => SyncPolicy::Never,
            WalSyncMode::Normal => SyncPolicy::GroupCommit,
            WalSyncMode::Full => SyncPolicy::EveryWrite,
        }
    }
}

/// WAL section of the server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalSection {
    /// Keep the log in memory only. Nothing survives a restart.
    #[serde(default)]
    pub memory: bool,

    /// WAL directory (defaults to data_dir/wal).
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Sync mode.
    #[serde(default)]
    pub sync_mode: WalSyncMode,

    /// Segment file size in bytes.
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,

    /// Maximum records written per group commit.
    #[serde(default = "default_batch_size")]
    pub group_commit_batch_size: usize,
}

fn default_segment_size() -> usize {
    DEFAULT_WAL_SEGMENT_SIZE
}

fn default_batch_size() -> usize {
    GROUP_COMMIT_BATCH_SIZE
}

impl Default for WalSection {
    fn default() -> Self {
        Self {
            memory: false,
            dir: None,
            sync_mode: WalSyncMode::default(),
            segment_size: default_segment_size(),
            group_commit_batch_size: default_batch_size(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Data directory for persistent storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write-ahead log settings.
    #[serde(default)]
    pub wal: WalSection,

    /// Object space definitions.
    #[serde(default)]
    pub object_space: Vec<SpaceConfig>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            wal: WalSection::default(),
            object_space: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the effective WAL directory.
    pub fn effective_wal_dir(&self) -> PathBuf {
        self.wal
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("wal"))
    }

    /// Builds the WAL configuration.
    ///
    /// The record size limit shrinks to half a segment for small segments.
    pub fn wal_config(&self) -> WalConfig {
        WalConfig::new(self.effective_wal_dir())
            .with_segment_size(self.wal.segment_size)
            .with_max_record_size(MAX_WAL_RECORD_SIZE.min(self.wal.segment_size / 2))
            .with_sync_policy(self.wal.sync_mode.into())
            .with_group_commit_batch_size(self.wal.group_commit_batch_size)
    }

    /// Returns the spaces created at startup.
    pub fn enabled_spaces(&self) -> impl Iterator<Item = &SpaceConfig> {
        self.object_space.iter().filter(|s| s.enabled)
    }

    /// Validates the WAL settings and every object space.
    pub fn validate(&self) -> CairnResult<()> {
        if !self.wal.memory {
            self.wal_config().validate()?;
        }
        if self.wal.group_commit_batch_size == 0 {
            return Err(CairnError::invalid_config(
                "wal: group_commit_batch_size must be greater than 0",
            ));
        }
        let mut seen = HashSet::new();
        for space in &self.object_space {
            if !seen.insert(space.id) {
                return Err(CairnError::invalid_config(format!(
                    "object_space {} defined twice",
                    space.id
                )));
            }
            space.validate()?;
        }
        Ok(())
    }

    /// Creates a builder for configuration.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

/// Builder for server configuration.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Keeps the WAL in memory.
    pub fn memory_wal(mut self, enabled: bool) -> Self {
        self.config.wal.memory = enabled;
        self
    }

    /// Sets the WAL sync mode.
    pub fn sync_mode(mut self, mode: WalSyncMode) -> Self {
        self.config.wal.sync_mode = mode;
        self
    }

    /// Sets the WAL segment size.
    pub fn segment_size(mut self, size: usize) -> Self {
        self.config.wal.segment_size = size;
        self
    }

    /// Adds an object space.
    pub fn space(mut self, space: SpaceConfig) -> Self {
        self.config.object_space.push(space);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
