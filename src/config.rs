//! Engine configuration, per spec.md §6 "Configuration options".
//!
//! Loadable from a JSON file, with defaults matching every row of the
//! configuration table.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::http_server::HttpServerConfig;
use crate::wal::DurabilityLevel;

fn default_wal_dir() -> PathBuf {
    PathBuf::from("./data/wal")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./data/checkpoints")
}

const fn default_max_memory_mib() -> u64 {
    256
}

const fn default_checkpoint_interval_secs() -> u64 {
    30
}

const fn default_max_wal_size_bytes() -> u64 {
    100 * 1024 * 1024
}

const fn default_checkpoint_threshold() -> usize {
    1000
}

const fn default_wal_retention_count() -> usize {
    2
}

const fn default_checkpoint_retention_count() -> usize {
    2
}

const fn default_cleanup_interval_secs() -> u64 {
    60
}

const fn default_cache_capacity() -> usize {
    10_000
}

const fn default_batch_limit() -> usize {
    1000
}

/// Durability policy, serialized as one of `"none" | "memory" | "os" | "full"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityConfig {
    None,
    Memory,
    Os,
    Full,
}

impl Default for DurabilityConfig {
    fn default() -> Self {
        DurabilityConfig::Os
    }
}

impl From<DurabilityConfig> for DurabilityLevel {
    fn from(value: DurabilityConfig) -> Self {
        match value {
            DurabilityConfig::None => DurabilityLevel::None,
            DurabilityConfig::Memory => DurabilityLevel::Memory,
            DurabilityConfig::Os => DurabilityLevel::Os,
            DurabilityConfig::Full => DurabilityLevel::Full,
        }
    }
}

/// Every row of spec.md §6's configuration table, plus a reserved,
/// currently-inert compression flag (spec.md §1 Non-goals: "compression or
/// encryption of persisted data (hooks are reserved but not required)").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Location of WAL segments.
    pub wal_dir: PathBuf,
    /// Root for on-disk state.
    pub data_dir: PathBuf,
    /// Location of checkpoint files.
    pub checkpoint_dir: PathBuf,
    /// Soft memory budget, currently spent entirely on `cache_capacity`.
    pub max_memory_mib: u64,
    /// Maximum documents the LRU cache holds.
    pub cache_capacity: usize,
    /// Periodic checkpoint tick, in seconds.
    pub checkpoint_interval_secs: u64,
    /// Size-based checkpoint trigger.
    pub max_wal_size_bytes: u64,
    /// Dirty-collection count trigger.
    pub checkpoint_threshold: usize,
    /// Write durability policy.
    pub durability: DurabilityConfig,
    /// Minimum WAL segments to preserve regardless of checkpoint coverage.
    pub wal_retention_count: usize,
    /// Minimum checkpoint files to preserve (besides `latest_checkpoint`).
    pub checkpoint_retention_count: usize,
    /// How often retention is applied, in seconds.
    pub cleanup_interval_secs: u64,
    /// Maximum documents accepted by a single `batch_insert`/`batch_update`.
    pub batch_limit: usize,
    /// Reserved; off by default per spec.md §1 Non-goals.
    pub compression: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wal_dir: default_wal_dir(),
            data_dir: default_data_dir(),
            checkpoint_dir: default_checkpoint_dir(),
            max_memory_mib: default_max_memory_mib(),
            cache_capacity: default_cache_capacity(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            max_wal_size_bytes: default_max_wal_size_bytes(),
            checkpoint_threshold: default_checkpoint_threshold(),
            durability: DurabilityConfig::default(),
            wal_retention_count: default_wal_retention_count(),
            checkpoint_retention_count: default_checkpoint_retention_count(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            batch_limit: default_batch_limit(),
            compression: false,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a JSON file, falling back to defaults for
    /// any field the file omits.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("failed to read config {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("invalid config JSON in {}: {e}", path.display())))
    }

    /// Writes the current configuration to `path` as pretty JSON. Used by
    /// the `init` CLI command to scaffold a starter config file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("failed to create {}: {e}", parent.display())))?;
        }
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(format!("failed to write config {}: {e}", path.display())))
    }
}

/// Top-level configuration file loaded by the `ledgerdb` CLI: the engine
/// options of spec.md §6 plus the HTTP adapter's bind address and CORS
/// policy. The engine itself only knows about [`EngineConfig`]; this wrapper
/// exists so `ledgerdb.json` is a single file for operators to edit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub http: HttpServerConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("failed to read config {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("invalid config JSON in {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("failed to create {}: {e}", parent.display())))?;
        }
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(format!("failed to write config {}: {e}", path.display())))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "{msg}"),
            ConfigError::Parse(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
