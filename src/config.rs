// src/config.rs
// Store configuration: explicit record threaded through constructors
// Loading hierarchy: env > file > defaults

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::layout;

/// Engine configuration.
///
/// Every knob is explicit; nothing is read from process-wide properties at
/// use sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Partition name to file-system root; one entry per logical namespace.
    #[serde(default)]
    pub partitions: BTreeMap<String, PathBuf>,

    /// When true, `write` does not synchronously regenerate the cache; a
    /// recache record is enqueued instead.
    #[serde(default, rename = "async")]
    pub async_cache: bool,

    #[serde(default)]
    pub kafka: KafkaConfig,

    #[serde(default)]
    pub zk: ZkConfig,
}

/// Event-log options for the stream topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    #[serde(default = "default_bootstrap_servers", rename = "bootstrap.servers")]
    pub bootstrap_servers: String,

    /// Coalescing window size for recache events, in milliseconds.
    #[serde(default = "default_window_delay_ms", rename = "window.delay.ms")]
    pub window_delay_ms: u64,

    /// Max entries in the in-memory window store.
    #[serde(default = "default_window_cache_size", rename = "window.cache.size")]
    pub window_cache_size: usize,
}

/// Lock-service options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZkConfig {
    /// Per-resource lock acquisition timeout, in milliseconds.
    #[serde(default = "default_lock_wait_ms", rename = "lock.wait.ms")]
    pub lock_wait_ms: u64,
}

fn default_bootstrap_servers() -> String {
    "localhost:9092".to_string()
}

fn default_window_delay_ms() -> u64 {
    5000
}

fn default_window_cache_size() -> usize {
    4095
}

fn default_lock_wait_ms() -> u64 {
    100
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: default_bootstrap_servers(),
            window_delay_ms: default_window_delay_ms(),
            window_cache_size: default_window_cache_size(),
        }
    }
}

impl Default for ZkConfig {
    fn default() -> Self {
        Self {
            lock_wait_ms: default_lock_wait_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            partitions: BTreeMap::new(),
            async_cache: false,
            kafka: KafkaConfig::default(),
            zk: ZkConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Single-partition configuration rooted at `path`.
    pub fn single_partition(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.partitions.insert(name.into(), path.into());
        config
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Loads from file (when present) and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies `LDPSTORE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), StoreError> {
        if let Ok(value) = std::env::var("LDPSTORE_ASYNC") {
            self.async_cache = value
                .parse()
                .map_err(|_| StoreError::Config(format!("invalid LDPSTORE_ASYNC: {value}")))?;
        }
        if let Ok(value) = std::env::var("LDPSTORE_KAFKA_BOOTSTRAP_SERVERS") {
            self.kafka.bootstrap_servers = value;
        }
        if let Ok(value) = std::env::var("LDPSTORE_WINDOW_DELAY_MS") {
            self.kafka.window_delay_ms = value.parse().map_err(|_| {
                StoreError::Config(format!("invalid LDPSTORE_WINDOW_DELAY_MS: {value}"))
            })?;
        }
        if let Ok(value) = std::env::var("LDPSTORE_WINDOW_CACHE_SIZE") {
            self.kafka.window_cache_size = value.parse().map_err(|_| {
                StoreError::Config(format!("invalid LDPSTORE_WINDOW_CACHE_SIZE: {value}"))
            })?;
        }
        if let Ok(value) = std::env::var("LDPSTORE_ZK_LOCK_WAIT_MS") {
            self.zk.lock_wait_ms = value.parse().map_err(|_| {
                StoreError::Config(format!("invalid LDPSTORE_ZK_LOCK_WAIT_MS: {value}"))
            })?;
        }
        Ok(())
    }

    /// Resolves the partition root for an identifier.
    ///
    /// The first segment of the resource path selects the partition when it
    /// names one; otherwise, with exactly one configured partition, that
    /// partition takes everything.
    pub fn partition_root(&self, identifier: &str) -> Result<&Path, StoreError> {
        let path = layout::resource_path(identifier);
        let first = path.split('/').next().unwrap_or_default();
        if let Some(root) = self.partitions.get(first) {
            return Ok(root);
        }
        if self.partitions.len() == 1 {
            if let Some(root) = self.partitions.values().next() {
                return Ok(root);
            }
        }
        Err(StoreError::InvalidIdentifier(format!(
            "no partition configured for {identifier}"
        )))
    }

    /// Resolves the on-disk directory for an identifier.
    pub fn resource_directory(&self, identifier: &str) -> Result<PathBuf, StoreError> {
        Ok(layout::resource_directory(
            self.partition_root(identifier)?,
            identifier,
        ))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.zk.lock_wait_ms)
    }

    pub fn window_delay(&self) -> Duration {
        Duration::from_millis(self.kafka.window_delay_ms)
    }
}
