//! Upload tuning knobs.
//!
//! Stored as TOML when persisted, e.g.:
//!
//! ```toml
//! block_bits = 22
//! chunk_size = 262144
//! retry_times = 3
//! workers = 4
//! ```

use std::path::Path;
use std::time::Duration;

use blockput_protocol::{DEFAULT_BLOCK_BITS, DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_TIMES};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest supported block size exponent (1 TiB blocks).
const MAX_BLOCK_BITS: u32 = 40;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Block size exponent; blocks are `1 << block_bits` bytes.
    #[serde(default = "default_block_bits")]
    pub block_bits: u32,

    /// Bytes sent per `mkblk`/`bput` call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Extra attempts allowed for each chunk range.
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,

    /// Concurrent block workers (0 = one per block).
    #[serde(default)]
    pub workers: usize,

    /// Pending jobs the pool queue holds (0 = one per block).
    #[serde(default)]
    pub queue_capacity: usize,

    /// Deadline for each network call in milliseconds (0 = none).
    #[serde(default)]
    pub call_timeout_ms: u64,

    /// Times a block may restart after invalid-context answers
    /// (`None` = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_block_restarts: Option<u32>,
}

fn default_block_bits() -> u32 {
    DEFAULT_BLOCK_BITS
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_retry_times() -> u32 {
    DEFAULT_RETRY_TIMES
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            block_bits: default_block_bits(),
            chunk_size: default_chunk_size(),
            retry_times: default_retry_times(),
            workers: 0,
            queue_capacity: 0,
            call_timeout_ms: 0,
            max_block_restarts: None,
        }
    }
}

impl UploadConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: UploadConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "upload configuration loaded");
        Ok(config)
    }

    /// Saves configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_bits == 0 || self.block_bits > MAX_BLOCK_BITS {
            return Err(ConfigError::Invalid(format!(
                "block_bits must be in 1..={MAX_BLOCK_BITS}, got {}",
                self.block_bits
            )));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        Ok(())
    }

    /// Full block size in bytes.
    pub fn block_size(&self) -> u64 {
        1u64 << self.block_bits
    }

    /// Number of blocks an object of `size` bytes splits into.
    pub fn block_count(&self, size: u64) -> usize {
        let mask = self.block_size() - 1;
        ((size + mask) >> self.block_bits) as usize
    }

    /// Size of block `index` within an object of `size` bytes.
    ///
    /// Every block is `block_size()` except the last, which holds the rest.
    pub fn block_len(&self, index: usize, size: u64) -> u64 {
        let base = (index as u64) << self.block_bits;
        size.saturating_sub(base).min(self.block_size())
    }

    /// Worker count for `blocks` blocks.
    pub fn workers_for(&self, blocks: usize) -> usize {
        if self.workers == 0 { blocks } else { self.workers }
    }

    /// Queue capacity for `blocks` blocks.
    pub fn queue_for(&self, blocks: usize) -> usize {
        if self.queue_capacity == 0 {
            blocks
        } else {
            self.queue_capacity
        }
    }

    /// Per-call deadline, if any.
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }
}
