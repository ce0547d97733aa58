//! Error types for each layer of the engine.

use std::time::Duration;

use blockput_protocol::STATUS_INVALID_CONTEXT;
use blockput_transport::TransportError;

/// Failure of a single chunk exchange.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The service no longer recognises the block context.
    #[error("block context rejected by the service")]
    InvalidContext,

    #[error("crc32 mismatch: sent {expected:#010x}, service reported {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("service accepted the chunk without returning a context")]
    EmptyContext,

    #[error(transparent)]
    Transport(TransportError),

    #[error("reading source: {0}")]
    Source(#[from] std::io::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TransportError> for ChunkError {
    fn from(e: TransportError) -> Self {
        if e.is_status(STATUS_INVALID_CONTEXT) {
            Self::InvalidContext
        } else {
            Self::Transport(e)
        }
    }
}

impl ChunkError {
    pub fn is_invalid_context(&self) -> bool {
        matches!(self, Self::InvalidContext)
    }
}

/// Terminal failure of one block.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block {block}: giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        block: usize,
        attempts: u32,
        #[source]
        source: ChunkError,
    },

    #[error("block {block}: stored offset {offset} exceeds block size {block_size}")]
    InvalidProgress {
        block: usize,
        offset: u64,
        block_size: u64,
    },

    #[error("block {block}: context invalidated {restarts} times")]
    TooManyRestarts { block: usize, restarts: u32 },

    #[error("block {block}: cancelled")]
    Cancelled { block: usize },
}

impl BlockError {
    /// Index of the failed block.
    pub fn block(&self) -> usize {
        match self {
            Self::RetriesExhausted { block, .. }
            | Self::InvalidProgress { block, .. }
            | Self::TooManyRestarts { block, .. }
            | Self::Cancelled { block } => *block,
        }
    }
}

/// Failure of a whole upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("progress has {actual} records, object needs {expected}")]
    ProgressLength { expected: usize, actual: usize },

    #[error("source holds {actual} bytes, upload size is {expected}")]
    SourceTooShort { expected: u64, actual: u64 },

    #[error("{} of {total} blocks failed", .failed.len())]
    BlocksFailed { failed: Vec<usize>, total: usize },

    #[error("commit failed: {0}")]
    Finalize(#[source] TransportError),

    #[error("commit timed out after {0:?}")]
    FinalizeTimeout(Duration),

    #[error("upload cancelled")]
    Cancelled,

    #[error("worker pool is closed")]
    PoolClosed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("progress serialization: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure loading or validating [`UploadConfig`](crate::UploadConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
