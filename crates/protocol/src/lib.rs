//! Wire protocol types for the resumable block upload service.
//!
//! Everything that crosses the network or gets persisted between runs
//! lives here: reply bodies, status codes, request paths and the
//! per-block [`BlockProgress`] record.

pub mod constants;
pub mod path;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{
    CONTEXT_SEPARATOR, DEFAULT_BLOCK_BITS, DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_TIMES, OCTET_STREAM,
    STATUS_INVALID_CONTEXT, TEXT_PLAIN,
};
pub use path::{CommitParams, block_append_path, block_create_path, commit_path, encode_uri};
pub use types::{BlockProgress, BlockState, ChunkReply, CommitReply, ErrorReply};
