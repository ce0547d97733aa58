//! Block-parallel resumable upload engine.
//!
//! An object is split into `1 << block_bits` byte blocks. Each block is
//! sent in chunks (`mkblk` then `bput`), and the service answers every
//! chunk with a context token recorded in the block's [`BlockProgress`].
//! Once every block is complete the contexts are committed in block order
//! (`rs-mkfile`).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use blockput_transfer::{FileSource, UploadConfig, UploadTask};
//! use blockput_transport::{HttpTransport, ServiceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(&ServiceConfig {
//!     token: "upload-token".into(),
//!     ..Default::default()
//! })?;
//! let mut task = UploadTask::builder(
//!     Arc::new(transport),
//!     Arc::new(FileSource::open("video.mp4")?),
//!     "bucket:video.mp4",
//! )
//! .config(UploadConfig { workers: 4, ..Default::default() })
//! .build()?;
//!
//! let reply = task.run(&CancellationToken::new()).await?;
//! println!("committed {}", reply.hash);
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod chunk;
pub mod config;
pub mod error;
pub mod finalize;
pub mod pool;
pub mod progress;
pub mod resume;
pub mod source;
pub mod task;

#[cfg(test)]
mod mock;

pub use blockput_protocol::{BlockProgress, BlockState, CommitReply};
pub use block::{BlockSpec, BlockUploader};
pub use chunk::{ChunkRange, ChunkTransfer};
pub use config::UploadConfig;
pub use error::{BlockError, ChunkError, ConfigError, UploadError};
pub use finalize::{CommitRequest, commit, commit_body};
pub use pool::WorkerPool;
pub use progress::{Notifier, ProgressCallback};
pub use resume::{load_progress, save_progress};
pub use source::{ByteSource, FileSource, MemorySource};
pub use task::{UploadTask, UploadTaskBuilder};
