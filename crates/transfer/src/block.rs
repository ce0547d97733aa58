//! Chunk retry state machine for a single block.
//!
//! A block moves `Fresh -> InProgress -> Complete`. Each chunk range gets
//! `1 + retry_times` attempts; an invalid-context answer while a context
//! is held drops the block back to `Fresh` without spending one.

use blockput_protocol::BlockProgress;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::chunk::{ChunkRange, ChunkTransfer};
use crate::config::UploadConfig;
use crate::error::BlockError;
use crate::progress::Notifier;

/// Position and size of one block in the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub index: usize,
    /// Absolute offset of the block's first byte.
    pub base: u64,
    pub size: u64,
}

impl BlockSpec {
    /// Block `index` of an object of `size` bytes.
    pub fn of(config: &UploadConfig, index: usize, size: u64) -> Self {
        Self {
            index,
            base: (index as u64) << config.block_bits,
            size: config.block_len(index, size),
        }
    }
}

/// Uploads blocks chunk by chunk.
#[derive(Clone)]
pub struct BlockUploader {
    chunks: ChunkTransfer,
    chunk_size: u64,
    retry_times: u32,
    max_restarts: Option<u32>,
    notifier: Notifier,
}

impl BlockUploader {
    pub fn new(chunks: ChunkTransfer, config: &UploadConfig, notifier: Notifier) -> Self {
        Self {
            chunks,
            chunk_size: config.chunk_size as u64,
            retry_times: config.retry_times,
            max_restarts: config.max_block_restarts,
            notifier,
        }
    }

    /// Drives `progress` until the block is complete or fails.
    ///
    /// `on_block` fires exactly once with the final state, and the
    /// outcome is recorded in `progress.error`.
    pub async fn upload(
        &self,
        spec: BlockSpec,
        progress: &mut BlockProgress,
        cancel: &CancellationToken,
    ) -> Result<(), BlockError> {
        let result = self.drive(spec, progress, cancel).await;
        match &result {
            Ok(()) => {
                debug!(block = spec.index, size = spec.size, "block complete");
            }
            Err(e) => {
                error!(block = spec.index, offset = progress.offset, error = %e, "block failed");
                progress.error = Some(e.to_string());
            }
        }
        self.notifier.block(spec.index, progress);
        result
    }

    async fn drive(
        &self,
        spec: BlockSpec,
        progress: &mut BlockProgress,
        cancel: &CancellationToken,
    ) -> Result<(), BlockError> {
        let block = spec.index;
        progress.error = None;
        if progress.offset > spec.size {
            return Err(BlockError::InvalidProgress {
                block,
                offset: progress.offset,
                block_size: spec.size,
            });
        }
        if progress.context.is_empty() {
            progress.reset();
        }

        let mut failures = 0u32;
        let mut restarts = 0u32;

        while progress.offset < spec.size {
            if cancel.is_cancelled() {
                return Err(BlockError::Cancelled { block });
            }

            let length = self.chunk_size.min(spec.size - progress.offset);
            let range = ChunkRange {
                block_size: spec.size,
                block_base: spec.base,
                offset: progress.offset,
                length: length as usize,
            };

            match self.chunks.send(range, &progress.context).await {
                Ok(reply) => {
                    progress.accept(&reply, length);
                    failures = 0;
                    debug!(block, offset = progress.offset, crc32 = reply.crc32, "chunk accepted");
                    self.notifier.chunk(block, progress);
                }
                Err(e) if e.is_invalid_context() && !progress.context.is_empty() => {
                    restarts += 1;
                    if let Some(max) = self.max_restarts
                        && restarts > max
                    {
                        return Err(BlockError::TooManyRestarts { block, restarts });
                    }
                    warn!(block, offset = progress.offset, restarts, "context invalidated, restarting block");
                    progress.reset();
                    failures = 0;
                    self.notifier.chunk(block, progress);
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.retry_times {
                        return Err(BlockError::RetriesExhausted {
                            block,
                            attempts: failures,
                            source: e,
                        });
                    }
                    warn!(block, offset = progress.offset, attempt = failures, error = %e, "chunk failed, retrying");
                }
            }
        }
        Ok(())
    }
}
