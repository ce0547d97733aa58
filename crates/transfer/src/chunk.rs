//! One `mkblk` or `bput` exchange.

use std::sync::Arc;
use std::time::Duration;

use blockput_protocol::{ChunkReply, OCTET_STREAM, block_append_path, block_create_path};
use blockput_transport::{Transport, call};
use tracing::trace;

use crate::error::ChunkError;
use crate::source::{self, ByteSource};

/// A contiguous range of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Full size of the owning block (sent with `mkblk`).
    pub block_size: u64,
    /// Absolute offset of the block in the source.
    pub block_base: u64,
    /// Offset of the chunk within the block.
    pub offset: u64,
    pub length: usize,
}

/// Sends chunks of a source over a transport.
#[derive(Clone)]
pub struct ChunkTransfer {
    transport: Arc<dyn Transport>,
    source: Arc<dyn ByteSource>,
    timeout: Option<Duration>,
}

impl ChunkTransfer {
    pub fn new(
        transport: Arc<dyn Transport>,
        source: Arc<dyn ByteSource>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            source,
            timeout,
        }
    }

    /// Uploads `range`, creating the block when `context` is empty and
    /// appending to it otherwise.
    ///
    /// The returned reply has passed the CRC-32 check and carries a
    /// non-empty context.
    pub async fn send(&self, range: ChunkRange, context: &str) -> Result<ChunkReply, ChunkError> {
        let data =
            source::read_range(&self.source, range.block_base + range.offset, range.length).await?;
        let expected = crc32fast::hash(&data);

        let path = if context.is_empty() {
            block_create_path(range.block_size)
        } else {
            block_append_path(context, range.offset)
        };

        let exchange = call::<ChunkReply>(self.transport.as_ref(), &path, OCTET_STREAM, data);
        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| ChunkError::Timeout(limit))??,
            None => exchange.await?,
        };
        trace!(%path, length = range.length, crc32 = reply.crc32, "chunk reply");

        if reply.crc32 != expected {
            return Err(ChunkError::ChecksumMismatch {
                expected,
                actual: reply.crc32,
            });
        }
        if reply.ctx.is_empty() {
            return Err(ChunkError::EmptyContext);
        }
        Ok(reply)
    }
}
