use serde::{Deserialize, Serialize};

/// Resumable state of one block.
///
/// This is the only state a caller has to persist to resume an upload:
/// one record per block, addressed by block index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProgress {
    /// Server context for the bytes accepted so far. Empty means nothing
    /// has been accepted for the current attempt.
    #[serde(rename = "ctx", default)]
    pub context: String,
    /// Bytes of this block accepted by the server.
    #[serde(default)]
    pub offset: u64,
    /// CRC-32 the server reported for the last accepted chunk.
    #[serde(default)]
    pub crc32: u32,
    /// Opaque block checksum from the last reply.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    /// Error recorded by the last run that failed this block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a block stands relative to its full size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// No context: the next call creates the block.
    Fresh,
    /// Context held but the block is not fully accepted. This includes a
    /// stored offset past the block size, which the uploader rejects.
    InProgress,
    /// Every byte of the block has been accepted.
    Complete,
}

impl BlockProgress {
    /// Returns the state of this record for a block of `block_size` bytes.
    pub fn state(&self, block_size: u64) -> BlockState {
        if self.context.is_empty() {
            BlockState::Fresh
        } else if self.offset == block_size {
            BlockState::Complete
        } else {
            BlockState::InProgress
        }
    }

    /// Returns `true` if every byte of a `block_size` block is accepted.
    pub fn is_complete(&self, block_size: u64) -> bool {
        self.state(block_size) == BlockState::Complete
    }

    /// Drops the server context and everything derived from it.
    pub fn reset(&mut self) {
        self.context.clear();
        self.offset = 0;
        self.crc32 = 0;
        self.checksum.clear();
    }

    /// Records an accepted chunk of `length` bytes.
    pub fn accept(&mut self, reply: &ChunkReply, length: u64) {
        self.context.clone_from(&reply.ctx);
        self.offset += length;
        self.crc32 = reply.crc32;
        self.checksum.clone_from(&reply.checksum);
    }
}

/// Reply body of `mkblk` and `bput`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReply {
    pub ctx: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub crc32: u32,
    #[serde(default)]
    pub offset: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
}

/// Reply body of the commit call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReply {
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
}

/// Error body the service sends with non-2xx statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(default)]
    pub error: String,
}
