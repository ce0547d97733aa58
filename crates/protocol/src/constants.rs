/// Status code the service answers with when it no longer knows a block
/// context (expired or evicted). The block must be restarted from offset 0.
pub const STATUS_INVALID_CONTEXT: u16 = 701;

/// Default block size exponent: `1 << 22` = 4 MiB blocks.
pub const DEFAULT_BLOCK_BITS: u32 = 22;

/// Default chunk size: 256 KiB per `mkblk`/`bput` call.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default number of extra attempts per chunk.
pub const DEFAULT_RETRY_TIMES: u32 = 3;

/// Joins block contexts in the commit body.
pub const CONTEXT_SEPARATOR: char = ',';

/// Content type of chunk bodies.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type of the commit body.
pub const TEXT_PLAIN: &str = "text/plain";
