use std::sync::Arc;

use blockput_protocol::BlockProgress;

/// Observer invoked with a block index and a snapshot of its progress.
///
/// Callbacks run on worker tasks and may be called concurrently for
/// different blocks; they must not block.
pub type ProgressCallback = Arc<dyn Fn(usize, &BlockProgress) + Send + Sync>;

/// Per-task notification hooks, shared by every block job.
#[derive(Clone, Default)]
pub struct Notifier {
    on_chunk: Option<ProgressCallback>,
    on_block: Option<ProgressCallback>,
}

impl Notifier {
    pub fn new(on_chunk: Option<ProgressCallback>, on_block: Option<ProgressCallback>) -> Self {
        Self { on_chunk, on_block }
    }

    /// After every accepted chunk and after every context reset.
    pub fn chunk(&self, block: usize, progress: &BlockProgress) {
        if let Some(cb) = &self.on_chunk {
            cb(block, progress);
        }
    }

    /// Once per block per run, success or failure.
    pub fn block(&self, block: usize, progress: &BlockProgress) {
        if let Some(cb) = &self.on_block {
            cb(block, progress);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("on_chunk", &self.on_chunk.is_some())
            .field("on_block", &self.on_block.is_some())
            .finish()
    }
}
