//! Upload of one object: block scheduling, aggregation and commit.

use std::sync::Arc;

use blockput_protocol::{BlockProgress, CommitParams, CommitReply, OCTET_STREAM};
use blockput_transport::Transport;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::block::{BlockSpec, BlockUploader};
use crate::chunk::ChunkTransfer;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::finalize::{self, CommitRequest};
use crate::pool::WorkerPool;
use crate::progress::{Notifier, ProgressCallback};
use crate::source::ByteSource;

/// One object to upload, with its per-block progress.
///
/// The progress array is the single record of what the service has
/// accepted. Save it after a failed [`run`](Self::run) and pass it back
/// through [`UploadTaskBuilder::progress`] to resume.
pub struct UploadTask {
    transport: Arc<dyn Transport>,
    source: Arc<dyn ByteSource>,
    entry: String,
    size: u64,
    commit: CommitParams,
    config: UploadConfig,
    notifier: Notifier,
    progress: Vec<BlockProgress>,
}

impl std::fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTask")
            .field("entry", &self.entry)
            .field("size", &self.size)
            .field("blocks", &self.progress.len())
            .field("config", &self.config)
            .finish()
    }
}

impl UploadTask {
    /// Starts describing an upload of `source` to `entry` (`bucket:key`).
    pub fn builder(
        transport: Arc<dyn Transport>,
        source: Arc<dyn ByteSource>,
        entry: impl Into<String>,
    ) -> UploadTaskBuilder {
        UploadTaskBuilder {
            transport,
            source,
            entry: entry.into(),
            size: None,
            commit: CommitParams {
                mime_type: OCTET_STREAM.to_string(),
                ..Default::default()
            },
            config: UploadConfig::default(),
            progress: Vec::new(),
            on_chunk: None,
            on_block: None,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn block_count(&self) -> usize {
        self.progress.len()
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Current progress, one record per block.
    pub fn progress(&self) -> &[BlockProgress] {
        &self.progress
    }

    pub fn into_progress(self) -> Vec<BlockProgress> {
        self.progress
    }

    /// Bytes the service has accepted across all blocks.
    pub fn accepted_bytes(&self) -> u64 {
        self.progress.iter().map(|p| p.offset).sum()
    }

    /// Returns `true` once every block is accepted.
    pub fn is_complete(&self) -> bool {
        self.pending().next().is_none()
    }

    fn spec(&self, index: usize) -> BlockSpec {
        BlockSpec::of(&self.config, index, self.size)
    }

    fn pending(&self) -> impl Iterator<Item = BlockSpec> + '_ {
        (0..self.progress.len())
            .map(|i| self.spec(i))
            .filter(|spec| !self.progress[spec.index].is_complete(spec.size))
    }

    /// Uploads on a pool built for this run only.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<CommitReply, UploadError> {
        let blocks = self.block_count();
        let pool = WorkerPool::new(
            self.config.workers_for(blocks),
            self.config.queue_for(blocks),
        );
        let result = self.run_on(&pool, cancel).await;
        pool.shutdown().await;
        result
    }

    /// Uploads every incomplete block on `pool`, then commits.
    ///
    /// Waits for every dispatched block before deciding; one failing block
    /// never stops its siblings. Blocks already complete are not sent again,
    /// so a run after a failed commit only repeats the commit.
    pub async fn run_on(
        &mut self,
        pool: &WorkerPool,
        cancel: &CancellationToken,
    ) -> Result<CommitReply, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let total = self.block_count();
        let pending: Vec<BlockSpec> = self.pending().collect();
        info!(
            entry = %self.entry,
            size = self.size,
            blocks = total,
            pending = pending.len(),
            workers = pool.size(),
            "upload started"
        );

        if !pending.is_empty() {
            self.dispatch(pool, pending, cancel).await?;
        }

        let failed: Vec<usize> = self
            .progress
            .iter()
            .enumerate()
            .filter(|(i, p)| !p.is_complete(self.spec(*i).size))
            .map(|(i, _)| i)
            .collect();

        if !failed.is_empty() {
            if cancel.is_cancelled() {
                warn!(entry = %self.entry, incomplete = failed.len(), "upload cancelled");
                return Err(UploadError::Cancelled);
            }
            warn!(entry = %self.entry, ?failed, "upload failed");
            return Err(UploadError::BlocksFailed { failed, total });
        }

        finalize::commit(
            self.transport.as_ref(),
            CommitRequest {
                entry: &self.entry,
                size: self.size,
                params: &self.commit,
            },
            &self.progress,
            self.config.call_timeout(),
        )
        .await
    }

    /// Runs one job per block in `pending` and writes the outcomes back.
    async fn dispatch(
        &mut self,
        pool: &WorkerPool,
        pending: Vec<BlockSpec>,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let chunks = ChunkTransfer::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.source),
            self.config.call_timeout(),
        );
        let uploader = BlockUploader::new(chunks, &self.config, self.notifier.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, BlockProgress)>();

        let mut dispatched = Vec::with_capacity(pending.len());
        let mut submit_error = None;
        for spec in pending {
            if cancel.is_cancelled() {
                break;
            }
            // Each job owns a copy of its slot and hands it back.
            let mut progress = self.progress[spec.index].clone();
            let uploader = uploader.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let job = async move {
                // Failures are recorded in the progress record.
                let _ = uploader.upload(spec, &mut progress, &cancel).await;
                let _ = tx.send((spec.index, progress));
            };
            if let Err(e) = pool.submit(job).await {
                submit_error = Some(e);
                break;
            }
            dispatched.push(spec.index);
        }
        drop(tx);

        let mut returned = vec![false; self.progress.len()];
        while let Some((index, progress)) = rx.recv().await {
            self.progress[index] = progress;
            returned[index] = true;
        }
        for index in dispatched {
            if !returned[index] {
                warn!(block = index, "block job ended without reporting");
                self.progress[index].error = Some("block job panicked".into());
            }
        }

        match submit_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Builder for [`UploadTask`].
pub struct UploadTaskBuilder {
    transport: Arc<dyn Transport>,
    source: Arc<dyn ByteSource>,
    entry: String,
    size: Option<u64>,
    commit: CommitParams,
    config: UploadConfig,
    progress: Vec<BlockProgress>,
    on_chunk: Option<ProgressCallback>,
    on_block: Option<ProgressCallback>,
}

impl UploadTaskBuilder {
    /// Object size; defaults to the length of the source.
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// MIME type of the object (`application/octet-stream` by default).
    pub fn content_type(mut self, mime_type: impl Into<String>) -> Self {
        self.commit.mime_type = mime_type.into();
        self
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.commit.meta = meta.into();
        self
    }

    pub fn customer(mut self, customer: impl Into<String>) -> Self {
        self.commit.customer = customer.into();
        self
    }

    pub fn callback_params(mut self, params: impl Into<String>) -> Self {
        self.commit.callback_params = params.into();
        self
    }

    /// Progress saved by an earlier run. Empty means a fresh upload.
    pub fn progress(mut self, progress: Vec<BlockProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    /// Called after every accepted chunk and every context reset.
    pub fn on_chunk<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &BlockProgress) + Send + Sync + 'static,
    {
        self.on_chunk = Some(Arc::new(f));
        self
    }

    /// Called once per block per run with its final progress.
    pub fn on_block<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, &BlockProgress) + Send + Sync + 'static,
    {
        self.on_block = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Result<UploadTask, UploadError> {
        self.config.validate()?;

        let available = self.source.len();
        let size = self.size.unwrap_or(available);
        if available < size {
            return Err(UploadError::SourceTooShort {
                expected: size,
                actual: available,
            });
        }

        let blocks = self.config.block_count(size);
        let progress = if self.progress.is_empty() {
            vec![BlockProgress::default(); blocks]
        } else if self.progress.len() == blocks {
            self.progress
        } else {
            return Err(UploadError::ProgressLength {
                expected: blocks,
                actual: self.progress.len(),
            });
        };

        Ok(UploadTask {
            transport: self.transport,
            source: self.source,
            entry: self.entry,
            size,
            commit: self.commit,
            config: self.config,
            notifier: Notifier::new(self.on_chunk, self.on_block),
            progress,
        })
    }
}
