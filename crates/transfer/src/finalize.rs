//! Commit of the block contexts into the named object.

use std::time::Duration;

use blockput_protocol::{
    BlockProgress, CONTEXT_SEPARATOR, CommitParams, CommitReply, TEXT_PLAIN, commit_path,
};
use blockput_transport::{Transport, call};
use bytes::Bytes;
use tracing::info;

use crate::error::UploadError;

/// Block contexts in block order, separated by `,`.
pub fn commit_body(progress: &[BlockProgress]) -> String {
    let mut body = String::new();
    for (i, p) in progress.iter().enumerate() {
        if i > 0 {
            body.push(CONTEXT_SEPARATOR);
        }
        body.push_str(&p.context);
    }
    body
}

/// What to commit and under which name.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    pub entry: &'a str,
    pub size: u64,
    pub params: &'a CommitParams,
}

/// Issues the commit call. Not retried here; running the task again with
/// every block complete repeats only this step.
pub async fn commit(
    transport: &dyn Transport,
    request: CommitRequest<'_>,
    progress: &[BlockProgress],
    timeout: Option<Duration>,
) -> Result<CommitReply, UploadError> {
    let path = commit_path(request.entry, request.size, request.params);
    let body = Bytes::from(commit_body(progress));

    let exchange = call::<CommitReply>(transport, &path, TEXT_PLAIN, body);
    let reply = match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| UploadError::FinalizeTimeout(limit))?,
        None => exchange.await,
    }
    .map_err(UploadError::Finalize)?;

    info!(entry = request.entry, size = request.size, hash = %reply.hash, "object committed");
    Ok(reply)
}
