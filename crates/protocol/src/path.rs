//! Request paths for the upload service.
//!
//! Paths are relative to the upload host; the transport prepends it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;

/// URL-safe base64 (with padding) used for path segments that may contain
/// `/` or other reserved characters.
pub fn encode_uri(s: &str) -> String {
    URL_SAFE.encode(s.as_bytes())
}

/// `mkblk`: creates a block of `block_size` bytes, carrying its first chunk.
pub fn block_create_path(block_size: u64) -> String {
    format!("/mkblk/{block_size}")
}

/// `bput`: appends a chunk to the block held under `ctx` at `offset`.
pub fn block_append_path(ctx: &str, offset: u64) -> String {
    format!("/bput/{ctx}/{offset}")
}

/// Optional fields of the commit call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitParams {
    pub mime_type: String,
    pub meta: String,
    pub customer: String,
    pub callback_params: String,
}

/// `rs-mkfile`: commits the block contexts into `entry` (`bucket:key`).
pub fn commit_path(entry: &str, size: u64, params: &CommitParams) -> String {
    let mut path = format!("/rs-mkfile/{}/fsize/{size}", encode_uri(entry));
    if !params.mime_type.is_empty() {
        path.push_str("/mimeType/");
        path.push_str(&encode_uri(&params.mime_type));
    }
    if !params.meta.is_empty() {
        path.push_str("/meta/");
        path.push_str(&encode_uri(&params.meta));
    }
    if !params.customer.is_empty() {
        path.push_str("/customer/");
        path.push_str(&params.customer);
    }
    if !params.callback_params.is_empty() {
        path.push_str("/params/");
        path.push_str(&encode_uri(&params.callback_params));
    }
    path
}
