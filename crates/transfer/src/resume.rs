//! Persisting block progress between runs.

use std::io;
use std::path::{Path, PathBuf};

use blockput_protocol::BlockProgress;

use crate::error::UploadError;

/// Writes `progress` as JSON to `path`, replacing it atomically.
pub fn save_progress(path: &Path, progress: &[BlockProgress]) -> Result<(), UploadError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(progress)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads progress saved by [`save_progress`]; `None` if nothing was saved.
pub fn load_progress(path: &Path) -> Result<Option<Vec<BlockProgress>>, UploadError> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&data)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
