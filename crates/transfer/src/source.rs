//! Positional byte sources the engine reads block ranges from.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

/// Bytes addressable by absolute offset.
///
/// Workers read disjoint ranges concurrently, so implementations must not
/// keep a shared cursor.
pub trait ByteSource: Send + Sync + 'static {
    /// Total number of bytes available.
    fn len(&self) -> u64;

    /// Fills `buf` from `offset`, failing with `UnexpectedEof` if the
    /// source ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `len` bytes starting at `offset`.
    fn read_range(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf)?;
        Ok(Bytes::from(buf))
    }
}

fn eof(offset: u64, len: usize, available: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("range {offset}+{len} past end of source ({available} bytes)"),
    )
}

/// In-memory source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource(Bytes);

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let range = self.read_range(offset, buf.len())?;
        buf.copy_from_slice(&range);
        Ok(())
    }

    fn read_range(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let end = offset
            .checked_add(len as u64)
            .filter(|end| *end <= self.len())
            .ok_or_else(|| eof(offset, len, self.len()))?;
        Ok(self.0.slice(offset as usize..end as usize))
    }
}

/// File-backed source using positional reads.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Opens `path` read-only; the length is fixed at open time.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    pub fn from_file(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        if offset.saturating_add(buf.len() as u64) > self.len {
            return Err(eof(offset, buf.len(), self.len));
        }
        read_at(&self.file, offset, buf)
    }
}

#[cfg(unix)]
fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, mut offset: u64, mut buf: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn read_at(_file: &File, _offset: u64, _buf: &mut [u8]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "positional reads are not supported on this platform",
    ))
}

/// Reads a range off the async runtime's worker threads.
pub(crate) async fn read_range(
    source: &Arc<dyn ByteSource>,
    offset: u64,
    len: usize,
) -> io::Result<Bytes> {
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || source.read_range(offset, len))
        .await
        .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn memory_source_slices() {
        let src = MemorySource::new(&b"hello world"[..]);
        assert_eq!(src.len(), 11);
        assert_eq!(&src.read_range(6, 5).unwrap()[..], b"world");

        let mut buf = [0u8; 5];
        src.read_exact_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn memory_source_past_end_is_eof() {
        let src = MemorySource::new(vec![1u8; 4]);
        let err = src.read_range(2, 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(src.read_range(4, 0).unwrap().is_empty());
    }

    #[test]
    fn file_source_positional_reads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        tmp.write_all(&data).unwrap();
        tmp.flush().unwrap();

        let src = FileSource::open(tmp.path()).unwrap();
        assert_eq!(src.len(), 10_000);
        assert_eq!(&src.read_range(9_000, 1_000).unwrap()[..], &data[9_000..]);
        assert_eq!(&src.read_range(300, 10).unwrap()[..], &data[300..310]);

        let err = src.read_range(9_999, 2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn async_read_range() {
        let src: Arc<dyn ByteSource> = Arc::new(MemorySource::new(&b"abcdef"[..]));
        let got = read_range(&src, 2, 3).await.unwrap();
        assert_eq!(&got[..], b"cde");
    }
}
