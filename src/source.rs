//! Byte source seam and its file/memory implementations.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// What a byte source can do. Demuxing needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub seekable: bool,
    pub readable: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            seekable: true,
            readable: true,
        }
    }
}

/// Seekable, readable input.
///
/// The demuxer has at most one read outstanding and always seeks before
/// reading, so implementations need no internal buffering.
#[async_trait]
pub trait ByteSource: Send {
    fn capabilities(&self) -> Capabilities;

    /// Move to absolute `position`, returning the new position.
    async fn seek(&mut self, position: u64) -> io::Result<u64>;

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of input.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// [`ByteSource`] over a file on disk.
#[derive(Debug)]
pub struct FileSource {
    file: File,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self { file })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn seek(&mut self, position: u64) -> io::Result<u64> {
        self.file.seek(SeekFrom::Start(position)).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf).await
    }
}

/// [`ByteSource`] over an in-memory buffer.
///
/// `max_chunk` caps how many bytes a single read returns, to exercise
/// short reads.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    position: usize,
    max_chunk: usize,
    capabilities: Capabilities,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            max_chunk: usize::MAX,
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn seek(&mut self, position: u64) -> io::Result<u64> {
        self.position = usize::try_from(position)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek position too large"))?;
        Ok(position)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.data.len().saturating_sub(self.position);
        let n = remaining.min(buf.len()).min(self.max_chunk);
        if n == 0 {
            return Ok(0);
        }
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}
