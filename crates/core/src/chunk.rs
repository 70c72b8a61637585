//! Forward-only, lazily materialized chunk sources for large payloads.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default chunk size: 3 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 3 * 1024 * 1024;

/// One contiguous byte range of a payload, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the sequence.
    pub index: u64,
    /// Raw (decoded) length in bytes.
    pub len: usize,
    /// Base64 encoding of the range.
    pub data: String,
}

/// Number of chunks needed to cover `total_len` bytes.
pub fn chunk_count(total_len: u64, chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_len.div_ceil(chunk_size as u64)
}

/// A lazy, finite, non-restartable sequence of chunks.
///
/// Each chunk is read only when requested and owned by the caller afterwards.
#[async_trait]
pub trait ChunkSource: Send {
    /// Total payload length in bytes.
    fn total_len(&self) -> u64;

    /// Number of chunks the source will yield.
    fn chunk_count(&self) -> u64;

    /// Next chunk, or `None` once exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Chunk>>;
}

/// Chunk source over any async reader of known length.
pub struct FileChunks<R> {
    reader: R,
    total_len: u64,
    chunk_size: usize,
    next_index: u64,
    consumed: u64,
}

impl<R: AsyncRead + Unpin + Send> FileChunks<R> {
    pub fn new(reader: R, total_len: u64, chunk_size: usize) -> Self {
        Self {
            reader,
            total_len,
            chunk_size,
            next_index: 0,
            consumed: 0,
        }
    }
}

impl FileChunks<tokio::fs::File> {
    /// Open `path` and chunk it with `chunk_size`.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let total_len = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        tracing::debug!(total_len, chunk_size, "Opened file for chunked reading");
        Ok(Self::new(file, total_len, chunk_size))
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for FileChunks<R> {
    fn total_len(&self) -> u64 {
        self.total_len
    }

    fn chunk_count(&self) -> u64 {
        chunk_count(self.total_len, self.chunk_size)
    }

    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.chunk_size == 0 || self.consumed >= self.total_len {
            return Ok(None);
        }

        let remaining = self.total_len - self.consumed;
        let len = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact(&mut buf)
            .await
            .with_context(|| format!("Failed to read chunk {} ({} bytes)", self.next_index, len))?;

        let chunk = Chunk {
            index: self.next_index,
            len,
            data: base64::engine::general_purpose::STANDARD.encode(&buf),
        };
        self.next_index += 1;
        self.consumed += len as u64;
        Ok(Some(chunk))
    }
}
