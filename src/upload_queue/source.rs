//! Byte sources for queued files.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Where a queued file's bytes come from
#[derive(Debug, Clone)]
pub enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl FileSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        FileSource::Disk(path.into())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        FileSource::Memory(Arc::from(bytes.into()))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            FileSource::Disk(path) => Some(path),
            FileSource::Memory(_) => None,
        }
    }

    pub async fn len(&self) -> std::io::Result<u64> {
        match self {
            FileSource::Disk(path) => Ok(tokio::fs::metadata(path).await?.len()),
            FileSource::Memory(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Read exactly `length` bytes starting at `offset`
    pub async fn read_range(&self, offset: u64, length: u64) -> std::io::Result<Vec<u8>> {
        let length = usize::try_from(length).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "range too large")
        })?;

        match self {
            FileSource::Disk(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(offset)).await?;
                let mut buffer = vec![0u8; length];
                file.read_exact(&mut buffer).await?;
                Ok(buffer)
            }
            FileSource::Memory(bytes) => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX);
                bytes
                    .get(start..start.saturating_add(length))
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| {
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "range past end of buffer",
                        )
                    })
            }
        }
    }

    /// Up to `limit` bytes from the start of the file
    pub async fn read_head(&self, limit: u64) -> std::io::Result<Vec<u8>> {
        match self {
            FileSource::Disk(path) => {
                let file = tokio::fs::File::open(path).await?;
                let mut buffer = Vec::new();
                file.take(limit).read_to_end(&mut buffer).await?;
                Ok(buffer)
            }
            FileSource::Memory(bytes) => {
                let end = bytes.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
                Ok(bytes[..end].to_vec())
            }
        }
    }
}
