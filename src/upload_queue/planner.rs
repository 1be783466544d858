//! Splits a file into fixed-size chunk descriptors.

use super::types::ChunkDescriptor;
use crate::error::{DumpHubError, Result};

/// Number of chunks needed for `total_size` bytes
pub fn chunk_count(total_size: u64, chunk_size: u64) -> Result<usize> {
    if chunk_size == 0 {
        return Err(DumpHubError::Planning(
            "chunk size must be positive".to_string(),
        ));
    }

    usize::try_from(total_size.div_ceil(chunk_size)).map_err(|_| {
        DumpHubError::Planning(format!(
            "{} bytes in {} byte chunks is too many chunks",
            total_size, chunk_size
        ))
    })
}

/// Plan the chunks of a file.
///
/// Descriptors are contiguous and in increasing offset order; every one
/// but the last has length `chunk_size`. An empty file yields no
/// descriptors, see `UploadQueue::enqueue` for how those are sent.
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkDescriptor>> {
    let count = chunk_count(total_size, chunk_size)?;

    Ok((0..count as u64)
        .map(|index| {
            let offset = index * chunk_size;
            ChunkDescriptor {
                offset,
                length: chunk_size.min(total_size - offset),
            }
        })
        .collect())
}
