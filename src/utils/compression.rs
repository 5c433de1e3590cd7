//! Dump compression.
//!
//! LZ4 and Zstd over whole persistence dumps. Decompression is bounded by
//! [`MAX_DUMP_SIZE`] so a corrupt or hostile file cannot exhaust memory.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::config::MAX_DUMP_SIZE;
use crate::error::{ExtError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    Lz4,
    Zstd,
}

impl CompressionKind {
    /// Flag byte written ahead of a compressed dump
    pub fn flag(self) -> u8 {
        match self {
            CompressionKind::Lz4 => 1,
            CompressionKind::Zstd => 2,
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            1 => Some(CompressionKind::Lz4),
            2 => Some(CompressionKind::Zstd),
            _ => None,
        }
    }
}

/// Bits per byte below which a sample is worth compressing
const MIN_ENTROPY_THRESHOLD: f64 = 4.0;

/// Shannon entropy of `data`, from 0.0 (constant) to 8.0 (random)
fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let len = data.len() as f64;
    freq.iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

fn worth_compressing(data: &[u8], threshold_bytes: usize) -> bool {
    if data.len() < threshold_bytes {
        return false;
    }
    if data.len() < 1024 {
        return true;
    }

    // first 512 bytes are a good enough sample
    let sample = &data[..data.len().min(512)];
    calculate_entropy(sample) < MIN_ENTROPY_THRESHOLD
}

/// # Errors
/// [`ExtError::CompressionFailure`] if the encoder fails.
pub fn compress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        CompressionKind::Zstd => {
            let mut out = Vec::new();
            zstd::stream::copy_encode(data, &mut out, 3)
                .map_err(|_| ExtError::CompressionFailure)?;
            Ok(out)
        }
    }
}

/// Decompress, refusing output larger than [`MAX_DUMP_SIZE`].
///
/// # Errors
/// [`ExtError::DecompressionFailure`] on corrupt input or oversized output.
pub fn decompress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Lz4 => {
            // lz4_flex prepends the output size as 4 little-endian bytes
            let header: [u8; 4] = data
                .get(..4)
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or(ExtError::DecompressionFailure)?;
            if u32::from_le_bytes(header) as usize > MAX_DUMP_SIZE {
                return Err(ExtError::DecompressionFailure);
            }

            lz4_flex::decompress_size_prepended(data).map_err(|_| ExtError::DecompressionFailure)
        }
        CompressionKind::Zstd => {
            let decoder =
                zstd::stream::Decoder::new(data).map_err(|_| ExtError::DecompressionFailure)?;

            let mut out = Vec::new();
            decoder
                .take(MAX_DUMP_SIZE as u64 + 1)
                .read_to_end(&mut out)
                .map_err(|_| ExtError::DecompressionFailure)?;
            if out.len() > MAX_DUMP_SIZE {
                return Err(ExtError::DecompressionFailure);
            }
            Ok(out)
        }
    }
}

/// Compress when the data is large and repetitive enough to gain from it.
///
/// Returns the output and whether compression was applied. Output that would
/// not shrink is returned uncompressed.
///
/// # Errors
/// [`ExtError::CompressionFailure`] if the encoder fails.
pub fn maybe_compress(
    data: &[u8],
    kind: CompressionKind,
    threshold_bytes: usize,
) -> Result<(Vec<u8>, bool)> {
    if !worth_compressing(data, threshold_bytes) {
        return Ok((data.to_vec(), false));
    }

    let compressed = compress(data, kind)?;
    if compressed.len() < data.len() {
        Ok((compressed, true))
    } else {
        Ok((data.to_vec(), false))
    }
}
