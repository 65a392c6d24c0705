// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Generic stream recompression with zlib/deflate.

use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use kompakt_core::error::AssetError;

use crate::asset::StreamEncoding;

// Inflated size is capped at MAX_INFLATE_RATIO times the deflated size,
// clamped to MIN_INFLATE_LIMIT..=MAX_INFLATE_LIMIT.
const MAX_INFLATE_RATIO: u64 = 100;
const MIN_INFLATE_LIMIT: u64 = 4 * 1024 * 1024;
const MAX_INFLATE_LIMIT: u64 = 256 * 1024 * 1024;

/// Decode `data` per `encoding` and deflate it again at `level` (0-9).
pub fn recompress(data: &[u8], encoding: &StreamEncoding, level: u32) -> Result<Vec<u8>, AssetError> {
    let plain: Cow<'_, [u8]> = match encoding {
        StreamEncoding::Plain => Cow::Borrowed(data),
        StreamEncoding::Deflated => Cow::Owned(inflate(data)?),
        StreamEncoding::Unsupported(reason) => {
            return Err(AssetError::Unsupported(reason.clone()));
        }
    };

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(plain.len() / 2), Compression::new(level));
    encoder
        .write_all(&plain)
        .and_then(|()| encoder.finish())
        .map_err(|err| AssetError::Transcode(format!("deflate failed: {}", err)))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, AssetError> {
    let limit = (data.len() as u64)
        .saturating_mul(MAX_INFLATE_RATIO)
        .clamp(MIN_INFLATE_LIMIT, MAX_INFLATE_LIMIT);
    inflate_bounded(data, limit)
}

/// Inflate at most `limit` bytes; longer output is an error.
fn inflate_bounded(data: &[u8], limit: u64) -> Result<Vec<u8>, AssetError> {
    let mut plain = Vec::new();
    ZlibDecoder::new(data)
        .take(limit + 1)
        .read_to_end(&mut plain)
        .map_err(|err| AssetError::Transcode(format!("inflate failed: {}", err)))?;
    if plain.len() as u64 > limit {
        return Err(AssetError::Transcode(format!(
            "stream inflates past {} bytes",
            limit
        )));
    }
    Ok(plain)
}
