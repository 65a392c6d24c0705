// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression report — sizes, per-asset outcomes, and content fingerprints
// for one finished job.

use chrono::{DateTime, Utc};
use kompakt_core::{CompressionLevel, ContainerKind, JobId};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::asset::AssetId;
use crate::transcode::SkipReason;

/// One asset left untouched, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSkip {
    pub asset: AssetId,
    /// Human-readable origin, e.g. `OEBPS/cover.gif` or `page 3 XObject/Im1`.
    pub label: String,
    pub reason: SkipReason,
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct CompressionReport {
    pub job_id: JobId,
    pub level: CompressionLevel,
    pub container: ContainerKind,
    pub original_size: usize,
    pub compressed_size: usize,
    pub assets_total: usize,
    pub assets_replaced: usize,
    pub skipped: Vec<AssetSkip>,
    /// SHA-256 of the input, lowercase hex.
    pub input_sha256: String,
    /// SHA-256 of the output, lowercase hex.
    pub output_sha256: String,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl CompressionReport {
    /// Percentage of the original size saved: `(original - compressed) / original * 100`.
    ///
    /// Negative when the output grew; zero for an empty original.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        let original = self.original_size as f64;
        (original - self.compressed_size as f64) / original * 100.0
    }

    /// Flat, serialisable summary of this report.
    pub fn stats(&self) -> CompressionStats {
        CompressionStats {
            job_id: self.job_id,
            level: self.level,
            container: self.container,
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            ratio: (self.ratio() * 100.0).round() / 100.0,
            assets_total: self.assets_total,
            assets_replaced: self.assets_replaced,
            assets_skipped: self.skipped.len(),
            input_sha256: self.input_sha256.clone(),
            output_sha256: self.output_sha256.clone(),
            finished_at: self.finished_at,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Size statistics as handed to a front end; the ratio is rounded to two
/// decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionStats {
    pub job_id: JobId,
    pub level: CompressionLevel,
    pub container: ContainerKind,
    pub original_size: usize,
    pub compressed_size: usize,
    pub ratio: f64,
    pub assets_total: usize,
    pub assets_replaced: usize,
    pub assets_skipped: usize,
    pub input_sha256: String,
    pub output_sha256: String,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
