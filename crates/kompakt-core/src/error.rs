// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Kompakt.
//
// Two tiers: `CompressionError` is job-level and reaches the caller as a failed
// `Result`; `AssetError` is asset-level and never leaves the transcoder.

use thiserror::Error;

/// Job-level error. Any of these ends the job in `Failed` with no output bytes.
#[derive(Debug, Error)]
pub enum CompressionError {
    // -- Input --
    #[error("input is not a valid container: {0}")]
    Decode(String),

    #[error("input of {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: u64, limit: u64 },

    // -- Output --
    #[error("failed to rebuild container: {0}")]
    Reassembly(String),

    // -- Control --
    #[error("job was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("compression worker failed: {0}")]
    Worker(String),

    // -- Ambient --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompressionError {
    /// Short text suitable for showing to the person who uploaded the file.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Decode(_) => "The file is damaged or is not a PDF or EPUB document.",
            Self::InputTooLarge { .. } => "The file is too large to compress.",
            Self::Reassembly(_) => "The compressed document could not be written.",
            Self::Cancelled => "Compression was cancelled.",
            Self::Config(_) | Self::Worker(_) | Self::Io(_) | Self::Serialization(_) => {
                "The compressor is misconfigured. Please try again later."
            }
        }
    }
}

/// Asset-level error, recovered locally by leaving the asset untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// No transcoder handles this asset's sub-type.
    #[error("unsupported asset: {0}")]
    Unsupported(String),

    /// Decoding or encoding this one asset failed.
    #[error("asset transcode failed: {0}")]
    Transcode(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CompressionError>;
