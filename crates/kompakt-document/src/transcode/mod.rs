// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Asset transcoding — apply a compression profile to one asset.
//
// Nothing here returns an error: every asset-level failure becomes a
// `Skipped` outcome and the original bytes stay in place.

pub mod image;
pub mod stream;
pub mod text;

pub use self::image::RasterTranscoder;

use kompakt_core::error::AssetError;
use kompakt_core::{AssetKind, CompressionProfile};
use tracing::{debug, warn};

use crate::asset::{Asset, AssetMeta, StreamEncoding};

/// Why an asset was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// `Other` assets are never modified.
    PassThrough,
    /// The profile does not minify text.
    MinifyDisabled,
    /// The re-encoded image was not strictly smaller than the original.
    SizeRegression { original: usize, encoded: usize },
    /// Unsupported sub-type or a decode/encode failure.
    Error(AssetError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassThrough => f.write_str("passed through unchanged"),
            Self::MinifyDisabled => f.write_str("text minification disabled"),
            Self::SizeRegression { original, encoded } => write!(
                f,
                "re-encode was {} bytes, not smaller than the original {}",
                encoded, original
            ),
            Self::Error(err) => write!(f, "{}", err),
        }
    }
}

/// Result of transcoding one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    Replaced { bytes: Vec<u8>, meta: AssetMeta },
    Skipped(SkipReason),
}

impl TranscodeOutcome {
    pub(crate) fn from_error(err: AssetError) -> Self {
        Self::Skipped(SkipReason::Error(err))
    }

    fn from_result(result: Result<Vec<u8>, AssetError>, meta: AssetMeta) -> Self {
        match result {
            Ok(bytes) => Self::Replaced { bytes, meta },
            Err(err) => Self::from_error(err),
        }
    }
}

/// Transcode `asset` under `profile`. Pure: the asset is not modified.
pub fn transcode(asset: &Asset, profile: &CompressionProfile) -> TranscodeOutcome {
    let outcome = match (asset.kind, &asset.meta) {
        (AssetKind::Image, AssetMeta::Image(meta)) => {
            image::transcode_image(&asset.bytes, meta, profile)
        }
        (AssetKind::Image, _) => TranscodeOutcome::from_error(AssetError::Unsupported(
            "image without metadata".into(),
        )),
        (AssetKind::Markup, _) if profile.text_minify => TranscodeOutcome::from_result(
            text::minify_markup(&asset.bytes),
            AssetMeta::None,
        ),
        (AssetKind::Style, _) if profile.text_minify => TranscodeOutcome::from_result(
            text::minify_style(&asset.bytes),
            AssetMeta::None,
        ),
        (AssetKind::Markup | AssetKind::Style, _) => {
            TranscodeOutcome::Skipped(SkipReason::MinifyDisabled)
        }
        (AssetKind::GenericStream, meta) => {
            let encoding = match meta {
                AssetMeta::Stream(encoding) => encoding.clone(),
                _ => StreamEncoding::Plain,
            };
            TranscodeOutcome::from_result(
                stream::recompress(&asset.bytes, &encoding, profile.stream_deflate_level),
                AssetMeta::Stream(StreamEncoding::Deflated),
            )
        }
        (AssetKind::Other, _) => TranscodeOutcome::Skipped(SkipReason::PassThrough),
    };

    match &outcome {
        TranscodeOutcome::Replaced { bytes, .. } => debug!(
            id = %asset.id,
            before = asset.bytes.len(),
            after = bytes.len(),
            "Asset transcoded"
        ),
        TranscodeOutcome::Skipped(SkipReason::Error(err)) => {
            warn!(id = %asset.id, origin = %asset.origin, %err, "Asset left unchanged")
        }
        TranscodeOutcome::Skipped(reason) => {
            debug!(id = %asset.id, %reason, "Asset skipped")
        }
    }
    outcome
}
