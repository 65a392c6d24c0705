// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Kompakt compression pipeline.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Unique identifier for a compression job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse quality level chosen by the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parse a level tag, case-insensitively. `None` for unknown tags.
    pub fn try_from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Parse a level tag. Unknown tags fall back to `Medium`.
    pub fn from_tag(tag: &str) -> Self {
        Self::try_from_tag(tag).unwrap_or_else(|| {
            warn!(tag, "unknown compression level, using medium");
            Self::Medium
        })
    }

    /// The lowercase tag used on the wire.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Colour handling for re-encoded rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Color,
    Grayscale,
}

/// Resolved parameters governing one compression level.
///
/// Immutable once resolved; a job resolves its profile exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionProfile {
    /// Lossy encoder quality in (0, 1].
    pub image_quality: f32,
    /// Longest permitted raster edge in pixels. Images are never enlarged.
    pub max_dimension: u32,
    pub color_mode: ColorMode,
    /// Deflate level in [0, 9] for page streams and archive entries.
    pub stream_deflate_level: u32,
    /// Clear document-level metadata on reassembly.
    pub strip_metadata: bool,
    /// Minify markup and stylesheet assets.
    pub text_minify: bool,
}

impl CompressionProfile {
    /// JPEG quality on the encoder's 1-100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        (self.image_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Describe the first out-of-range field, if any.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.image_quality > 0.0 && self.image_quality <= 1.0) {
            return Err(format!(
                "image_quality must be in (0, 1], got {}",
                self.image_quality
            ));
        }
        if self.max_dimension == 0 {
            return Err("max_dimension must be positive".into());
        }
        if self.stream_deflate_level > 9 {
            return Err(format!(
                "stream_deflate_level must be in [0, 9], got {}",
                self.stream_deflate_level
            ));
        }
        Ok(())
    }
}

/// Container formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    /// Page-based document (PDF).
    PageDocument,
    /// ZIP-style package (EPUB).
    ArchivePackage,
}

impl ContainerKind {
    /// MIME type of the container.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::PageDocument => "application/pdf",
            Self::ArchivePackage => "application/epub+zip",
        }
    }
}

/// Kind tag assigned to every asset once, during decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Image,
    Markup,
    Style,
    GenericStream,
    Other,
}

/// Lifecycle states of a compression job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Decomposing,
    /// `done` of `total` assets visited.
    Transcoding { done: usize, total: usize },
    Reassembling,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One progress notification emitted by a running job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100, never lower than a previous event of the same job.
    pub percent: u8,
    pub message: String,
}
