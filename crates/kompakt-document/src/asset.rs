// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assets — units of recompressible content extracted from a container.
//
// The kind tag and payload encoding are decided once during decomposition;
// transcoders dispatch on them and never re-inspect container objects.

use kompakt_core::{AssetKind, ColorMode};

/// Stable identity of an asset within one job. Used as the join key between the
/// transcoded asset and its slot in the skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u32);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Where in the container an asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    /// A named resource (or content stream) first seen on `page_index` (0-based).
    Page { page_index: usize, name: String },
    /// A package entry.
    Entry { path: String },
}

impl std::fmt::Display for AssetOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page { page_index, name } => write!(f, "page {} {}", page_index + 1, name),
            Self::Entry { path } => f.write_str(path),
        }
    }
}

/// How an image payload is encoded inside its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    Jpeg,
    Png,
    Gif,
    WebP,
    Bmp,
    /// Uncompressed or Flate-compressed 8-bit samples (PDF image XObject).
    RawSamples { components: u8, deflated: bool },
    /// Recognised as an image but not decodable by any transcoder.
    Unsupported(String),
}

/// Image-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    /// Byte length of the payload as extracted, before any transcode.
    pub original_len: usize,
    pub encoding: ImageEncoding,
    pub color: ColorMode,
}

/// How a generic stream payload is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEncoding {
    Plain,
    Deflated,
    /// Filter chain or parameters the stream transcoder cannot undo.
    Unsupported(String),
}

/// Kind-specific metadata attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetMeta {
    None,
    Image(ImageMeta),
    Stream(StreamEncoding),
}

/// One recompressible unit.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub origin: AssetOrigin,
    pub bytes: Vec<u8>,
    pub meta: AssetMeta,
    replaced: bool,
}

impl Asset {
    pub fn new(
        id: AssetId,
        kind: AssetKind,
        origin: AssetOrigin,
        bytes: Vec<u8>,
        meta: AssetMeta,
    ) -> Self {
        Self {
            id,
            kind,
            origin,
            bytes,
            meta,
            replaced: false,
        }
    }

    /// Whether a transcode replaced the original payload.
    pub fn is_replaced(&self) -> bool {
        self.replaced
    }

    pub fn image_meta(&self) -> Option<&ImageMeta> {
        match &self.meta {
            AssetMeta::Image(meta) => Some(meta),
            _ => None,
        }
    }

    /// Install transcoded bytes and their metadata in place of the original.
    pub fn replace(&mut self, bytes: Vec<u8>, meta: AssetMeta) {
        self.bytes = bytes;
        self.meta = meta;
        self.replaced = true;
    }
}

/// Allocates sequential asset ids; ids are never reused within a job.
#[derive(Debug, Default)]
pub(crate) struct AssetIdAllocator {
    next: u32,
}

impl AssetIdAllocator {
    pub(crate) fn allocate(&mut self) -> AssetId {
        let id = AssetId(self.next);
        self.next += 1;
        id
    }
}
