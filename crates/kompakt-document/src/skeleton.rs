// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skeletons — the ordered structural shell of a container minus asset payloads.

use std::collections::BTreeMap;

use kompakt_core::ContainerKind;
use lopdf::{Document, ObjectId};

use crate::asset::AssetId;

/// Format-specific shell retained between decomposition and reassembly.
#[derive(Debug)]
pub enum Skeleton {
    Pages(PageSkeleton),
    Archive(ArchiveSkeleton),
}

impl Skeleton {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Pages(_) => ContainerKind::PageDocument,
            Self::Archive(_) => ContainerKind::ArchivePackage,
        }
    }

    /// Number of pages or entries, in container order.
    pub fn len(&self) -> usize {
        match self {
            Self::Pages(pages) => pages.pages.len(),
            Self::Archive(archive) => archive.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Page documents -----------------------------------------------------------

/// A named reference from a page into the object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    /// Resource category (`XObject`, `Font`, ...) or `Contents` for content streams.
    pub category: String,
    pub name: String,
    pub object_id: ObjectId,
    pub asset: AssetId,
}

/// One page in document order.
#[derive(Debug, Clone)]
pub struct PageSlot {
    pub object_id: ObjectId,
    pub resources: Vec<ResourceSlot>,
    pub contents: Vec<ResourceSlot>,
}

/// Shell of a page document.
///
/// `source` is the parsed object store; pages are rebuilt from it in `pages`
/// order with replaced payloads patched into the objects named by
/// `asset_objects`.
#[derive(Debug)]
pub struct PageSkeleton {
    pub(crate) source: Document,
    pub pages: Vec<PageSlot>,
    pub asset_objects: BTreeMap<AssetId, ObjectId>,
}

impl PageSkeleton {
    /// PDF header version of the source document.
    pub fn version(&self) -> &str {
        &self.source.version
    }
}

// -- Archive packages ---------------------------------------------------------

/// What an archive entry holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPayload {
    Directory,
    /// The designated first, uncompressed member, kept verbatim.
    Designated(Vec<u8>),
    Asset(AssetId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub payload: EntryPayload,
}

impl ArchiveEntry {
    pub fn is_designated(&self) -> bool {
        matches!(self.payload, EntryPayload::Designated(_))
    }
}

/// Shell of an archive package: entries in stored order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveSkeleton {
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveSkeleton {
    pub fn designated(&self) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.is_designated())
    }
}
