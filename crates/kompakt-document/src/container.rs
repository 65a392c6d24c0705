// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container dispatch — route decomposition and reassembly to the PDF or
// package implementation.

use kompakt_core::error::{CompressionError, Result};
use kompakt_core::{CompressionProfile, ContainerKind};

use crate::asset::Asset;
use crate::skeleton::Skeleton;
use crate::{archive, pdf};

/// A container split into its structural skeleton and its assets.
#[derive(Debug)]
pub struct Decomposition {
    pub skeleton: Skeleton,
    pub assets: Vec<Asset>,
}

/// Decompose `bytes`, already identified as `kind`.
pub fn decompose(bytes: &[u8], kind: ContainerKind) -> Result<Decomposition> {
    match kind {
        ContainerKind::PageDocument => pdf::decompose(bytes),
        ContainerKind::ArchivePackage => archive::decompose(bytes),
    }
}

/// Rebuild a container of the skeleton's kind from the skeleton and assets.
pub fn reassemble(
    skeleton: Skeleton,
    assets: &[Asset],
    profile: &CompressionProfile,
) -> Result<Vec<u8>> {
    let bytes = match skeleton {
        Skeleton::Pages(pages) => pdf::reassemble(pages, assets, profile)?,
        Skeleton::Archive(package) => archive::reassemble(package, assets, profile)?,
    };
    if bytes.is_empty() {
        return Err(CompressionError::Reassembly("writer produced no output".into()));
    }
    Ok(bytes)
}
