// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container detection by magic bytes.

use kompakt_core::ContainerKind;
use kompakt_core::error::{CompressionError, Result};
use tracing::debug;

/// Readers accept a PDF header anywhere in the first kilobyte.
const PDF_HEADER_WINDOW: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";

/// Probe `bytes` and return the container kind they claim to be.
pub fn detect_container(bytes: &[u8]) -> Result<ContainerKind> {
    if bytes.starts_with(ZIP_LOCAL_HEADER) {
        debug!("detected ZIP package");
        return Ok(ContainerKind::ArchivePackage);
    }

    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    if window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
    {
        debug!("detected PDF document");
        return Ok(ContainerKind::PageDocument);
    }

    Err(CompressionError::Decode(if bytes.is_empty() {
        "input is empty".into()
    } else {
        "unrecognised container format (expected PDF or EPUB)".into()
    }))
}
