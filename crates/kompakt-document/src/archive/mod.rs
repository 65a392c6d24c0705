// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive module — ZIP package (EPUB) decomposition and reassembly using `zip`.

pub mod decompose;
pub mod reassemble;

pub use decompose::decompose;
pub use reassemble::reassemble;

/// The member that must be stored first and uncompressed (EPUB/ODF convention).
pub const DESIGNATED_ENTRY: &str = "mimetype";

/// Largest inflated size accepted for a single entry.
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;
