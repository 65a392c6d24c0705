// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// kompakt-document — Format-aware recompression of PDF and EPUB documents.
//
// A job detects the container, splits it into a skeleton and a list of assets
// (images, markup, stylesheets, content streams), transcodes each asset under
// the level's profile, and rebuilds a container of the same format. An asset
// that cannot be transcoded is kept byte-for-byte.

pub mod archive;
pub mod asset;
pub mod container;
pub mod detect;
pub mod job;
pub mod pdf;
pub mod report;
pub mod skeleton;
pub mod spawn;
pub mod transcode;

// Re-export the primary entry points so callers can use `kompakt_document::compress` etc.
pub use asset::{Asset, AssetId, AssetMeta, AssetOrigin};
pub use container::Decomposition;
pub use detect::detect_container;
pub use job::{CancellationToken, Compressor, Job, ProgressTracker, compress};
pub use report::{AssetSkip, CompressionReport, CompressionStats};
pub use skeleton::Skeleton;
pub use spawn::{CompressionHandle, spawn_compression};
pub use transcode::{SkipReason, TranscodeOutcome, transcode};
