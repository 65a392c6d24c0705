// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Kompakt — Core types, errors, configuration, and compression profiles shared
// across all crates.

pub mod config;
pub mod error;
pub mod profile;
pub mod types;

pub use config::PipelineConfig;
pub use error::{AssetError, CompressionError};
pub use profile::StrategyResolver;
pub use types::*;
