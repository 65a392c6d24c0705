// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CompressionLevel, CompressionProfile};

/// Deployment settings for the compression pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Level used when the caller does not name one.
    pub default_level: CompressionLevel,
    /// Inputs larger than this are rejected before decomposition (default 50 MiB).
    pub max_input_bytes: u64,
    /// Per-level replacements for the built-in profile table.
    pub profile_overrides: BTreeMap<CompressionLevel, CompressionProfile>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_level: CompressionLevel::Medium,
            max_input_bytes: 50 * 1024 * 1024,
            profile_overrides: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
