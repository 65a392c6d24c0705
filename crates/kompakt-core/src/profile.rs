// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy resolution — maps a compression level to its concrete profile.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{CompressionError, Result};
use crate::types::{ColorMode, CompressionLevel, CompressionProfile};

const LOW: CompressionProfile = CompressionProfile {
    image_quality: 0.8,
    max_dimension: 2048,
    color_mode: ColorMode::Color,
    stream_deflate_level: 3,
    strip_metadata: false,
    text_minify: false,
};

const MEDIUM: CompressionProfile = CompressionProfile {
    image_quality: 0.6,
    max_dimension: 1600,
    color_mode: ColorMode::Color,
    stream_deflate_level: 6,
    strip_metadata: true,
    text_minify: true,
};

const HIGH: CompressionProfile = CompressionProfile {
    image_quality: 0.4,
    max_dimension: 1200,
    color_mode: ColorMode::Grayscale,
    stream_deflate_level: 9,
    strip_metadata: true,
    text_minify: true,
};

/// The built-in profile for `level`.
pub fn builtin_profile(level: CompressionLevel) -> CompressionProfile {
    match level {
        CompressionLevel::Low => LOW,
        CompressionLevel::Medium => MEDIUM,
        CompressionLevel::High => HIGH,
    }
}

/// Resolves level tags to profiles: the built-in table plus any validated
/// overrides from [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct StrategyResolver {
    table: BTreeMap<CompressionLevel, CompressionProfile>,
}

impl Default for StrategyResolver {
    fn default() -> Self {
        let table = CompressionLevel::ALL
            .into_iter()
            .map(|level| (level, builtin_profile(level)))
            .collect();
        Self { table }
    }
}

impl StrategyResolver {
    /// Build a resolver, applying and validating the config's overrides.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut resolver = Self::default();
        for (level, profile) in &config.profile_overrides {
            profile
                .validate()
                .map_err(|msg| CompressionError::Config(format!("{level} profile: {msg}")))?;
            debug!(%level, ?profile, "profile override applied");
            resolver.table.insert(*level, *profile);
        }

        let deflate = |level| resolver.resolve(level).stream_deflate_level;
        if !(deflate(CompressionLevel::High) >= deflate(CompressionLevel::Medium)
            && deflate(CompressionLevel::Medium) >= deflate(CompressionLevel::Low))
        {
            return Err(CompressionError::Config(
                "deflate levels must satisfy high >= medium >= low".into(),
            ));
        }

        Ok(resolver)
    }

    /// Profile for `level`.
    pub fn resolve(&self, level: CompressionLevel) -> CompressionProfile {
        self.table
            .get(&level)
            .copied()
            .unwrap_or_else(|| builtin_profile(level))
    }

    /// Profile for a raw level tag; unknown tags resolve to medium.
    pub fn resolve_tag(&self, tag: &str) -> CompressionProfile {
        self.resolve(CompressionLevel::from_tag(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_valid() {
        for level in CompressionLevel::ALL {
            assert!(builtin_profile(level).validate().is_ok(), "{level}");
        }
    }

    #[test]
    fn deflate_levels_are_ordered() {
        let resolver = StrategyResolver::default();
        let low = resolver.resolve(CompressionLevel::Low).stream_deflate_level;
        let medium = resolver.resolve(CompressionLevel::Medium).stream_deflate_level;
        let high = resolver.resolve(CompressionLevel::High).stream_deflate_level;
        assert!(high >= medium && medium >= low);
    }

    #[test]
    fn high_is_grayscale_and_smallest() {
        let resolver = StrategyResolver::default();
        let high = resolver.resolve(CompressionLevel::High);
        assert_eq!(high.color_mode, ColorMode::Grayscale);
        assert_eq!(high.max_dimension, 1200);
        assert!(high.image_quality < resolver.resolve(CompressionLevel::Low).image_quality);
    }

    #[test]
    fn low_keeps_metadata() {
        let low = StrategyResolver::default().resolve(CompressionLevel::Low);
        assert!(!low.strip_metadata);
        assert_eq!(low.color_mode, ColorMode::Color);
    }

    #[test]
    fn unknown_tag_resolves_to_medium() {
        let resolver = StrategyResolver::default();
        assert_eq!(
            resolver.resolve_tag("ultra"),
            resolver.resolve(CompressionLevel::Medium)
        );
    }

    #[test]
    fn valid_override_replaces_builtin() {
        let mut config = PipelineConfig::default();
        let custom = CompressionProfile {
            max_dimension: 800,
            ..builtin_profile(CompressionLevel::High)
        };
        config
            .profile_overrides
            .insert(CompressionLevel::High, custom);

        let resolver = StrategyResolver::from_config(&config).expect("valid config");
        assert_eq!(resolver.resolve(CompressionLevel::High).max_dimension, 800);
    }

    #[test]
    fn override_breaking_deflate_order_is_rejected() {
        let mut config = PipelineConfig::default();
        config.profile_overrides.insert(
            CompressionLevel::Low,
            CompressionProfile {
                stream_deflate_level: 9,
                ..builtin_profile(CompressionLevel::Low)
            },
        );
        config.profile_overrides.insert(
            CompressionLevel::High,
            CompressionProfile {
                stream_deflate_level: 1,
                ..builtin_profile(CompressionLevel::High)
            },
        );

        let err = StrategyResolver::from_config(&config).expect_err("ordering violated");
        assert!(matches!(err, CompressionError::Config(_)));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut config = PipelineConfig::default();
        config.profile_overrides.insert(
            CompressionLevel::Medium,
            CompressionProfile {
                image_quality: 1.5,
                ..builtin_profile(CompressionLevel::Medium)
            },
        );
        assert!(StrategyResolver::from_config(&config).is_err());
    }
}
