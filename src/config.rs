// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion configuration

use crate::transform::RotationMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up by [`ConversionConfig::load`] from the working directory
pub const CONFIG_FILE: &str = "scadcore.toml";

/// Conversion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// How `rotate([x, y, z])` is interpreted
    pub rotation_mode: RotationMode,
    /// Bake top-level transforms into vertex positions instead of attaching
    /// them to the mesh
    pub bake_transforms: bool,
    /// Convert program statements on the rayon pool
    pub parallel: bool,
    /// Memoize boolean groups and module calls by fingerprint
    pub cache_enabled: bool,
    /// Per boolean operation limit in milliseconds
    pub csg_timeout_ms: Option<u64>,
    /// Deepest allowed nesting of nodes and module calls
    pub max_depth: usize,
    /// Global `$fn` override
    pub default_fragments: Option<u32>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            rotation_mode: RotationMode::default(),
            bake_transforms: true,
            parallel: true,
            cache_enabled: true,
            csg_timeout_ms: None,
            max_depth: 256,
            default_fragments: None,
        }
    }
}

impl ConversionConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: ConversionConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `scadcore.toml` if present, then apply `SCADCORE_*` environment
    /// overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`ConversionConfig::load`])
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("SCADCORE_PARALLEL") {
            self.parallel = parse_flag("SCADCORE_PARALLEL", &value)?;
        }
        if let Some(value) = lookup("SCADCORE_CACHE") {
            self.cache_enabled = parse_flag("SCADCORE_CACHE", &value)?;
        }
        if let Some(value) = lookup("SCADCORE_CSG_TIMEOUT_MS") {
            let ms: u64 = value
                .parse()
                .with_context(|| format!("SCADCORE_CSG_TIMEOUT_MS: not a number: {}", value))?;
            self.csg_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(value) = lookup("SCADCORE_MAX_DEPTH") {
            self.max_depth = value
                .parse()
                .with_context(|| format!("SCADCORE_MAX_DEPTH: not a number: {}", value))?;
        }
        if let Some(value) = lookup("SCADCORE_ROTATION_MODE") {
            self.rotation_mode = match value.as_str() {
                "z-only" => RotationMode::ZOnly,
                "full-euler" => RotationMode::FullEuler,
                other => bail!(
                    "SCADCORE_ROTATION_MODE: expected z-only or full-euler, got {}",
                    other
                ),
            };
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn csg_timeout(&self) -> Option<Duration> {
        self.csg_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{}: expected a boolean, got {}", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scadcore.toml");
        std::fs::write(&path, "rotation_mode = \"full-euler\"\ncsg_timeout_ms = 250\n").unwrap();

        let config = ConversionConfig::from_file(&path).unwrap();
        assert_eq!(config.rotation_mode, RotationMode::FullEuler);
        assert_eq!(config.csg_timeout(), Some(Duration::from_millis(250)));
        assert!(config.bake_transforms);
        assert_eq!(config.max_depth, 256);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");
        let config = ConversionConfig {
            parallel: false,
            default_fragments: Some(32),
            ..ConversionConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ConversionConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCADCORE_PARALLEL", "off"),
            ("SCADCORE_CSG_TIMEOUT_MS", "1500"),
            ("SCADCORE_ROTATION_MODE", "full-euler"),
        ]
        .into_iter()
        .collect();

        let mut config = ConversionConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.parallel);
        assert!(config.cache_enabled);
        assert_eq!(config.csg_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.rotation_mode, RotationMode::FullEuler);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = ConversionConfig::default();
        let err = config
            .apply_overrides(|key| (key == "SCADCORE_MAX_DEPTH").then(|| "deep".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SCADCORE_MAX_DEPTH"));
    }
}
