// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tonalprint_fingerprint::{FingerprinterOptions, DEFAULT_SIMILARITY_THRESHOLD};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Digest distance at or below which two recordings are reported as similar.
    pub similarity_threshold: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub fingerprint: FingerprinterOptions,
    pub matching: MatchingConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: TONALPRINT_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TONALPRINT_").split("__"));

    let config: AppConfig = figment.extract()?;
    config
        .fingerprint
        .validate()
        .context("invalid [fingerprint] configuration")?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
