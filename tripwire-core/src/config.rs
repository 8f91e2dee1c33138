//! Configuration system for Tripwire.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/tripwire/config.toml` and/or `.tripwire/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripwireConfig {
    pub feed: FeedConfig,
    pub attention: AttentionConfig,
    pub display: DisplayConfig,
}

impl TripwireConfig {
    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Where the upstream detection pipeline lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the detection backend.
    pub base_url: String,
    /// Path of the point-in-time snapshot endpoint.
    pub snapshot_path: String,
    /// Path of the live event stream.
    pub stream_path: String,
    /// Look-back window requested from the snapshot endpoint (minutes).
    pub lookback_minutes: u64,
    /// Timeout for the snapshot request (seconds). The stream itself has none.
    pub request_timeout_secs: u64,
    /// Capacity of the channel between the stream reader and the triage loop.
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            snapshot_path: "/incidents/recent".into(),
            stream_path: "/stream".into(),
            lookback_minutes: 60,
            request_timeout_secs: 20,
            channel_capacity: 256,
        }
    }
}

/// Attention-window behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Number of incidents shown on the live surface.
    pub window_size: usize,
    /// Let High-severity arrivals jump to the front while live.
    pub preempt_high: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            preempt_high: true,
        }
    }
}

/// List-view display settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Hide incidents older than this many minutes. Unset shows everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_minutes: Option<u64>,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `TRIPWIRE_`)
/// 3. Workspace-local config (`.tripwire/config.toml`)
/// 4. User config (`~/.config/tripwire/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&TripwireConfig>,
) -> Result<TripwireConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TripwireConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "tripwire", "tripwire") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".tripwire").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // TRIPWIRE_FEED__BASE_URL, TRIPWIRE_ATTENTION__WINDOW_SIZE, ...
    figment = figment.merge(Env::prefixed("TRIPWIRE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
}
