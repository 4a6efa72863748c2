//! Configuration management for seedcast
//!
//! Config is stored at ~/.config/seedcast/config.toml. A missing or broken
//! file falls back to defaults; command-line flags override what it says.

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::models::Size;
use crate::stream::player::PlayerType;

/// How eagerly progress events are turned into render passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderProfile {
    /// Up to four renders per second
    Responsive,
    /// At most one render per second
    #[default]
    Relaxed,
}

impl RenderProfile {
    /// Throttle interval for render passes
    pub fn interval(self) -> Duration {
        match self {
            RenderProfile::Responsive => Duration::from_millis(250),
            RenderProfile::Relaxed => Duration::from_millis(1000),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render_profile: RenderProfile,
    /// Chromecast to use without scanning
    pub default_device: Option<String>,
    /// Local player for the "play" action
    pub player: PlayerType,
    /// Path or name of the catt binary
    pub catt_path: String,
    /// Tracing filter directive, used when RUST_LOG is unset
    pub log_filter: Option<String>,
    /// Screen size the window is fitted into
    pub work_area: Option<Size>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render_profile: RenderProfile::default(),
            default_device: None,
            player: PlayerType::default(),
            catt_path: "catt".to_string(),
            log_filter: None,
            work_area: None,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/seedcast/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("seedcast").join("config.toml"))
    }

    /// Load config from the default path, or return defaults if not found
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from `path`; unreadable or invalid files give defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }
}
