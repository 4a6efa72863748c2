//! Local player - VLC/mpv playback for the local sink
//!
//! The local sink opens the session's loopback URL in an external player.

use std::process::Stdio;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::info;

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    #[default]
    Vlc,
    Mpv,
}

/// VLC ships as an app bundle on macOS
#[cfg(target_os = "macos")]
const VLC_BUNDLE: &str = "/Applications/VLC.app/Contents/MacOS/VLC";

impl PlayerType {
    /// Executable to spawn
    pub fn binary(&self) -> &'static str {
        match self {
            #[cfg(target_os = "macos")]
            PlayerType::Vlc if std::path::Path::new(VLC_BUNDLE).exists() => VLC_BUNDLE,
            PlayerType::Vlc => "vlc",
            PlayerType::Mpv => "mpv",
        }
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        })
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
}

/// Local player for streaming content
#[derive(Debug, Clone, Copy)]
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Build the command line for `url` without spawning it
    pub fn command(&self, url: &str, title: &str) -> Command {
        let mut cmd = Command::new(self.player_type.binary());
        cmd.arg(url);
        match self.player_type {
            PlayerType::Vlc => {
                cmd.arg("--no-video-title-show");
                if !title.is_empty() {
                    cmd.arg("--meta-title").arg(title);
                }
            }
            PlayerType::Mpv => {
                cmd.arg("--force-window=immediate");
                if !title.is_empty() {
                    cmd.arg(format!("--force-media-title={}", title));
                }
            }
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        // Closing the session kills the player
        cmd.kill_on_drop(true);
        cmd
    }

    /// Launch the player on `url`; the caller owns the child
    pub fn play(&self, url: &str, title: &str) -> Result<Child, PlayerError> {
        info!("launching {} on {}", self.player_type, url);
        self.command(url, title).spawn().map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, e: std::io::Error) -> PlayerError {
        if e.kind() == std::io::ErrorKind::NotFound {
            PlayerError::NotFound(self.player_type.binary().to_string())
        } else {
            PlayerError::StartFailed(e)
        }
    }
}

impl Default for LocalPlayer {
    fn default() -> Self {
        Self::new(PlayerType::default())
    }
}
