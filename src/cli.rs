//! CLI - Command Line Interface for seedcast
//!
//! # Examples
//!
//! ```bash
//! # Open the TUI with a magnet link already added
//! seedcast "magnet:?xt=urn:btih:...&dn=sintel.mp4"
//!
//! # Seed a folder and cast to a known device, no TUI
//! seedcast --seed ~/Videos/holiday --device "Living Room TV" --headless
//! ```

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{Config, RenderProfile};
use crate::stream::player::PlayerType;

/// seedcast - stream torrents to a local player or a Chromecast
///
/// Positional arguments are torrent identifiers (magnet links, info hashes
/// or .torrent files) added on startup.
#[derive(Parser, Debug)]
#[command(
    name = "seedcast",
    version,
    about = "Stream torrents to a local player or a Chromecast",
    after_help = "EXAMPLES:\n\
                  seedcast                                  Launch the TUI\n\
                  seedcast magnet:?xt=urn:btih:...          Add a torrent on startup\n\
                  seedcast -s movie.mp4 -d \"Living Room\"    Seed a file, cast to a device\n\
                  seedcast --headless -s ./videos           Seed without a TUI"
)]
pub struct Cli {
    /// Torrent identifiers to add on startup
    #[arg(value_name = "TORRENT_IDS")]
    pub torrent_ids: Vec<String>,

    /// Seed a local file or folder (repeatable)
    #[arg(long, short = 's', value_name = "PATH")]
    pub seed: Vec<PathBuf>,

    /// Chromecast device name, skips discovery
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    /// Render throttling profile
    #[arg(long, value_enum)]
    pub profile: Option<RenderProfile>,

    /// Local player to use
    #[arg(long, value_enum)]
    pub player: Option<PlayerType>,

    /// Run without the TUI (log to stderr, stop with Ctrl+C)
    #[arg(long)]
    pub headless: bool,

    /// Do not scan for cast devices
    #[arg(long)]
    pub no_discovery: bool,

    /// Path to config file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Load the config this invocation points at and apply flag overrides
    pub fn resolve_config(&self) -> Config {
        let config = match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };
        self.apply(config)
    }

    /// Flags win over the config file
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(profile) = self.profile {
            config.render_profile = profile;
        }
        if let Some(player) = self.player {
            config.player = player;
        }
        if let Some(device) = &self.device {
            config.default_device = Some(device.clone());
        }
        config
    }

    /// Log filter from the -v count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
