//! Data structures and types for seedcast
//!
//! Shared models organized by domain:
//! - **Torrent**: engine-owned handles and the status snapshot the core reads
//! - **Playback**: sinks and cast device kinds
//! - **Window**: geometry exchanged with the control process

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::bitfield::Bitfield;

// =============================================================================
// Torrent Models
// =============================================================================

/// Stable identity of a torrent inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TorrentKey(pub Uuid);

impl TorrentKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TorrentKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TorrentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file inside a torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub length: u64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Read-only snapshot of an engine torrent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TorrentStatus {
    /// Display name, unknown until metadata arrives
    pub name: Option<String>,
    pub info_hash: Option<String>,
    /// Fraction complete, 0.0 - 1.0
    pub progress: f64,
    pub downloaded: u64,
    pub length: u64,
    pub num_peers: u32,
    /// Metadata received, files known
    pub ready: bool,
    pub files: Vec<FileInfo>,
    pub bitfield: Bitfield,
    /// Bytes per second
    pub download_speed: u64,
    pub upload_speed: u64,
}

impl TorrentStatus {
    /// Name for display, with a placeholder while metadata is pending
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Loading torrent...")
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Format peer count ("1 peer", "3 peers")
    pub fn format_peers(&self) -> String {
        let noun = if self.num_peers == 1 { "peer" } else { "peers" };
        format!("{} {}", self.num_peers, noun)
    }

    /// Format transfer status ("12 MB / 700 MB", or just the total when done)
    pub fn format_downloaded(&self) -> String {
        let downloaded = format_bytes(self.downloaded);
        let total = format_bytes(self.length);
        if downloaded == total {
            downloaded
        } else {
            format!("{} / {}", downloaded, total)
        }
    }

    /// Whole-percent progress for display
    pub fn percent(&self) -> u32 {
        (self.progress.clamp(0.0, 1.0) * 100.0).floor() as u32
    }
}

/// Format a byte count for display
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if value >= 100.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else if value >= 10.0 {
        format!("{:.1} {}", value, UNITS[unit])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

/// Format a transfer speed for display
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

/// Format seconds as HH:MM:SS or MM:SS
pub fn format_time(seconds: f64) -> String {
    let total_secs = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Kind of networked playback receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Chromecast,
    Airplay,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Chromecast => write!(f, "Chromecast"),
            DeviceKind::Airplay => write!(f, "AirPlay"),
        }
    }
}

/// Where a playback session sends its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sink {
    Local,
    Chromecast,
    Airplay,
}

impl Sink {
    /// Cast device kind for remote sinks
    pub fn device(&self) -> Option<DeviceKind> {
        match self {
            Sink::Local => None,
            Sink::Chromecast => Some(DeviceKind::Chromecast),
            Sink::Airplay => Some(DeviceKind::Airplay),
        }
    }
}

impl From<DeviceKind> for Sink {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Chromecast => Sink::Chromecast,
            DeviceKind::Airplay => Sink::Airplay,
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Local => write!(f, "Local player"),
            Sink::Chromecast => write!(f, "Chromecast"),
            Sink::Airplay => write!(f, "AirPlay"),
        }
    }
}

// =============================================================================
// Window Models
// =============================================================================

/// Window position and size in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
