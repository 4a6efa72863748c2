//! Control process
//!
//! Owns the window, dock and clipboard. It executes the requests the logic
//! process sends over the channel and reports window changes back. The
//! platform itself sits behind `Platform`; failures there are logged and
//! otherwise ignored.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use crossterm::{execute, terminal::SetTitle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::APP_TITLE;
use crate::ipc::{ControlEnd, ToControl, ToLogic};
use crate::models::{Bounds, Size};

/// Window size before the player resizes it
pub const INITIAL_SIZE: Size = Size {
    width: 600,
    height: 400,
};

/// Screen area assumed when the platform cannot tell
pub const DEFAULT_WORK_AREA: Size = Size {
    width: 1920,
    height: 1080,
};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("clipboard unavailable")]
    ClipboardUnavailable,
    #[error("clipboard: {0}")]
    Clipboard(#[from] arboard::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Window/dock/clipboard operations of the host platform
#[async_trait]
pub trait Platform: Send {
    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), PlatformError>;
    /// `ratio` 0 clears the constraint
    fn set_aspect_ratio(&mut self, ratio: f64, extra_size: Size) -> Result<(), PlatformError>;
    fn set_badge(&mut self, text: &str) -> Result<(), PlatformError>;
    /// `<0` hides, `>1` indeterminate
    fn set_progress(&mut self, value: f64) -> Result<(), PlatformError>;
    fn set_fullscreen(&mut self, on: bool) -> Result<(), PlatformError>;
    async fn read_clipboard(&mut self) -> Result<String, PlatformError>;
    fn work_area(&self) -> Size;
}

// =============================================================================
// Control Process
// =============================================================================

pub struct ControlProcess<P: Platform> {
    platform: P,
    end: ControlEnd,
    bounds: Bounds,
    /// Active aspect-ratio constraint
    aspect_ratio: Option<(f64, Size)>,
    fullscreen: bool,
}

impl<P: Platform> ControlProcess<P> {
    pub fn new(platform: P, end: ControlEnd) -> Self {
        let work_area = platform.work_area();
        let bounds = Bounds {
            x: (work_area.width.saturating_sub(INITIAL_SIZE.width) / 2) as i32,
            y: (work_area.height.saturating_sub(INITIAL_SIZE.height) / 2) as i32,
            width: INITIAL_SIZE.width,
            height: INITIAL_SIZE.height,
        };
        Self {
            platform,
            end,
            bounds,
            aspect_ratio: None,
            fullscreen: false,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn aspect_ratio(&self) -> Option<(f64, Size)> {
        self.aspect_ratio
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Forward a content identifier (command line, open-file event)
    pub fn add_torrent(&self, id: impl Into<String>) {
        self.end.outbox.send(ToLogic::AddTorrent(id.into()));
    }

    /// Forward a seed selection (command line, file dialog)
    pub fn seed(&self, files: Vec<PathBuf>) {
        if !files.is_empty() {
            self.end.outbox.send(ToLogic::Seed(files));
        }
    }

    /// Report bounds and work area to the logic process
    pub fn report_metrics(&self) {
        self.end.outbox.send(ToLogic::WindowMetrics {
            bounds: self.bounds,
            work_area: self.platform.work_area(),
        });
    }

    /// Serve requests until the logic process goes away
    pub async fn run(mut self) {
        info!("control process started");
        self.report_metrics();
        while let Some(msg) = self.end.inbox.recv().await {
            self.handle(msg).await;
        }
        // Leave the dock clean
        self.degrade("setProgress", |p| p.set_progress(-1.0));
        info!("control process stopped");
    }

    /// Execute one request from the logic process
    pub async fn handle(&mut self, msg: ToControl) {
        debug!("control <- {:?}", msg);
        match msg {
            ToControl::SetBounds(bounds) => {
                self.bounds = bounds;
                self.degrade("setBounds", |p| p.set_bounds(bounds));
                self.report_metrics();
            }
            ToControl::SetAspectRatio { ratio, extra_size } => {
                self.aspect_ratio = if ratio > 0.0 {
                    Some((ratio, extra_size))
                } else {
                    None
                };
                self.degrade("setAspectRatio", |p| p.set_aspect_ratio(ratio, extra_size));
            }
            ToControl::SetBadge(text) => self.degrade("setBadge", |p| p.set_badge(&text)),
            ToControl::SetProgress(value) => self.degrade("setProgress", |p| p.set_progress(value)),
            ToControl::AddTorrentFromPaste => self.paste().await,
            ToControl::ToggleFullScreen => {
                self.fullscreen = !self.fullscreen;
                let on = self.fullscreen;
                self.degrade("setFullScreen", |p| p.set_fullscreen(on));
                self.end.outbox.send(ToLogic::FullscreenChanged(on));
            }
        }
    }

    /// Read the clipboard and forward one `addTorrent` per non-empty line
    pub async fn paste(&mut self) {
        let text = match self.platform.read_clipboard().await {
            Ok(text) => text,
            Err(e) => {
                warn!("paste: {}", e);
                return;
            }
        };
        for id in paste_lines(&text) {
            self.add_torrent(id);
        }
    }

    fn degrade(&mut self, what: &str, op: impl FnOnce(&mut P) -> Result<(), PlatformError>) {
        if let Err(e) = op(&mut self.platform) {
            warn!("{} failed: {}", what, e);
        }
    }
}

/// Non-empty trimmed lines of pasted text, in order
pub fn paste_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

// =============================================================================
// Terminal Platform
// =============================================================================

/// Terminal escape sequence for a progress value (ConEmu/Windows Terminal OSC 9;4)
pub fn progress_sequence(value: f64) -> String {
    if value < 0.0 {
        "\x1b]9;4;0;0\x07".to_string()
    } else if value > 1.0 {
        "\x1b]9;4;3;0\x07".to_string()
    } else {
        format!("\x1b]9;4;1;{}\x07", (value * 100.0).round() as u32)
    }
}

/// Window title carrying the badge
pub fn badge_title(text: &str) -> String {
    if text.is_empty() {
        APP_TITLE.to_string()
    } else {
        format!("{} ({})", APP_TITLE, text)
    }
}

/// The terminal as the window: title as badge, OSC 9;4 as dock progress.
/// Geometry cannot be applied to a terminal and is only recorded.
#[derive(Debug)]
pub struct TerminalPlatform {
    /// Write escape sequences (false when headless)
    interactive: bool,
    work_area: Size,
}

impl TerminalPlatform {
    pub fn new(interactive: bool, work_area: Option<Size>) -> Self {
        Self {
            interactive,
            work_area: work_area.unwrap_or(DEFAULT_WORK_AREA),
        }
    }
}

#[async_trait]
impl Platform for TerminalPlatform {
    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), PlatformError> {
        debug!("window bounds {:?} (not applicable to a terminal)", bounds);
        Ok(())
    }

    fn set_aspect_ratio(&mut self, ratio: f64, extra_size: Size) -> Result<(), PlatformError> {
        debug!("aspect ratio {} + {:?} (not applicable to a terminal)", ratio, extra_size);
        Ok(())
    }

    fn set_badge(&mut self, text: &str) -> Result<(), PlatformError> {
        if self.interactive {
            execute!(std::io::stdout(), SetTitle(badge_title(text)))?;
        }
        Ok(())
    }

    fn set_progress(&mut self, value: f64) -> Result<(), PlatformError> {
        if self.interactive {
            let mut out = std::io::stdout();
            out.write_all(progress_sequence(value).as_bytes())?;
            out.flush()?;
        }
        Ok(())
    }

    fn set_fullscreen(&mut self, on: bool) -> Result<(), PlatformError> {
        debug!("fullscreen {} (not applicable to a terminal)", on);
        Ok(())
    }

    async fn read_clipboard(&mut self) -> Result<String, PlatformError> {
        // arboard talks to the display server synchronously
        tokio::task::spawn_blocking(|| -> Result<String, PlatformError> {
            Ok(arboard::Clipboard::new()?.get_text()?)
        })
            .await
            .map_err(|_| PlatformError::ClipboardUnavailable)?
    }

    fn work_area(&self) -> Size {
        self.work_area
    }
}
