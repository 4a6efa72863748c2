//! Neon theme for seedcast
//!
//! Colors are named by what they mark on screen (transfer direction, playback
//! target, loaded pieces) rather than by hue.

use ratatui::style::{Color, Modifier, Style};

/// Neon color palette
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// #0a0a0f
    pub const SURFACE: Color = Color::Rgb(0x0a, 0x0a, 0x0f);
    /// Status bar and the empty part of the loading bar
    pub const PANEL: Color = Color::Rgb(0x14, 0x14, 0x1e);
    pub const INK: Color = Color::Rgb(0xe0, 0xe0, 0xe0);
    pub const MUTED: Color = Color::Rgb(0x40, 0x40, 0x50);
    /// Headings and the active frame (cyan)
    pub const NEON: Color = Color::Rgb(0x00, 0xff, 0xf2);
    pub const FRAME: Color = Color::Rgb(0x00, 0x80, 0x78);
    /// Selected torrent row (hot pink)
    pub const SELECTED: Color = Color::Rgb(0xff, 0x00, 0x80);
    /// Download speed and key hints (yellow)
    pub const INBOUND: Color = Color::Rgb(0xff, 0xff, 0x00);
    /// Upload speed and file counts (magenta)
    pub const OUTBOUND: Color = Color::Rgb(0xff, 0x00, 0xff);
    /// Loaded pieces, progress and the cast target
    pub const LOADED: Color = Color::Rgb(0x00, 0xff, 0x00);
    pub const WARN: Color = Color::Rgb(0xff, 0xaa, 0x00);
    pub const FAIL: Color = Color::Rgb(0xff, 0x00, 0x40);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn base() -> Style {
        Style::default().fg(Self::INK).bg(Self::SURFACE)
    }

    pub fn heading() -> Style {
        Style::default().fg(Self::NEON).add_modifier(Modifier::BOLD)
    }

    /// Inverted label: app name, unseen-downloads badge
    pub fn badge() -> Style {
        Style::default()
            .fg(Self::SURFACE)
            .bg(Self::NEON)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn frame() -> Style {
        Style::default().fg(Self::FRAME)
    }

    pub fn frame_active() -> Style {
        Style::default().fg(Self::NEON).add_modifier(Modifier::BOLD)
    }

    pub fn selected_row() -> Style {
        Style::default().fg(Self::SELECTED).add_modifier(Modifier::BOLD)
    }

    /// Percent complete and the now-playing title
    pub fn progress() -> Style {
        Style::default().fg(Self::LOADED).add_modifier(Modifier::BOLD)
    }

    pub fn file_count() -> Style {
        Style::default().fg(Self::OUTBOUND)
    }

    pub fn download() -> Style {
        Style::default().fg(Self::INBOUND).add_modifier(Modifier::BOLD)
    }

    pub fn upload() -> Style {
        Style::default().fg(Self::OUTBOUND)
    }

    pub fn casting() -> Style {
        Style::default().fg(Self::LOADED).add_modifier(Modifier::BOLD)
    }

    pub fn loaded_pieces() -> Style {
        Style::default().fg(Self::LOADED).bg(Self::PANEL)
    }

    pub fn key_hint() -> Style {
        Style::default().fg(Self::INBOUND)
    }

    pub fn key_hint_desc() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::INK).bg(Self::PANEL)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::FAIL).add_modifier(Modifier::BOLD)
    }

    pub fn warning() -> Style {
        Style::default().fg(Self::WARN).add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_row_stands_out() {
        assert_ne!(Theme::selected_row(), Theme::base());
        assert_eq!(Theme::selected_row().fg, Some(Theme::SELECTED));
    }

    #[test]
    fn test_transfer_directions_differ() {
        assert_ne!(Theme::download().fg, Theme::upload().fg);
        assert_eq!(Theme::error().fg, Some(Theme::FAIL));
        assert_eq!(Theme::warning().fg, Some(Theme::WARN));
    }
}
