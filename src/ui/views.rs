//! View construction
//!
//! Pure functions from `AppState` to a `Node` tree. Every render pass builds
//! the whole tree; the reconciler works out what actually changed.

use crate::app::{AppState, View};
use crate::bitfield::compress;
use crate::models::{format_speed, format_time, Sink, TorrentStatus};
use crate::stream::engine::TorrentRef;
use crate::ui::node::{div, icon, span, Element, Node};

/// Root of the view tree
pub fn app(state: &AppState) -> Node {
    let content = match state.active_view {
        View::Home => torrent_list(state),
        View::Player => player(state),
    };

    div("app")
        .child(header(state))
        .child(div("content").child(content))
        .maybe(messages(state))
        .into()
}

fn header(state: &AppState) -> Element {
    let mut right = div("nav right");
    if state.active_view != View::Player {
        right = right.child(icon("add", "add"));
    }
    if state.dock.badge > 0 {
        right = right.child(span("badge", state.dock.badge.to_string()));
    }

    div("header")
        .child(div("title").child(Node::text(state.title.clone())))
        .child(div("nav left").child(icon("back", "chevron_left")))
        .child(right)
}

fn messages(state: &AppState) -> Option<Element> {
    if state.error.is_none() && state.warning.is_none() {
        return None;
    }
    Some(
        div("messages")
            .maybe(state.error.as_deref().map(|e| span("error", e)))
            .maybe(state.warning.as_deref().map(|w| span("warning", w))),
    )
}

// =============================================================================
// Torrent List
// =============================================================================

fn torrent_list(state: &AppState) -> Element {
    if state.torrents.is_empty() {
        return div("torrent-list").child(span(
            "empty",
            "Drop files, pass a magnet link on the command line, or paste one with v",
        ));
    }
    div("torrent-list").children(
        state
            .torrents
            .iter()
            .enumerate()
            .map(|(i, t)| torrent(t, i == state.list.selected)),
    )
}

/// One torrent row, keyed by engine identity so rows survive reordering
pub fn torrent(torrent: &TorrentRef, selected: bool) -> Element {
    let status = torrent.status();
    let class = if selected { "torrent selected" } else { "torrent" };
    let play_class = if status.ready { "btn play" } else { "btn play disabled" };

    div(class)
        .key(torrent.key().to_string())
        .child(torrent_metadata(&status))
        .child(icon("delete", "close"))
        .child(icon(play_class, "play_arrow"))
}

fn torrent_metadata(status: &TorrentStatus) -> Element {
    let files = (status.ready && status.files.len() > 1)
        .then(|| span("files", format!("{} files", status.files.len())));

    div("metadata")
        .child(div("name ellipsis").child(Node::text(status.display_name())))
        .child(
            div("status")
                .child(span("progress", format!("{}%", status.percent())))
                .child(span("", status.format_downloaded())),
        )
        .maybe(files)
        .child(span("peers", status.format_peers()))
        .child(span("download-speed", format!("↓ {}", format_speed(status.download_speed))))
        .child(span("upload-speed", format!("↑ {}", format_speed(status.upload_speed))))
}

// =============================================================================
// Player
// =============================================================================

/// Torrent and sink of the active session, or of the one starting
fn now_playing(state: &AppState) -> Option<(&TorrentRef, Sink, bool)> {
    if let Some(session) = state.session.session() {
        return Some((&session.torrent, session.sink, true));
    }
    state
        .session
        .pending()
        .map(|pending| (&pending.torrent, pending.sink, false))
}

fn player(state: &AppState) -> Element {
    let Some((torrent, sink, active)) = now_playing(state) else {
        return div("player").child(span("loading", "Nothing playing"));
    };
    let status = torrent.status();

    let target = match (sink, active) {
        (_, false) => "Starting media server...".to_string(),
        (Sink::Local, true) => "Playing in local player".to_string(),
        (remote, true) => {
            let device = remote
                .device()
                .and_then(|kind| state.devices.get(kind))
                .map(|d| d.name().to_string())
                .unwrap_or_else(|| remote.to_string());
            format!("Casting to {}", device)
        }
    };

    let url = state
        .session
        .session()
        .map(|s| if s.sink == Sink::Local { s.local_url.clone() } else { s.network_url.clone() });

    div("player")
        .child(
            div("letterbox")
                .child(span("name", status.display_name()))
                .child(span("casting", target))
                .maybe(url.map(|u| span("url", u))),
        )
        .child(player_controls(state, &status))
}

fn player_controls(state: &AppState, status: &TorrentStatus) -> Element {
    let video = &state.video;
    let mut bar = div("playback-bar").child(loading_bar(status));
    if let Some(duration) = video.duration.filter(|d| *d > 0.0) {
        let percent = 100.0 * video.current_time / duration;
        bar = bar.child(div("playback-cursor").attr("left", format!("{:.2}%", percent)));
    }

    let position = match video.duration {
        Some(duration) => format!(
            "{} / {}",
            format_time(video.current_time),
            format_time(duration)
        ),
        None => format_time(video.current_time),
    };

    let mut controls = div("player-controls")
        .child(bar)
        .child(icon("play-pause", if video.paused { "play_arrow" } else { "pause" }))
        .child(span("position", position))
        .child(icon(
            "fullscreen",
            if state.window.fullscreen {
                "fullscreen_exit"
            } else {
                "fullscreen"
            },
        ));
    if state.devices.chromecast.is_some() {
        controls = controls.child(icon("chromecast", "cast"));
    }
    if state.devices.airplay.is_some() {
        controls = controls.child(icon("airplay", "airplay"));
    }
    controls.child(icon("back", "chevron_left"))
}

/// Which pieces are loaded, as one rectangle per contiguous run
pub fn loading_bar(status: &TorrentStatus) -> Element {
    let pieces = status.bitfield.len();
    let bar = div("loading-bar").attr("data-pieces", pieces.to_string());
    if pieces == 0 {
        return bar;
    }
    bar.children(compress(&status.bitfield).into_iter().map(|part| {
        div("loading-bar-part")
            .attr("data-start", part.start.to_string())
            .attr("data-count", part.count.to_string())
            .attr("left", format!("{:.2}%", 100.0 * part.start as f64 / pieces as f64))
            .attr("width", format!("{:.2}%", 100.0 * part.count as f64 / pieces as f64))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitfield::Bitfield;

    #[test]
    fn test_loading_bar_parts() {
        let status = TorrentStatus {
            bitfield: [true, true, false, true].into_iter().collect::<Bitfield>(),
            ..TorrentStatus::default()
        };
        let bar = loading_bar(&status);
        assert_eq!(bar.get_attr("data-pieces"), Some("4"));
        assert_eq!(bar.children.len(), 2);

        let second = bar.children[1].as_element().unwrap();
        assert_eq!(second.get_attr("data-start"), Some("3"));
        assert_eq!(second.get_attr("left"), Some("75.00%"));
        assert_eq!(second.get_attr("width"), Some("25.00%"));
    }

    #[test]
    fn test_loading_bar_without_pieces() {
        let bar = loading_bar(&TorrentStatus::default());
        assert!(bar.children.is_empty());
    }

    #[test]
    fn test_metadata_shows_files_only_when_ready() {
        let mut status = TorrentStatus {
            files: vec![
                crate::models::FileInfo::new("a", 1),
                crate::models::FileInfo::new("b", 2),
            ],
            ..TorrentStatus::default()
        };
        let node: Node = torrent_metadata(&status).into();
        assert!(node.find_class("files").is_none());

        status.ready = true;
        let node: Node = torrent_metadata(&status).into();
        assert_eq!(
            node.find_class("files")
                .map(|f| Node::from(f.clone()).text_content()),
            Some("2 files".into())
        );
        assert!(node.text_content().contains("Loading torrent..."));
    }
}
