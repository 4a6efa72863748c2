//! Application store tests
//!
//! Dispatch actions against a fake engine, then check the state, the queued
//! effects and the messages sent to the control process.

mod common;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use common::{store, FakeReceiver};
use seedcast::app::{Action, Effect, Store, View, HEADER_HEIGHT};
use seedcast::ipc::{Inbox, ToControl};
use seedcast::models::{Bounds, DeviceKind, Sink, Size};
use seedcast::stream::engine::EngineEvent;

const SCREEN: Size = Size {
    width: 1920,
    height: 1080,
};

const WINDOW: Bounds = Bounds {
    x: 660,
    y: 340,
    width: 600,
    height: 400,
};

fn key(code: KeyCode) -> Action {
    Action::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

/// Messages the store sent to the control process, minus dock progress
fn sent(inbox: &mut Inbox<ToControl>) -> Vec<ToControl> {
    inbox
        .drain()
        .into_iter()
        .filter(|m| !matches!(m, ToControl::SetProgress(_)))
        .collect()
}

/// Complete every pending `Listen` effect successfully, returning the other effects
fn finish_listens(store: &mut Store, port: u16) -> Vec<Effect> {
    let mut rest = Vec::new();
    for effect in store.take_effects() {
        match effect {
            Effect::Listen { ticket, server } => store.dispatch(Action::ServerListening {
                ticket,
                server,
                addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            }),
            other => rest.push(other),
        }
    }
    rest.extend(store.take_effects());
    rest
}

/// Store with one torrent added and window metrics reported
fn store_with_torrent() -> (Store, Inbox<ToControl>, common::EngineLog, common::ServerLog) {
    let (mut store, mut inbox, log, servers) = store();
    store.dispatch(Action::WindowMetrics {
        bounds: WINDOW,
        work_area: SCREEN,
    });
    store.dispatch(Action::AddTorrent("magnet:?xt=urn:btih:movie".into()));
    store.take_effects();
    inbox.drain();
    (store, inbox, log, servers)
}

// =============================================================================
// Torrents
// =============================================================================

#[test]
fn test_add_torrent_trims_and_ignores_empty() {
    let (mut store, _inbox, log, _) = store();
    store.dispatch(Action::AddTorrent("   ".into()));
    store.dispatch(Action::AddTorrent("  magnet:?xt=urn:btih:abc \n".into()));

    assert_eq!(log.added(), vec!["magnet:?xt=urn:btih:abc"]);
    assert_eq!(store.state.torrents.len(), 1);
    assert_eq!(store.state.list.len, 1);
    assert!(store.take_render_request());
}

#[test]
fn test_add_torrent_error_is_surfaced() {
    let (mut store, _inbox, _, _) = store();
    store.dispatch(Action::AddTorrent("bad".into()));
    assert!(store.state.torrents.is_empty());
    assert_eq!(store.state.error.as_deref(), Some("invalid torrent identifier: bad"));

    // Any key clears it
    store.dispatch(key(KeyCode::Down));
    assert!(store.state.error.is_none());
}

#[test]
fn test_seed_empty_selection_is_noop() {
    let (mut store, _inbox, log, _) = store();
    store.dispatch(Action::Seed(Vec::new()));
    assert!(log.seeded().is_empty());
    assert!(store.state.error.is_none());
}

#[test]
fn test_drop_files_splits_torrent_files_from_seeds() {
    let (mut store, _inbox, log, _) = store();
    store.dispatch(Action::DropFiles(vec![
        PathBuf::from("/tmp/a.torrent"),
        PathBuf::from("/tmp/movie.mkv"),
        PathBuf::from("/tmp/B.TORRENT"),
        PathBuf::from("/tmp/photos"),
    ]));

    assert_eq!(log.added(), vec!["/tmp/a.torrent", "/tmp/B.TORRENT"]);
    assert_eq!(
        log.seeded(),
        vec![vec![PathBuf::from("/tmp/movie.mkv"), PathBuf::from("/tmp/photos")]]
    );
    assert_eq!(store.state.torrents.len(), 3);
}

#[test]
fn test_delete_torrent_while_playing_returns_home() {
    let (mut store, mut inbox, log, servers) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    assert_eq!(store.state.active_view, View::Player);
    inbox.drain();

    store.dispatch(Action::DeleteTorrent(movie));
    assert_eq!(store.state.active_view, View::Home);
    assert!(store.state.session.is_idle());
    assert!(store.state.torrents.is_empty());
    assert_eq!(log.removed(), vec![movie]);
    assert_eq!(servers.live(), 0);
    assert!(store.take_effects().iter().any(|e| matches!(e, Effect::StopPlayer)));
    // Bounds restored on the way out
    assert_eq!(
        sent(&mut inbox),
        vec![
            ToControl::SetAspectRatio {
                ratio: 0.0,
                extra_size: Size::default()
            },
            ToControl::SetBounds(WINDOW),
        ]
    );
}

// =============================================================================
// Dock
// =============================================================================

#[test]
fn test_dock_progress_follows_least_advanced_torrent() {
    let (mut store, mut inbox, log, _) = store();
    store.dispatch(Action::AddTorrent("one".into()));
    store.dispatch(Action::AddTorrent("two".into()));
    store.dispatch(Action::AddTorrent("three".into()));
    inbox.drain();

    log.torrent(1).set_progress(0.4);
    store.dispatch(Action::Tick);
    assert_eq!(inbox.drain(), vec![ToControl::SetProgress(0.4)]);
    assert_eq!(store.state.dock.progress, 0.4);

    // Unchanged value is not sent again
    store.dispatch(Action::Tick);
    assert!(inbox.drain().is_empty());

    log.torrent(1).set_progress(1.0);
    store.dispatch(Action::Tick);
    assert_eq!(inbox.drain(), vec![ToControl::SetProgress(-1.0)]);
}

#[test]
fn test_done_while_unfocused_badges_until_focus_returns() {
    let (mut store, mut inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();

    store.dispatch(Action::Engine(EngineEvent::Done(movie)));
    assert!(sent(&mut inbox).is_empty());

    store.dispatch(Action::WindowFocus(false));
    store.dispatch(Action::Engine(EngineEvent::Done(movie)));
    store.dispatch(Action::Engine(EngineEvent::Done(movie)));
    assert_eq!(
        sent(&mut inbox),
        vec![ToControl::SetBadge("1".into()), ToControl::SetBadge("2".into())]
    );

    store.dispatch(Action::WindowFocus(true));
    assert_eq!(store.state.dock.badge, 0);
    assert_eq!(sent(&mut inbox), vec![ToControl::SetBadge(String::new())]);

    // Focus again with no badge sends nothing
    store.dispatch(Action::WindowFocus(true));
    assert!(sent(&mut inbox).is_empty());
}

#[test]
fn test_engine_warning_does_not_touch_state() {
    let (mut store, _inbox, _, _) = store();
    store.dispatch(Action::Engine(EngineEvent::Warning("tracker timeout".into())));
    assert!(store.state.error.is_none());
    assert!(store.state.warning.is_none());

    store.dispatch(Action::Engine(EngineEvent::Error("disk full".into())));
    assert_eq!(store.state.error.as_deref(), Some("disk full"));
}

// =============================================================================
// Player and Window
// =============================================================================

#[test]
fn test_open_player_fits_window_and_launches_player() {
    let (mut store, mut inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();

    store.dispatch(Action::OpenPlayer(movie));
    // Nothing visible changes until the server listens
    assert_eq!(store.state.active_view, View::Home);
    let effects = finish_listens(&mut store, 8000);

    assert_eq!(store.state.active_view, View::Player);
    assert_eq!(store.state.title, "magnet:?xt=urn:btih:movie");
    assert!(matches!(
        effects.as_slice(),
        [Effect::LaunchPlayer { url, .. }] if url == "http://localhost:8000/1"
    ));

    assert_eq!(store.state.window.saved_bounds, Some(WINDOW));
    assert_eq!(
        sent(&mut inbox),
        vec![
            ToControl::SetAspectRatio {
                ratio: 1280.0 / 720.0,
                extra_size: Size::new(0, HEADER_HEIGHT)
            },
            ToControl::SetBounds(Bounds {
                x: 320,
                y: 161,
                width: 1280,
                height: 758,
            }),
        ]
    );
}

#[test]
fn test_saved_bounds_set_once_and_cleared_on_back() {
    let (mut store, mut inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);

    // Player reports the real size and the window moves again
    store.dispatch(Action::WindowMetrics {
        bounds: Bounds {
            x: 320,
            y: 161,
            width: 1280,
            height: 758,
        },
        work_area: SCREEN,
    });
    store.dispatch(Action::SetDimensions(Size::new(640, 360)));
    assert_eq!(store.state.window.saved_bounds, Some(WINDOW));
    inbox.drain();

    store.dispatch(Action::Back);
    assert_eq!(store.state.active_view, View::Home);
    assert_eq!(store.state.window.saved_bounds, None);
    assert_eq!(
        sent(&mut inbox),
        vec![
            ToControl::SetAspectRatio {
                ratio: 0.0,
                extra_size: Size::default()
            },
            ToControl::SetBounds(WINDOW),
        ]
    );
}

#[test]
fn test_back_without_saved_bounds_only_clears_aspect_ratio() {
    let (mut store, mut inbox, _, _) = store();
    store.dispatch(Action::AddTorrent("movie".into()));
    let movie = store.state.torrents[0].key();
    // No window metrics yet: there is nothing to save
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    assert_eq!(store.state.window.saved_bounds, None);
    inbox.drain();

    store.dispatch(Action::Back);
    assert_eq!(
        sent(&mut inbox),
        vec![ToControl::SetAspectRatio {
            ratio: 0.0,
            extra_size: Size::default()
        }]
    );
}

#[test]
fn test_escape_leaves_fullscreen_before_going_back() {
    let (mut store, mut inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    store.dispatch(Action::FullscreenChanged(true));
    inbox.drain();

    store.dispatch(key(KeyCode::Esc));
    assert_eq!(sent(&mut inbox), vec![ToControl::ToggleFullScreen]);
    assert_eq!(store.state.active_view, View::Player);

    store.dispatch(Action::FullscreenChanged(false));
    store.dispatch(key(KeyCode::Esc));
    assert_eq!(store.state.active_view, View::Home);
}

#[test]
fn test_playback_jump_clamps_to_duration() {
    let (mut store, _inbox, _, _) = store();
    store.dispatch(Action::PlaybackJump(-5.0));
    assert_eq!(store.state.video.jump_to, Some(0.0));

    store.state.video.duration = Some(60.0);
    store.dispatch(Action::PlaybackJump(90.0));
    assert_eq!(store.state.video.jump_to, Some(60.0));
    assert_eq!(store.state.video.current_time, 60.0);

    store.dispatch(Action::PlayPause);
    assert!(store.state.video.paused);
}

#[test]
fn test_player_exit_goes_back_only_for_current_session() {
    let (mut store, _inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    let ticket = store.state.session.session().map(|s| s.ticket).unwrap();

    store.dispatch(Action::PlayerExited(ticket + 100));
    assert_eq!(store.state.active_view, View::Player);

    store.dispatch(Action::PlayerExited(ticket));
    assert_eq!(store.state.active_view, View::Home);
    assert!(store.state.session.is_idle());
}

#[test]
fn test_player_failure_is_surfaced() {
    let (mut store, _inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    let ticket = store.state.session.session().map(|s| s.ticket).unwrap();

    store.dispatch(Action::PlayerFailed {
        ticket,
        error: "Player 'vlc' not found. Install it first.".into(),
    });
    assert_eq!(store.state.active_view, View::Home);
    assert_eq!(store.state.error.as_deref(), Some("Player 'vlc' not found. Install it first."));
}

#[test]
fn test_server_failure_is_fatal_to_open() {
    let (mut store, _inbox, _, _) = store();
    store.dispatch(Action::AddTorrent("unbindable".into()));
    let key = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(key));

    let Some(Effect::Listen { ticket, server }) = store.take_effects().pop() else {
        panic!("expected a Listen effect");
    };
    server.destroy();
    store.dispatch(Action::ServerFailed {
        ticket,
        error: "failed to bind port 0: address in use".into(),
    });

    assert!(store.state.session.is_idle());
    assert_eq!(store.state.active_view, View::Home);
    assert_eq!(
        store.state.error.as_deref(),
        Some("Could not start media server: failed to bind port 0: address in use")
    );
}

#[test]
fn test_failed_replacement_leaves_player_view() {
    let (mut store, mut inbox, _, servers) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);
    assert_eq!(store.state.active_view, View::Player);
    assert_eq!(store.state.window.saved_bounds, Some(WINDOW));
    inbox.drain();

    store.dispatch(Action::AddTorrent("unbindable".into()));
    let broken = store.state.torrents[1].key();
    store.dispatch(Action::OpenPlayer(broken));
    let ticket = store
        .take_effects()
        .into_iter()
        .find_map(|e| match e {
            Effect::Listen { ticket, .. } => Some(ticket),
            _ => None,
        })
        .unwrap();
    store.dispatch(Action::ServerFailed {
        ticket,
        error: "failed to bind port 0: address in use".into(),
    });

    assert!(store.state.session.is_idle());
    assert_eq!(store.state.active_view, View::Home);
    assert_eq!(store.state.window.saved_bounds, None);
    assert_eq!(
        store.state.error.as_deref(),
        Some("Could not start media server: failed to bind port 0: address in use")
    );
    assert_eq!(
        sent(&mut inbox),
        vec![
            ToControl::SetAspectRatio {
                ratio: 0.0,
                extra_size: Size::default()
            },
            ToControl::SetBounds(WINDOW),
        ]
    );
    assert_eq!(servers.live(), 0);
}

#[test]
fn test_superseding_pending_open_keeps_one_server() {
    let (mut store, _inbox, _, servers) = store();
    store.dispatch(Action::AddTorrent("a".into()));
    store.dispatch(Action::AddTorrent("b".into()));
    let (a, b) = (store.state.torrents[0].key(), store.state.torrents[1].key());

    store.dispatch(Action::OpenPlayer(a));
    store.dispatch(Action::OpenPlayer(b));

    assert_eq!(servers.events(), vec!["create 1", "destroy 1", "create 2"]);
    assert_eq!(servers.max_live(), 1);
    let listens = store
        .take_effects()
        .into_iter()
        .filter(|e| matches!(e, Effect::Listen { .. }))
        .count();
    assert_eq!(listens, 2);
}

#[test]
fn test_open_torrent_without_files_is_an_error() {
    let (mut store, _inbox, _, servers) = store();
    store.dispatch(Action::AddTorrent("empty".into()));
    let key = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(key));

    assert!(store.take_effects().is_empty());
    assert_eq!(store.state.error.as_deref(), Some("torrent has no files to play yet"));
    assert_eq!(servers.events(), Vec::<String>::new());
}

// =============================================================================
// Cast Devices
// =============================================================================

#[test]
fn test_cast_without_device_warns() {
    let (mut store, _inbox, _, servers) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenAirplay(movie));

    assert_eq!(store.state.warning.as_deref(), Some("No AirPlay found"));
    assert!(store.take_effects().is_empty());
    assert_eq!(servers.live(), 0);
}

#[test]
fn test_cast_plays_network_url_with_title() {
    let (mut store, _inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::DeviceFound(FakeReceiver::new(DeviceKind::Chromecast, "Living Room")));
    store.dispatch(Action::OpenChromecast(movie));
    let effects = finish_listens(&mut store, 8000);

    let [Effect::Cast { device, url, options }] = effects.as_slice() else {
        panic!("expected one Cast effect, got {:?}", effects);
    };
    assert_eq!(device.name(), "Living Room");
    assert!(url.starts_with("http://") && url.ends_with(":8000/1"));
    assert_eq!(options.title, "seedcast — magnet:?xt=urn:btih:movie");
    assert_eq!(store.state.active_view, View::Player);
    assert_eq!(store.state.session.sink(), Some(Sink::Chromecast));
}

#[test]
fn test_switch_from_local_to_cast_stops_local_player() {
    let (mut store, _inbox, _, servers) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::DeviceFound(FakeReceiver::new(DeviceKind::Chromecast, "TV")));
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);

    store.dispatch(key(KeyCode::Char('c')));
    let effects = store.take_effects();
    assert!(matches!(effects.first(), Some(Effect::StopPlayer)));
    assert!(matches!(effects.get(1), Some(Effect::Listen { .. })));
    assert_eq!(servers.events(), vec!["create 1", "destroy 1", "create 2"]);
    assert_eq!(servers.max_live(), 1);
}

#[test]
fn test_device_error_keeps_session_active() {
    let (mut store, _inbox, _, _) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    let airplay: Arc<FakeReceiver> = FakeReceiver::new(DeviceKind::Airplay, "Apple TV");
    store.dispatch(Action::DeviceFound(airplay));
    store.dispatch(Action::OpenAirplay(movie));
    finish_listens(&mut store, 8000);

    store.dispatch(Action::DeviceError {
        kind: DeviceKind::Airplay,
        message: "connection refused".into(),
    });
    assert_eq!(store.state.warning.as_deref(), Some("AirPlay: connection refused"));
    assert_eq!(store.state.session.sink(), Some(Sink::Airplay));
    assert_eq!(store.state.active_view, View::Player);
}

#[test]
fn test_quit_closes_session() {
    let (mut store, _inbox, _, servers) = store_with_torrent();
    let movie = store.state.torrents[0].key();
    store.dispatch(Action::OpenPlayer(movie));
    finish_listens(&mut store, 8000);

    store.dispatch(key(KeyCode::Char('q')));
    assert!(!store.state.running);
    assert_eq!(servers.live(), 0);
}
