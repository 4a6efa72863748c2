//! App state and core application logic
//!
//! `Store` owns the single application state tree. Every input (user intent,
//! engine event, server/device completion, control-process report, key press)
//! enters through `Store::dispatch` as an `Action`, mutates the state fully,
//! and requests a render. Asynchronous work is handed back to the runtime as
//! `Effect`s whose completions re-enter as actions.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, error, info, warn};

use crate::ipc::{Outbox, ToControl};
use crate::models::*;
use crate::stream::cast::{CastReceiver, PlayOptions};
use crate::stream::engine::{has_torrent_extension, Engine, EngineEvent, TorrentRef};
use crate::stream::server::SharedServer;
use crate::stream::session::{SessionManager, Ticket};

/// Height of the window header above the video
pub const HEADER_HEIGHT: u32 = 38;

/// Video size assumed for the local sink (the external player does not report one)
pub const DEFAULT_VIDEO_SIZE: Size = Size {
    width: 1280,
    height: 720,
};

/// Seconds skipped by the left/right keys
pub const JUMP_SECONDS: f64 = 10.0;

pub const APP_TITLE: &str = "seedcast";

// =============================================================================
// View
// =============================================================================

/// Screen currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Torrent list
    #[default]
    Home,
    /// Now playing (local player or cast)
    Player,
}

// =============================================================================
// Selection State
// =============================================================================

/// Selection state for the torrent list
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Move selection up
    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move selection down
    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    /// Jump to first item
    pub fn first(&mut self) {
        self.selected = 0;
    }

    /// Jump to last item
    pub fn last(&mut self) {
        self.selected = self.len.saturating_sub(1);
    }

    /// Update length (e.g., when a torrent is added or deleted)
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        // Clamp selected to valid range
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

/// List movement requested by a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    First,
    Last,
}

// =============================================================================
// State Tree
// =============================================================================

/// Discovered cast receivers, one per kind
#[derive(Debug, Clone, Default)]
pub struct Devices {
    pub chromecast: Option<Arc<dyn CastReceiver>>,
    pub airplay: Option<Arc<dyn CastReceiver>>,
}

impl Devices {
    pub fn get(&self, kind: DeviceKind) -> Option<&Arc<dyn CastReceiver>> {
        match kind {
            DeviceKind::Chromecast => self.chromecast.as_ref(),
            DeviceKind::Airplay => self.airplay.as_ref(),
        }
    }

    /// Remember a receiver; a newer one of the same kind replaces the old
    pub fn set(&mut self, receiver: Arc<dyn CastReceiver>) {
        match receiver.kind() {
            DeviceKind::Chromecast => self.chromecast = Some(receiver),
            DeviceKind::Airplay => self.airplay = Some(receiver),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowState {
    /// Bounds to restore when leaving the player
    pub saved_bounds: Option<Bounds>,
    /// Last bounds reported by the control process
    pub current: Option<Bounds>,
    pub work_area: Option<Size>,
    pub focused: bool,
    pub fullscreen: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            saved_bounds: None,
            current: None,
            work_area: None,
            focused: true,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockState {
    /// Torrents finished while the window was unfocused
    pub badge: u32,
    /// -1 = hidden
    pub progress: f64,
}

impl Default for DockState {
    fn default() -> Self {
        Self {
            badge: 0,
            progress: -1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoState {
    pub paused: bool,
    /// Seconds
    pub current_time: f64,
    /// Seconds, unknown until the player reports it
    pub duration: Option<f64>,
    /// Pending seek for the player to consume
    pub jump_to: Option<f64>,
}

/// The application state tree
#[derive(Debug)]
pub struct AppState {
    pub active_view: View,
    /// Insertion order
    pub torrents: Vec<TorrentRef>,
    pub session: SessionManager,
    pub devices: Devices,
    pub window: WindowState,
    pub dock: DockState,
    pub video: VideoState,
    pub list: ListState,
    /// Global error message
    pub error: Option<String>,
    pub warning: Option<String>,
    pub running: bool,
    pub title: String,
}

impl AppState {
    pub fn new(session: SessionManager) -> Self {
        Self {
            active_view: View::Home,
            torrents: Vec::new(),
            session,
            devices: Devices::default(),
            window: WindowState::default(),
            dock: DockState::default(),
            video: VideoState::default(),
            list: ListState::default(),
            error: None,
            warning: None,
            running: true,
            title: APP_TITLE.to_string(),
        }
    }

    pub fn torrent(&self, key: TorrentKey) -> Option<&TorrentRef> {
        self.torrents.iter().find(|t| t.key() == key)
    }

    pub fn selected_torrent(&self) -> Option<&TorrentRef> {
        self.torrents.get(self.list.selected)
    }

    /// Torrent of the active playback session
    pub fn playing_torrent(&self) -> Option<&TorrentRef> {
        self.session.session().map(|s| &s.torrent)
    }

    /// Set error message
    pub fn set_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        error!("{}", msg);
        self.error = Some(msg);
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{}", msg);
        self.warning = Some(msg);
    }

    /// Clear error and warning
    pub fn clear_messages(&mut self) {
        self.error = None;
        self.warning = None;
    }
}

// =============================================================================
// Actions and Effects
// =============================================================================

/// Everything that can change the state
pub enum Action {
    // User intents
    AddTorrent(String),
    Seed(Vec<PathBuf>),
    /// Files dropped on the window: .torrent files are added, the rest seeded
    DropFiles(Vec<PathBuf>),
    OpenPlayer(TorrentKey),
    DeleteTorrent(TorrentKey),
    OpenChromecast(TorrentKey),
    OpenAirplay(TorrentKey),
    Back,
    PlayPause,
    /// Absolute position in seconds
    PlaybackJump(f64),
    /// Video dimensions known: fit the window to them
    SetDimensions(Size),
    ToggleFullScreen,
    /// Ask the control process to read the clipboard
    Paste,
    Select(Move),
    Quit,

    // System inputs
    Engine(EngineEvent),
    DeviceFound(Arc<dyn CastReceiver>),
    ServerListening {
        ticket: Ticket,
        server: SharedServer,
        addr: SocketAddr,
    },
    ServerFailed {
        ticket: Ticket,
        error: String,
    },
    DeviceError {
        kind: DeviceKind,
        message: String,
    },
    /// Local player for `ticket` exited
    PlayerExited(Ticket),
    /// Local player for `ticket` could not be started
    PlayerFailed {
        ticket: Ticket,
        error: String,
    },
    WindowFocus(bool),
    FullscreenChanged(bool),
    WindowMetrics {
        bounds: Bounds,
        work_area: Size,
    },
    Key(KeyEvent),
    Tick,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddTorrent(_) => "addTorrent",
            Action::Seed(_) => "seed",
            Action::DropFiles(_) => "dropFiles",
            Action::OpenPlayer(_) => "openPlayer",
            Action::DeleteTorrent(_) => "deleteTorrent",
            Action::OpenChromecast(_) => "openChromecast",
            Action::OpenAirplay(_) => "openAirplay",
            Action::Back => "back",
            Action::PlayPause => "playPause",
            Action::PlaybackJump(_) => "playbackJump",
            Action::SetDimensions(_) => "setDimensions",
            Action::ToggleFullScreen => "toggleFullScreen",
            Action::Paste => "paste",
            Action::Select(_) => "select",
            Action::Quit => "quit",
            Action::Engine(_) => "engine",
            Action::DeviceFound(_) => "deviceFound",
            Action::ServerListening { .. } => "serverListening",
            Action::ServerFailed { .. } => "serverFailed",
            Action::DeviceError { .. } => "deviceError",
            Action::PlayerExited(_) => "playerExited",
            Action::PlayerFailed { .. } => "playerFailed",
            Action::WindowFocus(_) => "windowFocus",
            Action::FullscreenChanged(_) => "fullscreenChanged",
            Action::WindowMetrics { .. } => "windowMetrics",
            Action::Key(_) => "key",
            Action::Tick => "tick",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddTorrent(id) => write!(f, "addTorrent({:?})", id),
            Action::Seed(files) | Action::DropFiles(files) => {
                write!(f, "{}({} file(s))", self.name(), files.len())
            }
            Action::OpenPlayer(key)
            | Action::DeleteTorrent(key)
            | Action::OpenChromecast(key)
            | Action::OpenAirplay(key) => write!(f, "{}({})", self.name(), key),
            Action::PlaybackJump(t) => write!(f, "playbackJump({})", t),
            Action::SetDimensions(size) => {
                write!(f, "setDimensions({}x{})", size.width, size.height)
            }
            Action::Select(m) => write!(f, "select({:?})", m),
            Action::Engine(event) => write!(f, "engine({:?})", event),
            Action::DeviceFound(device) => {
                write!(f, "deviceFound({} {})", device.kind(), device.name())
            }
            Action::ServerListening { ticket, addr, .. } => {
                write!(f, "serverListening(ticket {}, {})", ticket, addr)
            }
            Action::ServerFailed { ticket, error } => {
                write!(f, "serverFailed(ticket {}, {})", ticket, error)
            }
            Action::DeviceError { kind, message } => {
                write!(f, "deviceError({}: {})", kind, message)
            }
            Action::PlayerExited(ticket) => write!(f, "playerExited(ticket {})", ticket),
            Action::PlayerFailed { ticket, error } => {
                write!(f, "playerFailed(ticket {}, {})", ticket, error)
            }
            Action::WindowFocus(on) | Action::FullscreenChanged(on) => {
                write!(f, "{}({})", self.name(), on)
            }
            Action::WindowMetrics { bounds, work_area } => {
                write!(f, "windowMetrics({:?}, {:?})", bounds, work_area)
            }
            Action::Key(key) => write!(f, "key({:?})", key.code),
            _ => f.write_str(self.name()),
        }
    }
}

/// Asynchronous work requested by a dispatch
pub enum Effect {
    /// Start `server`; report `ServerListening` or `ServerFailed`
    Listen {
        ticket: Ticket,
        server: SharedServer,
    },
    /// Play on a cast device; failures come back as `DeviceError`
    Cast {
        device: Arc<dyn CastReceiver>,
        url: String,
        options: PlayOptions,
    },
    StopCast {
        device: Arc<dyn CastReceiver>,
    },
    /// Launch the local player; its exit comes back as `PlayerExited`
    LaunchPlayer {
        ticket: Ticket,
        url: String,
        title: String,
    },
    StopPlayer,
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Listen { ticket, .. } => write!(f, "Listen(ticket {})", ticket),
            Effect::Cast { device, url, .. } => write!(f, "Cast({} <- {})", device.name(), url),
            Effect::StopCast { device } => write!(f, "StopCast({})", device.name()),
            Effect::LaunchPlayer { ticket, url, .. } => {
                write!(f, "LaunchPlayer(ticket {}, {})", ticket, url)
            }
            Effect::StopPlayer => f.write_str("StopPlayer"),
        }
    }
}

// =============================================================================
// Pure Helpers
// =============================================================================

/// Dock progress: the least-advanced unfinished torrent, or -1 when none
pub fn dock_progress(progress: &[f64]) -> f64 {
    progress
        .iter()
        .copied()
        .filter(|p| *p < 1.0)
        .fold(None, |min: Option<f64>, p| Some(min.map_or(p, |m| m.min(p))))
        .unwrap_or(-1.0)
}

/// Window geometry for a video of `dims`: aspect ratio and centred bounds
/// scaled down to fit the work area, plus the header
pub fn fit_to_work_area(dims: Size, work_area: Option<Size>) -> (f64, Bounds) {
    let aspect_ratio = dims.width as f64 / dims.height as f64;
    let area = work_area.unwrap_or(Size::new(dims.width, dims.height + HEADER_HEIGHT));

    let (w, h) = (dims.width as u64, dims.height as u64);
    let (aw, ah) = (area.width as u64, area.height as u64);
    let (width, height) = if w <= aw && h <= ah {
        (w, h)
    } else if aw * h <= ah * w {
        (aw, h * aw / w)
    } else {
        (w * ah / h, ah)
    };
    let height = height + HEADER_HEIGHT as u64;

    let x = (aw as i64 - width as i64).div_euclid(2) as i32;
    let y = (ah as i64 - height as i64).div_euclid(2) as i32;

    (
        aspect_ratio,
        Bounds {
            x,
            y,
            width: width as u32,
            height: height as u32,
        },
    )
}

/// Map a key press to an action for the current view
pub fn key_action(state: &AppState, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global shortcuts
    match key.code {
        KeyCode::Char('c') if ctrl => return Some(Action::Quit),
        KeyCode::Char('v') if ctrl => return Some(Action::Paste),
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Char('f') => return Some(Action::ToggleFullScreen),
        // ESC means either exit fullscreen or go back
        KeyCode::Esc => {
            return Some(if state.window.fullscreen {
                Action::ToggleFullScreen
            } else {
                Action::Back
            })
        }
        _ => {}
    }

    match state.active_view {
        View::Home => home_key_action(state, key),
        View::Player => player_key_action(state, key),
    }
}

fn home_key_action(state: &AppState, key: KeyEvent) -> Option<Action> {
    let selected = state.selected_torrent().map(|t| t.key());
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Select(Move::Up)),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Select(Move::Down)),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::Select(Move::First)),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Select(Move::Last)),
        KeyCode::Enter | KeyCode::Char('p') => selected.map(Action::OpenPlayer),
        KeyCode::Char('c') => selected.map(Action::OpenChromecast),
        KeyCode::Char('a') => selected.map(Action::OpenAirplay),
        KeyCode::Char('d') | KeyCode::Delete => selected.map(Action::DeleteTorrent),
        KeyCode::Char('v') => Some(Action::Paste),
        _ => None,
    }
}

fn player_key_action(state: &AppState, key: KeyEvent) -> Option<Action> {
    let playing = state.playing_torrent().map(|t| t.key());
    match key.code {
        KeyCode::Char(' ') => Some(Action::PlayPause),
        KeyCode::Left => Some(Action::PlaybackJump(state.video.current_time - JUMP_SECONDS)),
        KeyCode::Right => Some(Action::PlaybackJump(state.video.current_time + JUMP_SECONDS)),
        KeyCode::Char('c') => playing.map(Action::OpenChromecast),
        KeyCode::Char('a') => playing.map(Action::OpenAirplay),
        KeyCode::Backspace => Some(Action::Back),
        _ => None,
    }
}

// =============================================================================
// Store
// =============================================================================

/// Single-writer owner of the application state
pub struct Store {
    pub state: AppState,
    engine: Box<dyn Engine>,
    control: Outbox<ToControl>,
    effects: Vec<Effect>,
    render_requested: bool,
}

impl Store {
    pub fn new(
        engine: Box<dyn Engine>,
        control: Outbox<ToControl>,
        session: SessionManager,
    ) -> Self {
        Self {
            state: AppState::new(session),
            engine,
            control,
            effects: Vec::new(),
            render_requested: false,
        }
    }

    /// Apply `action` to the state, then request a render
    pub fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        self.reduce(action);
        self.update_dock_progress();
        self.render_requested = true;
    }

    /// Effects queued by dispatches since the last call
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Whether a render was requested since the last call
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    fn reduce(&mut self, action: Action) {
        match action {
            Action::AddTorrent(id) => self.add_torrent(&id),
            Action::Seed(files) => self.seed(&files),
            Action::DropFiles(files) => {
                let (torrent_files, rest): (Vec<_>, Vec<_>) =
                    files.into_iter().partition(|f| has_torrent_extension(f));
                for file in torrent_files {
                    self.add_torrent(&file.to_string_lossy());
                }
                self.seed(&rest);
            }
            Action::OpenPlayer(key) => self.open_session(key, Sink::Local),
            Action::OpenChromecast(key) => self.open_device(key, DeviceKind::Chromecast),
            Action::OpenAirplay(key) => self.open_device(key, DeviceKind::Airplay),
            Action::DeleteTorrent(key) => self.delete_torrent(key),
            Action::Back => self.back(),
            Action::PlayPause => {
                self.state.video.paused = !self.state.video.paused;
            }
            Action::PlaybackJump(seconds) => {
                let mut t = seconds.max(0.0);
                if let Some(duration) = self.state.video.duration {
                    t = t.min(duration);
                }
                self.state.video.jump_to = Some(t);
                self.state.video.current_time = t;
            }
            Action::SetDimensions(dims) => self.set_dimensions(dims),
            Action::ToggleFullScreen => self.control.send(ToControl::ToggleFullScreen),
            Action::Paste => self.control.send(ToControl::AddTorrentFromPaste),
            Action::Select(m) => match m {
                Move::Up => self.state.list.up(),
                Move::Down => self.state.list.down(),
                Move::First => self.state.list.first(),
                Move::Last => self.state.list.last(),
            },
            Action::Quit => {
                if self.state.active_view == View::Player {
                    self.back();
                } else {
                    self.close_session();
                }
                self.state.running = false;
            }

            Action::Engine(event) => self.on_engine_event(event),
            Action::DeviceFound(device) => {
                info!("found {} '{}'", device.kind(), device.name());
                self.state.devices.set(device);
            }
            Action::ServerListening {
                ticket,
                server,
                addr,
            } => self.on_server_listening(ticket, server, addr),
            Action::ServerFailed { ticket, error } => {
                if self.state.session.on_listen_failed(ticket) {
                    self.state
                        .set_error(format!("Could not start media server: {}", error));
                    // A failed replacement leaves nothing behind the player view
                    if self.state.active_view == View::Player {
                        self.back();
                    }
                } else {
                    debug!("ignoring stale server failure (ticket {})", ticket);
                }
            }
            Action::DeviceError { kind, message } => {
                self.state.set_warning(format!("{}: {}", kind, message));
            }
            Action::PlayerExited(ticket) => self.on_player_exit(ticket),
            Action::PlayerFailed { ticket, error } => {
                if self.is_local_session(ticket) {
                    self.state.set_error(error);
                }
                self.on_player_exit(ticket);
            }
            Action::WindowFocus(focused) => {
                self.state.window.focused = focused;
                if focused {
                    if self.state.dock.badge > 0 {
                        self.control.send(ToControl::SetBadge(String::new()));
                    }
                    self.state.dock.badge = 0;
                }
            }
            Action::FullscreenChanged(on) => self.state.window.fullscreen = on,
            Action::WindowMetrics { bounds, work_area } => {
                self.state.window.current = Some(bounds);
                self.state.window.work_area = Some(work_area);
            }
            Action::Key(key) => {
                // Clear messages on any keypress
                self.state.clear_messages();
                if let Some(action) = key_action(&self.state, key) {
                    debug!("key {:?} -> {:?}", key.code, action);
                    self.reduce(action);
                }
            }
            Action::Tick => {}
        }
    }

    // -------------------------------------------------------------------------
    // Torrents
    // -------------------------------------------------------------------------

    fn add_torrent(&mut self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        match self.engine.add(id) {
            Ok(torrent) => self.push_torrent(torrent),
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn seed(&mut self, files: &[PathBuf]) {
        if files.is_empty() {
            return;
        }
        match self.engine.seed(files) {
            Ok(torrent) => self.push_torrent(torrent),
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn push_torrent(&mut self, torrent: TorrentRef) {
        if self.state.torrent(torrent.key()).is_some() {
            return;
        }
        self.state.torrents.push(torrent);
        self.state.list.set_len(self.state.torrents.len());
    }

    fn delete_torrent(&mut self, key: TorrentKey) {
        if self.state.session.references(key) {
            if self.state.active_view == View::Player {
                self.back();
            } else {
                self.close_session();
            }
        }
        if let Err(e) = self.engine.remove(key) {
            warn!("engine remove failed: {}", e);
        }
        self.state.torrents.retain(|t| t.key() != key);
        self.state.list.set_len(self.state.torrents.len());
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Done(key) => {
                debug!("torrent {} done", key);
                if !self.state.window.focused {
                    self.state.dock.badge += 1;
                    self.control
                        .send(ToControl::SetBadge(self.state.dock.badge.to_string()));
                }
            }
            EngineEvent::Warning(msg) => warn!("engine warning: {}", msg),
            EngineEvent::Error(msg) => self.state.set_error(msg),
            EngineEvent::InfoHash(_)
            | EngineEvent::Ready(_)
            | EngineEvent::Download(_)
            | EngineEvent::Upload(_) => {}
        }
    }

    fn update_dock_progress(&mut self) {
        let progress: Vec<f64> = self
            .state
            .torrents
            .iter()
            .map(|t| t.status().progress)
            .collect();
        let value = dock_progress(&progress);
        if value != self.state.dock.progress {
            self.state.dock.progress = value;
            self.control.send(ToControl::SetProgress(value));
        }
    }

    // -------------------------------------------------------------------------
    // Playback Sessions
    // -------------------------------------------------------------------------

    fn open_device(&mut self, key: TorrentKey, kind: DeviceKind) {
        if self.state.devices.get(kind).is_none() {
            self.state.set_warning(format!("No {} found", kind));
            return;
        }
        self.open_session(key, Sink::from(kind));
    }

    fn open_session(&mut self, key: TorrentKey, sink: Sink) {
        let Some(torrent) = self.state.torrent(key).cloned() else {
            warn!("open {}: unknown torrent {}", sink, key);
            return;
        };
        match self.state.session.open(torrent, sink) {
            Ok(start) => {
                if let Some(previous) = start.replaced {
                    self.stop_sink(previous);
                }
                self.effects.push(Effect::Listen {
                    ticket: start.ticket,
                    server: start.server,
                });
            }
            Err(e) => self.state.set_error(e.to_string()),
        }
    }

    fn on_server_listening(&mut self, ticket: Ticket, server: SharedServer, addr: SocketAddr) {
        let Some(session) = self.state.session.on_listening(ticket, server, addr) else {
            return;
        };
        let sink = session.sink;
        let name = session.torrent.status().display_name().to_string();
        let local_url = session.local_url.clone();
        let network_url = session.network_url.clone();

        self.state.video = VideoState::default();
        self.state.title = name.clone();
        let entering = self.state.active_view != View::Player;
        self.state.active_view = View::Player;

        match sink.device() {
            None => {
                if entering {
                    self.set_dimensions(DEFAULT_VIDEO_SIZE);
                }
                self.effects.push(Effect::LaunchPlayer {
                    ticket,
                    url: local_url,
                    title: name,
                });
            }
            Some(kind) => match self.state.devices.get(kind).cloned() {
                Some(device) => self.effects.push(Effect::Cast {
                    device,
                    url: network_url,
                    options: PlayOptions {
                        title: format!("{} — {}", APP_TITLE, name),
                    },
                }),
                None => self.state.set_warning(format!("{}: device went away", kind)),
            },
        }
    }

    fn is_local_session(&self, ticket: Ticket) -> bool {
        self.state
            .session
            .session()
            .map(|s| s.ticket == ticket && s.sink == Sink::Local)
            .unwrap_or(false)
    }

    /// The external player went away: leave the player view if it was ours
    fn on_player_exit(&mut self, ticket: Ticket) {
        if self.is_local_session(ticket) && self.state.active_view == View::Player {
            self.back();
        }
    }

    /// Close the session and stop whatever it was playing on
    fn close_session(&mut self) {
        if let Some(sink) = self.state.session.close() {
            self.stop_sink(sink);
        }
        self.state.video = VideoState::default();
    }

    fn stop_sink(&mut self, sink: Sink) {
        match sink.device() {
            None => self.effects.push(Effect::StopPlayer),
            Some(kind) => {
                if let Some(device) = self.state.devices.get(kind).cloned() {
                    self.effects.push(Effect::StopCast { device });
                }
            }
        }
    }

    fn back(&mut self) {
        if self.state.active_view == View::Player {
            self.restore_bounds();
            self.close_session();
        }
        self.state.active_view = View::Home;
        self.state.title = APP_TITLE.to_string();
    }

    // -------------------------------------------------------------------------
    // Window
    // -------------------------------------------------------------------------

    fn set_dimensions(&mut self, dims: Size) {
        if dims.width == 0 || dims.height == 0 {
            return;
        }
        if self.state.window.saved_bounds.is_none() {
            self.state.window.saved_bounds = self.state.window.current;
        }

        let (aspect_ratio, bounds) = fit_to_work_area(dims, self.state.window.work_area);
        self.control.send(ToControl::SetAspectRatio {
            ratio: aspect_ratio,
            extra_size: Size::new(0, HEADER_HEIGHT),
        });
        self.control.send(ToControl::SetBounds(bounds));
    }

    fn restore_bounds(&mut self) {
        self.control.send(ToControl::SetAspectRatio {
            ratio: 0.0,
            extra_size: Size::default(),
        });
        if let Some(bounds) = self.state.window.saved_bounds.take() {
            self.control.send(ToControl::SetBounds(bounds));
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("effects", &self.effects)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
