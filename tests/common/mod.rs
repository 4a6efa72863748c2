//! Test doubles shared by the integration tests
//!
//! Each test file is its own crate and uses a different subset of these.
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use seedcast::app::Store;
use seedcast::bitfield::Bitfield;
use seedcast::control::{Platform, PlatformError};
use seedcast::ipc::{self, Inbox, ToControl};
use seedcast::models::{Bounds, DeviceKind, FileInfo, Size, TorrentKey, TorrentStatus};
use seedcast::stream::cast::{CastError, CastReceiver, PlayOptions};
use seedcast::stream::engine::{Engine, EngineError, Torrent, TorrentRef};
use seedcast::stream::server::{MediaServer, ServerError, SharedServer};
use seedcast::stream::session::SessionManager;

// =============================================================================
// Servers
// =============================================================================

/// Shared record of every fake server: lifecycle log and live count
#[derive(Debug, Clone, Default)]
pub struct ServerLog {
    events: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl ServerLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Servers created and not yet destroyed
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of servers alive at the same time
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn create(&self, fail: bool) -> FakeServer {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        self.record(format!("create {}", id));
        FakeServer {
            id,
            log: self.clone(),
            fail,
            destroyed: AtomicBool::new(false),
        }
    }
}

static NEXT_PORT: AtomicU16 = AtomicU16::new(40000);

#[derive(Debug)]
pub struct FakeServer {
    pub id: usize,
    log: ServerLog,
    fail: bool,
    destroyed: AtomicBool,
}

#[async_trait]
impl MediaServer for FakeServer {
    async fn listen(&self, port: u16) -> Result<SocketAddr, ServerError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(ServerError::Destroyed);
        }
        if self.fail {
            return Err(ServerError::Bind {
                port,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
            });
        }
        let port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
        Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    fn destroy(&self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            self.log.live.fetch_sub(1, Ordering::SeqCst);
            self.log.record(format!("destroy {}", self.id));
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

#[derive(Debug)]
pub struct FakeTorrent {
    key: TorrentKey,
    status: Mutex<TorrentStatus>,
    servers: ServerLog,
    pub fail_listen: bool,
}

impl FakeTorrent {
    /// Ready, complete torrent with files of the given lengths
    pub fn new(name: &str, lengths: &[u64], servers: ServerLog) -> Self {
        let files: Vec<FileInfo> = lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| FileInfo::new(format!("{}-{}.mp4", name, i), len))
            .collect();
        Self {
            key: TorrentKey::new(),
            status: Mutex::new(TorrentStatus {
                name: Some(name.to_string()),
                progress: 1.0,
                length: lengths.iter().sum(),
                downloaded: lengths.iter().sum(),
                ready: !files.is_empty(),
                files,
                bitfield: Bitfield::full(4),
                ..TorrentStatus::default()
            }),
            servers,
            fail_listen: false,
        }
    }

    pub fn set_progress(&self, progress: f64) {
        self.status.lock().unwrap().progress = progress;
    }
}

impl Torrent for FakeTorrent {
    fn key(&self) -> TorrentKey {
        self.key
    }

    fn status(&self) -> TorrentStatus {
        self.status.lock().unwrap().clone()
    }

    fn create_server(&self) -> SharedServer {
        Arc::new(self.servers.create(self.fail_listen))
    }
}

/// What the fake engine was asked to do
#[derive(Debug, Clone, Default)]
pub struct EngineLog {
    pub added: Arc<Mutex<Vec<String>>>,
    pub seeded: Arc<Mutex<Vec<Vec<PathBuf>>>>,
    pub removed: Arc<Mutex<Vec<TorrentKey>>>,
    pub torrents: Arc<Mutex<Vec<Arc<FakeTorrent>>>>,
}

impl EngineLog {
    pub fn torrent(&self, index: usize) -> Arc<FakeTorrent> {
        self.torrents.lock().unwrap()[index].clone()
    }

    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    pub fn seeded(&self) -> Vec<Vec<PathBuf>> {
        self.seeded.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<TorrentKey> {
        self.removed.lock().unwrap().clone()
    }
}

/// Engine whose torrents are complete immediately.
///
/// Identifiers starting with `empty` have no files, `bad` is rejected and
/// `unbindable` gets servers that fail to listen.
#[derive(Debug, Default)]
pub struct FakeEngine {
    pub log: EngineLog,
    pub servers: ServerLog,
}

impl FakeEngine {
    fn register(&mut self, torrent: FakeTorrent) -> TorrentRef {
        let torrent = Arc::new(torrent);
        self.log.torrents.lock().unwrap().push(torrent.clone());
        torrent
    }
}

impl Engine for FakeEngine {
    fn add(&mut self, id: &str) -> Result<TorrentRef, EngineError> {
        self.log.added.lock().unwrap().push(id.to_string());
        if id == "bad" {
            return Err(EngineError::InvalidId(id.to_string()));
        }
        let lengths: &[u64] = if id.starts_with("empty") { &[] } else { &[10, 50, 50, 5] };
        let mut torrent = FakeTorrent::new(id, lengths, self.servers.clone());
        torrent.fail_listen = id == "unbindable";
        Ok(self.register(torrent))
    }

    fn seed(&mut self, files: &[PathBuf]) -> Result<TorrentRef, EngineError> {
        if files.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        self.log.seeded.lock().unwrap().push(files.to_vec());
        let torrent = FakeTorrent::new("seed", &[100], self.servers.clone());
        Ok(self.register(torrent))
    }

    fn remove(&mut self, key: TorrentKey) -> Result<(), EngineError> {
        self.log.removed.lock().unwrap().push(key);
        Ok(())
    }
}

// =============================================================================
// Cast Receivers
// =============================================================================

#[derive(Debug)]
pub struct FakeReceiver {
    kind: DeviceKind,
    name: String,
    pub plays: Mutex<Vec<(String, PlayOptions)>>,
    pub stops: AtomicUsize,
    /// "play <url>" and "stop" in the order the device carried them out
    pub commands: Mutex<Vec<String>>,
    fail: Option<String>,
    stop_delay: Option<Duration>,
}

impl FakeReceiver {
    fn build(
        kind: DeviceKind,
        name: &str,
        fail: Option<&str>,
        stop_delay: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            name: name.to_string(),
            plays: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            fail: fail.map(str::to_string),
            stop_delay,
        })
    }

    pub fn new(kind: DeviceKind, name: &str) -> Arc<Self> {
        Self::build(kind, name, None, None)
    }

    /// Receiver whose `play` always fails with `message`
    pub fn failing(kind: DeviceKind, name: &str, message: &str) -> Arc<Self> {
        Self::build(kind, name, Some(message), None)
    }

    /// Receiver that takes `delay` to stop playback
    pub fn slow_to_stop(kind: DeviceKind, name: &str, delay: Duration) -> Arc<Self> {
        Self::build(kind, name, None, Some(delay))
    }

    pub fn plays(&self) -> Vec<(String, PlayOptions)> {
        self.plays.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CastReceiver for FakeReceiver {
    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn play(&self, url: &str, options: &PlayOptions) -> Result<(), CastError> {
        self.plays.lock().unwrap().push((url.to_string(), options.clone()));
        self.commands.lock().unwrap().push(format!("play {}", url));
        match &self.fail {
            Some(message) => Err(CastError::CommandFailed {
                action: "cast".into(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), CastError> {
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push("stop".to_string());
        Ok(())
    }
}

// =============================================================================
// Platform
// =============================================================================

/// Records every platform call
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub clipboard: Option<String>,
    pub broken: bool,
    pub work_area: Size,
}

impl FakePlatform {
    pub fn new(clipboard: Option<&str>) -> Self {
        Self {
            calls: Arc::default(),
            clipboard: clipboard.map(str::to_string),
            broken: false,
            work_area: Size::new(1920, 1080),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&mut self, call: String) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(call);
        if self.broken {
            Err(PlatformError::Io(std::io::Error::other("window is gone")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), PlatformError> {
        self.record(format!("bounds {}x{}", bounds.width, bounds.height))
    }

    fn set_aspect_ratio(&mut self, ratio: f64, _extra_size: Size) -> Result<(), PlatformError> {
        self.record(format!("aspect {}", ratio))
    }

    fn set_badge(&mut self, text: &str) -> Result<(), PlatformError> {
        self.record(format!("badge {}", text))
    }

    fn set_progress(&mut self, value: f64) -> Result<(), PlatformError> {
        self.record(format!("progress {}", value))
    }

    fn set_fullscreen(&mut self, on: bool) -> Result<(), PlatformError> {
        self.record(format!("fullscreen {}", on))
    }

    async fn read_clipboard(&mut self) -> Result<String, PlatformError> {
        self.clipboard.clone().ok_or(PlatformError::ClipboardUnavailable)
    }

    fn work_area(&self) -> Size {
        self.work_area
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store over a fake engine, with the control end of its channel
pub fn store() -> (Store, Inbox<ToControl>, EngineLog, ServerLog) {
    let engine = FakeEngine::default();
    let log = engine.log.clone();
    let servers = engine.servers.clone();
    let (outbox, inbox) = ipc::channel::<ToControl>();
    let store = Store::new(Box::new(engine), outbox, SessionManager::default());
    (store, inbox, log, servers)
}
