//! Engine interface
//!
//! The peer-to-peer engine owns torrents; the core holds shared handles and
//! reads status snapshots. Engine activity is reported as `EngineEvent`s on
//! an mpsc channel.
//!
//! `LocalEngine` is the in-process engine shipped with the binary: it seeds
//! local files (complete from the start) and registers remote identifiers as
//! pending torrents that never receive metadata.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use regex::Regex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bitfield::Bitfield;
use crate::models::{FileInfo, TorrentKey, TorrentStatus};
use crate::stream::server::{HttpFileServer, SharedServer};

/// Piece size used for local seeds
pub const PIECE_LENGTH: u64 = 256 * 1024;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid torrent identifier: {0}")]
    InvalidId(String),
    #[error("cannot add duplicate torrent {0}")]
    Duplicate(String),
    #[error("nothing to seed")]
    EmptySelection,
    #[error("no such torrent: {0}")]
    NotFound(TorrentKey),
}

/// Engine activity
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    InfoHash(TorrentKey),
    /// Metadata received; files are known
    Ready(TorrentKey),
    Done(TorrentKey),
    Download(TorrentKey),
    Upload(TorrentKey),
    /// Recoverable problem, logged only
    Warning(String),
    Error(String),
}

/// Engine-owned torrent
pub trait Torrent: Send + Sync + fmt::Debug {
    fn key(&self) -> TorrentKey;
    fn status(&self) -> TorrentStatus;
    /// New, not yet listening, server for this torrent's files
    fn create_server(&self) -> SharedServer;
}

/// Shared handle to an engine torrent
pub type TorrentRef = Arc<dyn Torrent>;

pub trait Engine: Send {
    /// Add a content identifier (magnet link, info hash, .torrent path)
    fn add(&mut self, id: &str) -> Result<TorrentRef, EngineError>;
    /// Seed a selection of local files/folders
    fn seed(&mut self, files: &[PathBuf]) -> Result<TorrentRef, EngineError>;
    fn remove(&mut self, key: TorrentKey) -> Result<(), EngineError>;
}

// =============================================================================
// Identifier Parsing
// =============================================================================

/// What an `add` identifier refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub info_hash: Option<String>,
    pub name: Option<String>,
}

/// Parse a magnet link, a bare info hash or a .torrent path
pub fn parse_torrent_id(id: &str) -> Result<ParsedId, EngineError> {
    let id = id.trim();

    if id.starts_with("magnet:") {
        let hash_re = Regex::new(r"(?i)xt=urn:btih:([0-9a-z]{32,40})")
            .map_err(|_| EngineError::InvalidId(id.to_string()))?;
        let name_re =
            Regex::new(r"[?&]dn=([^&]+)").map_err(|_| EngineError::InvalidId(id.to_string()))?;

        let info_hash = hash_re
            .captures(id)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
            .ok_or_else(|| EngineError::InvalidId(id.to_string()))?;
        let name = name_re.captures(id).and_then(|c| c.get(1)).map(|m| {
            let raw = m.as_str().replace('+', " ");
            urlencoding::decode(&raw)
                .map(|s| s.into_owned())
                .unwrap_or(raw)
        });
        return Ok(ParsedId {
            info_hash: Some(info_hash),
            name,
        });
    }

    if id.len() == 40 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(ParsedId {
            info_hash: Some(id.to_ascii_lowercase()),
            name: None,
        });
    }

    let path = Path::new(id);
    if has_torrent_extension(path) {
        return Ok(ParsedId {
            info_hash: None,
            name: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
        });
    }

    Err(EngineError::InvalidId(id.to_string()))
}

/// `.torrent` extension, case-insensitive
pub fn has_torrent_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("torrent"))
        .unwrap_or(false)
}

// =============================================================================
// Local Engine
// =============================================================================

/// Torrent held by `LocalEngine`
pub struct LocalTorrent {
    key: TorrentKey,
    paths: Mutex<Vec<PathBuf>>,
    status: Mutex<TorrentStatus>,
}

impl LocalTorrent {
    fn new(status: TorrentStatus) -> Self {
        Self {
            key: TorrentKey::new(),
            paths: Mutex::new(Vec::new()),
            status: Mutex::new(status),
        }
    }

    fn status_mut(&self) -> MutexGuard<'_, TorrentStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl fmt::Debug for LocalTorrent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTorrent")
            .field("key", &self.key)
            .field("name", &self.status_mut().name)
            .finish()
    }
}

impl Torrent for LocalTorrent {
    fn key(&self) -> TorrentKey {
        self.key
    }

    fn status(&self) -> TorrentStatus {
        self.status_mut().clone()
    }

    fn create_server(&self) -> SharedServer {
        Arc::new(HttpFileServer::new(self.paths()))
    }
}

/// In-process engine for local seeding
pub struct LocalEngine {
    torrents: HashMap<TorrentKey, Arc<LocalTorrent>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl LocalEngine {
    pub fn new(events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            torrents: HashMap::new(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }

    fn emit(&self, event: EngineEvent) {
        // Receiver gone means the runtime is shutting down
        let _ = self.events.send(event);
    }

    fn find_hash(&self, info_hash: &str) -> bool {
        self.torrents
            .values()
            .any(|t| t.status_mut().info_hash.as_deref() == Some(info_hash))
    }
}

impl fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEngine")
            .field("torrents", &self.torrents.len())
            .finish()
    }
}

impl Engine for LocalEngine {
    fn add(&mut self, id: &str) -> Result<TorrentRef, EngineError> {
        let parsed = parse_torrent_id(id)?;
        if let Some(hash) = &parsed.info_hash {
            if self.find_hash(hash) {
                return Err(EngineError::Duplicate(hash.clone()));
            }
        }

        let torrent = Arc::new(LocalTorrent::new(TorrentStatus {
            name: parsed.name.clone(),
            info_hash: parsed.info_hash.clone(),
            ..TorrentStatus::default()
        }));
        let key = torrent.key;
        info!("added torrent {} ({:?})", key, parsed.info_hash);
        self.torrents.insert(key, torrent.clone());

        if parsed.info_hash.is_some() {
            self.emit(EngineEvent::InfoHash(key));
        }
        self.emit(EngineEvent::Warning(format!(
            "{}: no peer connections available, waiting for metadata",
            parsed.name.as_deref().unwrap_or(id.trim())
        )));
        Ok(torrent)
    }

    fn seed(&mut self, files: &[PathBuf]) -> Result<TorrentRef, EngineError> {
        if files.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let name = match files {
            [single] => single
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| single.display().to_string()),
            many => format!("{} files", many.len()),
        };
        let torrent = Arc::new(LocalTorrent::new(TorrentStatus {
            name: Some(name),
            info_hash: Some(local_seed_id()),
            ..TorrentStatus::default()
        }));
        let key = torrent.key;
        info!("seeding {} path(s) as {}", files.len(), key);
        self.torrents.insert(key, torrent.clone());
        self.emit(EngineEvent::InfoHash(key));

        let events = self.events.clone();
        let scanning = torrent.clone();
        let selection = files.to_vec();
        tokio::spawn(async move {
            match scan_files(&selection).await {
                Ok(found) if !found.is_empty() => {
                    mark_seeded(&scanning, found);
                    let _ = events.send(EngineEvent::Ready(key));
                    let _ = events.send(EngineEvent::Done(key));
                }
                Ok(_) => {
                    let _ = events.send(EngineEvent::Error(format!(
                        "{}: no files to seed",
                        scanning.status_mut().display_name()
                    )));
                }
                Err(e) => {
                    let _ = events.send(EngineEvent::Error(format!("cannot seed: {}", e)));
                }
            }
        });

        Ok(torrent)
    }

    fn remove(&mut self, key: TorrentKey) -> Result<(), EngineError> {
        if self.torrents.remove(&key).is_none() {
            return Err(EngineError::NotFound(key));
        }
        debug!("removed torrent {}", key);
        Ok(())
    }
}

/// Local seeds are not hashed; they get a random 32-hex identifier instead
fn local_seed_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn mark_seeded(torrent: &LocalTorrent, found: Vec<(PathBuf, FileInfo)>) {
    let (paths, files): (Vec<_>, Vec<_>) = found.into_iter().unzip();
    let length: u64 = files.iter().map(|f| f.length).sum();
    let pieces = length.div_ceil(PIECE_LENGTH) as usize;

    *torrent
        .paths
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = paths;

    let mut status = torrent.status_mut();
    status.files = files;
    status.length = length;
    status.downloaded = length;
    status.progress = 1.0;
    status.ready = true;
    status.bitfield = Bitfield::full(pieces);
}

/// Expand a selection into files, walking folders depth-first in name order
async fn scan_files(selection: &[PathBuf]) -> std::io::Result<Vec<(PathBuf, FileInfo)>> {
    let mut found = Vec::new();
    let mut stack: Vec<(PathBuf, String)> = selection
        .iter()
        .rev()
        .map(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (p.clone(), name)
        })
        .collect();

    while let Some((path, name)) = stack.pop() {
        let meta = tokio::fs::metadata(&path).await?;
        if meta.is_dir() {
            let mut entries = Vec::new();
            let mut dir = tokio::fs::read_dir(&path).await?;
            while let Some(entry) = dir.next_entry().await? {
                entries.push(entry.path());
            }
            entries.sort();
            for entry in entries.into_iter().rev() {
                let child = entry
                    .file_name()
                    .map(|n| format!("{}/{}", name, n.to_string_lossy()))
                    .unwrap_or_else(|| name.clone());
                stack.push((entry, child));
            }
        } else if meta.is_file() {
            found.push((path, FileInfo::new(name, meta.len())));
        } else {
            warn!("skipping {}: not a regular file", path.display());
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_magnet() {
        let parsed = parse_torrent_id(
            "magnet:?xt=urn:btih:DD8255ECDC7CA55FB0BBF81323D87062DB1F6D1C&dn=Big+Buck%20Bunny&tr=udp%3A%2F%2Fexplodie.org",
        )
        .unwrap();
        assert_eq!(
            parsed.info_hash.as_deref(),
            Some("dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c")
        );
        assert_eq!(parsed.name.as_deref(), Some("Big Buck Bunny"));
    }

    #[test]
    fn test_parse_bare_hash_and_torrent_file() {
        let parsed = parse_torrent_id("dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c").unwrap();
        assert!(parsed.name.is_none());
        assert!(parsed.info_hash.is_some());

        let parsed = parse_torrent_id("/tmp/Sintel.TORRENT").unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Sintel"));
        assert!(parsed.info_hash.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_torrent_id("hello world"),
            Err(EngineError::InvalidId(_))
        ));
        assert!(parse_torrent_id("magnet:?dn=nohash").is_err());
    }

    #[tokio::test]
    async fn test_add_magnet_is_pending_and_rejects_duplicates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx);
        let magnet = "magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c&dn=Sintel";

        let torrent = engine.add(magnet).unwrap();
        let status = torrent.status();
        assert!(!status.ready);
        assert_eq!(status.display_name(), "Sintel");
        assert_eq!(rx.recv().await, Some(EngineEvent::InfoHash(torrent.key())));
        assert!(matches!(rx.recv().await, Some(EngineEvent::Warning(_))));

        assert!(matches!(engine.add(magnet), Err(EngineError::Duplicate(_))));
        assert_eq!(engine.len(), 1);

        engine.remove(torrent.key()).unwrap();
        assert!(engine.is_empty());
        assert!(matches!(
            engine.remove(torrent.key()),
            Err(EngineError::NotFound(_))
        ));
    }
}
