//! Playback session manager
//!
//! Owns the single playback session and its ephemeral media server:
//!
//! ```text
//! Idle --open--> StartingServer --on_listening--> Active(sink)
//!   ^                 |                              |
//!   +--on_listen_failed / close----------------------+
//! ```
//!
//! Server start is asynchronous. `open` hands the new server to the caller
//! together with a ticket; the caller starts it and reports back with
//! `on_listening` or `on_listen_failed`. The manager keeps its own handle to
//! a starting server, so superseding or closing a pending session destroys
//! that server at once, before any new one is created. Only the most recent
//! ticket is honoured; a late completion for an older one leaves the state
//! alone.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{FileInfo, Sink, TorrentKey};
use crate::stream::engine::TorrentRef;
use crate::stream::server::SharedServer;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("torrent has no files to play yet")]
    NoFiles,
}

/// Identifies one pending server start
pub type Ticket = u64;

/// A server to start on behalf of `open`
#[derive(Debug)]
pub struct StartServer {
    pub ticket: Ticket,
    pub server: SharedServer,
    /// Sink of the session this open closed, if one was active
    pub replaced: Option<Sink>,
}

/// Session waiting for its server to listen
#[derive(Debug, Clone)]
pub struct PendingSession {
    pub ticket: Ticket,
    pub torrent: TorrentRef,
    pub file_index: usize,
    pub sink: Sink,
    server: SharedServer,
}

/// A live session: server listening, sink playing or about to
#[derive(Debug)]
pub struct PlaybackSession {
    pub ticket: Ticket,
    pub torrent: TorrentRef,
    pub file_index: usize,
    pub local_url: String,
    pub network_url: String,
    pub sink: Sink,
    server: SharedServer,
}

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Idle,
    StartingServer(PendingSession),
    Active(PlaybackSession),
}

/// Index of the largest file, the first one on ties
pub fn largest_file(files: &[FileInfo]) -> Option<usize> {
    files
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, u64)>, (i, f)| match best {
            Some((_, len)) if len >= f.length => best,
            _ => Some((i, f.length)),
        })
        .map(|(i, _)| i)
}

#[derive(Debug)]
pub struct SessionManager {
    state: SessionState,
    next_ticket: Ticket,
    network_host: IpAddr,
}

impl SessionManager {
    /// `network_host` is the LAN address advertised to cast receivers
    pub fn new(network_host: IpAddr) -> Self {
        Self {
            state: SessionState::Idle,
            next_ticket: 1,
            network_host,
        }
    }

    /// Use the machine's LAN address, falling back to loopback
    pub fn detect() -> Self {
        let host = match local_ip_address::local_ip() {
            Ok(ip) => ip,
            Err(e) => {
                warn!("no LAN address ({}), cast receivers will not reach us", e);
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
        };
        Self::new(host)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingSession> {
        match &self.state {
            SessionState::StartingServer(pending) => Some(pending),
            _ => None,
        }
    }

    /// Sink of the active or pending session
    pub fn sink(&self) -> Option<Sink> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::StartingServer(pending) => Some(pending.sink),
            SessionState::Active(session) => Some(session.sink),
        }
    }

    /// Whether the active or pending session plays `key`
    pub fn references(&self, key: TorrentKey) -> bool {
        match &self.state {
            SessionState::Idle => false,
            SessionState::StartingServer(pending) => pending.torrent.key() == key,
            SessionState::Active(session) => session.torrent.key() == key,
        }
    }

    pub fn open_local(&mut self, torrent: TorrentRef) -> Result<StartServer, SessionError> {
        self.open(torrent, Sink::Local)
    }

    /// Begin a session on the torrent's largest file.
    ///
    /// Any current session is closed first, so its server is gone before the
    /// new one is created. On `NoFiles` nothing changes.
    pub fn open(&mut self, torrent: TorrentRef, sink: Sink) -> Result<StartServer, SessionError> {
        let status = torrent.status();
        let file_index = largest_file(&status.files).ok_or(SessionError::NoFiles)?;

        let replaced = self.close();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let server = torrent.create_server();
        info!(
            "opening {} file {} on {} (ticket {})",
            status.display_name(),
            file_index,
            sink,
            ticket
        );
        self.state = SessionState::StartingServer(PendingSession {
            ticket,
            torrent,
            file_index,
            sink,
            server: server.clone(),
        });
        Ok(StartServer {
            ticket,
            server,
            replaced,
        })
    }

    /// Server for `ticket` is listening on `addr`.
    ///
    /// Returns the now-active session, or None when the ticket is stale (the
    /// server is destroyed then).
    pub fn on_listening(
        &mut self,
        ticket: Ticket,
        server: SharedServer,
        addr: SocketAddr,
    ) -> Option<&PlaybackSession> {
        let pending = match std::mem::take(&mut self.state) {
            SessionState::StartingServer(pending) if pending.ticket == ticket => pending,
            other => {
                self.state = other;
                debug!("stale server for ticket {}, destroying", ticket);
                server.destroy();
                return None;
            }
        };

        let port = addr.port();
        let session = PlaybackSession {
            local_url: format!("http://localhost:{}/{}", port, pending.file_index),
            network_url: format!(
                "http://{}/{}",
                SocketAddr::new(self.network_host, port),
                pending.file_index
            ),
            ticket,
            torrent: pending.torrent,
            file_index: pending.file_index,
            sink: pending.sink,
            server,
        };
        info!("session active on {}: {}", session.sink, session.local_url);
        self.state = SessionState::Active(session);
        self.session()
    }

    /// Server for `ticket` failed to bind. Returns whether it was current.
    pub fn on_listen_failed(&mut self, ticket: Ticket) -> bool {
        let current = matches!(
            &self.state,
            SessionState::StartingServer(pending) if pending.ticket == ticket
        );
        if current {
            if let SessionState::StartingServer(pending) = std::mem::take(&mut self.state) {
                pending.server.destroy();
            }
        }
        current
    }

    /// End the session, destroying its server (also one still starting).
    /// Idempotent.
    ///
    /// Returns the sink that was playing, if a session was active.
    pub fn close(&mut self) -> Option<Sink> {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => None,
            SessionState::StartingServer(pending) => {
                pending.server.destroy();
                debug!("cancelled pending session (ticket {})", pending.ticket);
                None
            }
            SessionState::Active(session) => {
                session.server.destroy();
                info!("session on {} closed", session.sink);
                Some(session.sink)
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}
