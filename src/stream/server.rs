//! Ephemeral media server
//!
//! Each playback session owns one short-lived HTTP server that exposes the
//! torrent's files by index (`GET /0`, `GET /1/name.mkv`, ...). Byte ranges,
//! `416` and content types come from `ServeFile`, so local players and cast
//! receivers can seek into partial content.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Errors from the media server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("server is already listening on {0}")]
    AlreadyListening(SocketAddr),
    #[error("server was destroyed")]
    Destroyed,
}

/// Server created by a torrent for one playback session.
///
/// Shared between the session that owns it and the task starting it, so
/// `destroy` can land while `listen` is still in flight; a server destroyed
/// mid-bind releases the port and `listen` reports `Destroyed`.
#[async_trait]
pub trait MediaServer: Send + Sync + fmt::Debug {
    /// Start accepting connections (port 0 = OS-assigned)
    async fn listen(&self, port: u16) -> Result<SocketAddr, ServerError>;

    /// Stop accepting connections. Idempotent.
    fn destroy(&self);
}

/// Handle held by the session and the task starting the server
pub type SharedServer = Arc<dyn MediaServer>;

// =============================================================================
// HTTP File Server
// =============================================================================

/// Serves a torrent's files over HTTP
pub struct HttpFileServer {
    files: Vec<PathBuf>,
    state: Mutex<Lifecycle>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HttpFileServer {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            state: Mutex::new(Lifecycle::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, Lifecycle> {
        // The lifecycle has no invariant a panicking holder could break
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Address once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state().addr
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }
}

impl fmt::Debug for HttpFileServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("HttpFileServer")
            .field("files", &self.files.len())
            .field("addr", &state.addr)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

/// `/{index}` and `/{index}/{name}` for every file; anything else is a 404
pub fn router(files: &[PathBuf]) -> Router {
    files
        .iter()
        .enumerate()
        .fold(Router::new(), |router, (index, path)| {
            router
                .route_service(&format!("/{index}"), ServeFile::new(path))
                .route_service(&format!("/{index}/{{*name}}"), ServeFile::new(path))
        })
        .layer(TraceLayer::new_for_http())
}

#[async_trait]
impl MediaServer for HttpFileServer {
    async fn listen(&self, port: u16) -> Result<SocketAddr, ServerError> {
        {
            let state = self.state();
            if state.destroyed {
                return Err(ServerError::Destroyed);
            }
            if let Some(addr) = state.addr {
                return Err(ServerError::AlreadyListening(addr));
            }
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { port, source })?;

        let mut state = self.state();
        if state.destroyed {
            debug!("media server destroyed while binding {}", addr);
            return Err(ServerError::Destroyed);
        }
        if let Some(existing) = state.addr {
            return Err(ServerError::AlreadyListening(existing));
        }

        info!("media server listening on {}", addr);
        let app = router(&self.files);
        state.addr = Some(addr);
        state.task = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("media server on {} stopped: {}", addr, e);
            }
        }));
        Ok(addr)
    }

    fn destroy(&self) {
        let mut state = self.state();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        // Aborting the serve future drops the listener
        if let Some(task) = state.task.take() {
            task.abort();
        }
        if let Some(addr) = state.addr {
            info!("media server on {} destroyed", addr);
        }
    }
}

impl Drop for HttpFileServer {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }
}
