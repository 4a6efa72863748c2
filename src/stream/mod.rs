//! Streaming infrastructure
//!
//! - Engine: torrent handles and engine events
//! - Server: ephemeral HTTP media server per playback session
//! - Session: playback session state machine
//! - Cast: Chromecast discovery and control via catt
//! - Player: local VLC/mpv playback

pub mod cast;
pub mod engine;
pub mod player;
pub mod server;
pub mod session;

pub use cast::{CastError, CastReceiver, CattReceiver, PlayOptions};
pub use engine::{Engine, EngineError, EngineEvent, LocalEngine, Torrent, TorrentRef};
pub use player::{LocalPlayer, PlayerError, PlayerType};
pub use server::{HttpFileServer, MediaServer, ServerError, SharedServer};
pub use session::{PlaybackSession, SessionError, SessionManager, SessionState, StartServer, Ticket};
