//! seedcast - stream torrents to a local player or a Chromecast
//!
//! Two cooperating tasks share nothing but a message channel: the control
//! process owns the window, dock and clipboard; the logic process owns the
//! application state, the playback session and the view.
//!
//! # Modules
//!
//! - `bitfield` - piece bitmap and interval compression for the loading bar
//! - `throttle` - leading + trailing render throttle
//! - `ui` - view tree, reconciler and terminal surface
//! - `ipc` - named-message channel between the two processes
//! - `stream` - engine, media server, playback sessions, cast and local player
//! - `app` - application state and the store
//! - `control` - the control process
//! - `runtime` - the logic process event loop

pub mod app;
pub mod bitfield;
pub mod cli;
pub mod config;
pub mod control;
pub mod ipc;
pub mod models;
pub mod runtime;
pub mod stream;
pub mod throttle;
pub mod ui;

// Re-export commonly used types
pub use app::{Action, AppState, Effect, Store, View};
pub use bitfield::{compress, Bitfield, Interval};
pub use config::{Config, RenderProfile};
pub use control::{ControlProcess, Platform, TerminalPlatform};
pub use ipc::{link, ChannelError, ToControl, ToLogic};
pub use models::{Bounds, DeviceKind, FileInfo, Sink, Size, TorrentKey, TorrentStatus};
pub use runtime::LogicProcess;
pub use throttle::{Schedule, Throttle};
