//! Cross-process channel
//!
//! Fire-and-forget named messages between the control process (window,
//! dock, clipboard) and the logic process (torrents, sessions, view).
//!
//! # Wire format
//!
//! Every frame is a JSON array: the message name followed by its positional
//! arguments.
//!
//! ```text
//! ["setBounds", {"x": 10, "y": 20, "width": 800, "height": 488}]
//! ["setAspectRatio", 1.7777, {"width": 0, "height": 38}]
//! ["setBadge", "3"]
//! ["setProgress", 0.4]
//! ["addTorrent", "magnet:?xt=urn:btih:..."]
//! ["seed", ["/home/me/video.mp4"]]
//! ["addTorrentFromPaste"]
//! ```
//!
//! Delivery is ordered per direction and at-most-once. There are no replies
//! and no backpressure; a sender never learns whether a frame arrived.

use std::marker::PhantomData;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{Bounds, Size};

/// Errors decoding a frame
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame must be a non-empty array starting with a message name")]
    Malformed,
    #[error("unknown message '{0}'")]
    UnknownMessage(String),
    #[error("message '{name}' is missing argument {index}")]
    MissingArgument { name: &'static str, index: usize },
    #[error("message '{name}' has an invalid argument {index}: {source}")]
    InvalidArgument {
        name: &'static str,
        index: usize,
        source: serde_json::Error,
    },
}

/// A message that can cross the channel
pub trait Message: Sized {
    /// Wire name of this message
    fn name(&self) -> &'static str;
    /// Positional arguments
    fn args(&self) -> Vec<Value>;
    /// Rebuild a message from its wire name and arguments
    fn decode(name: &str, args: Args) -> Result<Self, ChannelError>;

    /// Encode as a wire frame
    fn encode(&self) -> String {
        let mut frame = Vec::with_capacity(1 + self.args().len());
        frame.push(Value::String(self.name().to_string()));
        frame.extend(self.args());
        Value::Array(frame).to_string()
    }

    /// Decode a wire frame
    fn decode_frame(frame: &str) -> Result<Self, ChannelError> {
        let value: Value = serde_json::from_str(frame)?;
        let Value::Array(mut items) = value else {
            return Err(ChannelError::Malformed);
        };
        if items.is_empty() {
            return Err(ChannelError::Malformed);
        }
        let Value::String(name) = items.remove(0) else {
            return Err(ChannelError::Malformed);
        };
        Self::decode(&name, Args { items })
    }
}

/// Positional arguments of a received frame
#[derive(Debug, Default)]
pub struct Args {
    items: Vec<Value>,
}

impl Args {
    /// Required argument `index`
    pub fn get<T: DeserializeOwned>(
        &self,
        name: &'static str,
        index: usize,
    ) -> Result<T, ChannelError> {
        let value = self
            .items
            .get(index)
            .ok_or(ChannelError::MissingArgument { name, index })?;
        serde_json::from_value(value.clone())
            .map_err(|source| ChannelError::InvalidArgument { name, index, source })
    }

    /// Optional argument `index` (absent or null reads as None)
    pub fn opt<T: DeserializeOwned>(
        &self,
        name: &'static str,
        index: usize,
    ) -> Result<Option<T>, ChannelError> {
        match self.items.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name, index).map(Some),
        }
    }
}

fn arg<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// =============================================================================
// Logic -> Control
// =============================================================================

/// Requests from the logic process to the window owner
#[derive(Debug, Clone, PartialEq)]
pub enum ToControl {
    /// Resize/reposition the main window
    SetBounds(Bounds),
    /// Constrain the aspect ratio; a ratio of 0 clears the constraint
    SetAspectRatio { ratio: f64, extra_size: Size },
    /// Dock/taskbar badge text (empty clears)
    SetBadge(String),
    /// OS progress indicator: <0 hides, >1 indeterminate
    SetProgress(f64),
    /// Read the clipboard and send back one `addTorrent` per line
    AddTorrentFromPaste,
    ToggleFullScreen,
}

impl Message for ToControl {
    fn name(&self) -> &'static str {
        match self {
            ToControl::SetBounds(_) => "setBounds",
            ToControl::SetAspectRatio { .. } => "setAspectRatio",
            ToControl::SetBadge(_) => "setBadge",
            ToControl::SetProgress(_) => "setProgress",
            ToControl::AddTorrentFromPaste => "addTorrentFromPaste",
            ToControl::ToggleFullScreen => "toggleFullScreen",
        }
    }

    fn args(&self) -> Vec<Value> {
        match self {
            ToControl::SetBounds(bounds) => vec![arg(bounds)],
            ToControl::SetAspectRatio { ratio, extra_size } => vec![arg(ratio), arg(extra_size)],
            ToControl::SetBadge(text) => vec![arg(text)],
            ToControl::SetProgress(value) => vec![arg(value)],
            ToControl::AddTorrentFromPaste | ToControl::ToggleFullScreen => Vec::new(),
        }
    }

    fn decode(name: &str, args: Args) -> Result<Self, ChannelError> {
        match name {
            "setBounds" => Ok(ToControl::SetBounds(args.get("setBounds", 0)?)),
            "setAspectRatio" => Ok(ToControl::SetAspectRatio {
                ratio: args.get("setAspectRatio", 0)?,
                extra_size: args.opt("setAspectRatio", 1)?.unwrap_or_default(),
            }),
            "setBadge" => Ok(ToControl::SetBadge(args.get("setBadge", 0)?)),
            "setProgress" => Ok(ToControl::SetProgress(args.get("setProgress", 0)?)),
            "addTorrentFromPaste" => Ok(ToControl::AddTorrentFromPaste),
            "toggleFullScreen" => Ok(ToControl::ToggleFullScreen),
            other => Err(ChannelError::UnknownMessage(other.to_string())),
        }
    }
}

// =============================================================================
// Control -> Logic
// =============================================================================

/// Requests and reports from the window owner to the logic process
#[derive(Debug, Clone, PartialEq)]
pub enum ToLogic {
    /// Add/open a content identifier (magnet link, info hash, .torrent path)
    AddTorrent(String),
    /// Seed a local file/folder selection
    Seed(Vec<PathBuf>),
    FullscreenChanged(bool),
    /// Current window bounds and the usable screen area
    WindowMetrics { bounds: Bounds, work_area: Size },
    /// Paste shortcut on the window side; the logic process asks for the
    /// clipboard through the same request it uses for its own paste key
    AddTorrentFromPaste,
}

impl Message for ToLogic {
    fn name(&self) -> &'static str {
        match self {
            ToLogic::AddTorrent(_) => "addTorrent",
            ToLogic::Seed(_) => "seed",
            ToLogic::FullscreenChanged(_) => "fullscreenChanged",
            ToLogic::WindowMetrics { .. } => "windowMetrics",
            ToLogic::AddTorrentFromPaste => "addTorrentFromPaste",
        }
    }

    fn args(&self) -> Vec<Value> {
        match self {
            ToLogic::AddTorrent(id) => vec![arg(id)],
            ToLogic::Seed(files) => vec![arg(files)],
            ToLogic::FullscreenChanged(on) => vec![arg(on)],
            ToLogic::WindowMetrics { bounds, work_area } => vec![arg(bounds), arg(work_area)],
            ToLogic::AddTorrentFromPaste => Vec::new(),
        }
    }

    fn decode(name: &str, args: Args) -> Result<Self, ChannelError> {
        match name {
            "addTorrent" => Ok(ToLogic::AddTorrent(args.get("addTorrent", 0)?)),
            "seed" => Ok(ToLogic::Seed(args.get("seed", 0)?)),
            "fullscreenChanged" => {
                Ok(ToLogic::FullscreenChanged(args.get("fullscreenChanged", 0)?))
            }
            "windowMetrics" => Ok(ToLogic::WindowMetrics {
                bounds: args.get("windowMetrics", 0)?,
                work_area: args.get("windowMetrics", 1)?,
            }),
            "addTorrentFromPaste" => Ok(ToLogic::AddTorrentFromPaste),
            other => Err(ChannelError::UnknownMessage(other.to_string())),
        }
    }
}

// =============================================================================
// Channel Ends
// =============================================================================

/// Sending half: encodes messages into frames
#[derive(Debug)]
pub struct Outbox<M> {
    tx: mpsc::UnboundedSender<String>,
    _message: PhantomData<fn(M)>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _message: PhantomData,
        }
    }
}

impl<M: Message + std::fmt::Debug> Outbox<M> {
    /// Send without waiting and without confirmation
    pub fn send(&self, msg: M) {
        debug!(message = msg.name(), "ipc send {:?}", msg);
        if self.tx.send(msg.encode()).is_err() {
            debug!(message = msg.name(), "ipc peer gone, frame dropped");
        }
    }

    /// Send an already-encoded frame (for bridges and tests)
    pub fn send_raw(&self, frame: impl Into<String>) {
        if self.tx.send(frame.into()).is_err() {
            debug!("ipc peer gone, raw frame dropped");
        }
    }
}

/// Receiving half: decodes frames, skipping ones it does not understand
#[derive(Debug)]
pub struct Inbox<M> {
    rx: mpsc::UnboundedReceiver<String>,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> Inbox<M> {
    /// Next decodable message, or None once every sender is gone
    pub async fn recv(&mut self) -> Option<M> {
        loop {
            let frame = self.rx.recv().await?;
            if let Some(msg) = Self::decode_logged(&frame) {
                return Some(msg);
            }
        }
    }

    /// Next decodable message already queued, without waiting
    pub fn try_recv(&mut self) -> Option<M> {
        while let Ok(frame) = self.rx.try_recv() {
            if let Some(msg) = Self::decode_logged(&frame) {
                return Some(msg);
            }
        }
        None
    }

    /// Drain everything currently queued
    pub fn drain(&mut self) -> Vec<M> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn decode_logged(frame: &str) -> Option<M> {
        match M::decode_frame(frame) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!("ipc frame ignored: {} ({})", e, frame);
                None
            }
        }
    }
}

/// One direction of the channel
pub fn channel<M>() -> (Outbox<M>, Inbox<M>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Outbox {
            tx,
            _message: PhantomData,
        },
        Inbox {
            rx,
            _message: PhantomData,
        },
    )
}

/// The logic process's view of the channel
#[derive(Debug)]
pub struct LogicEnd {
    pub outbox: Outbox<ToControl>,
    pub inbox: Inbox<ToLogic>,
}

/// The control process's view of the channel
#[derive(Debug)]
pub struct ControlEnd {
    pub outbox: Outbox<ToLogic>,
    pub inbox: Inbox<ToControl>,
}

/// Connect the two processes
pub fn link() -> (LogicEnd, ControlEnd) {
    let (to_control, control_inbox) = channel::<ToControl>();
    let (to_logic, logic_inbox) = channel::<ToLogic>();
    (
        LogicEnd {
            outbox: to_control,
            inbox: logic_inbox,
        },
        ControlEnd {
            outbox: to_logic,
            inbox: control_inbox,
        },
    )
}
