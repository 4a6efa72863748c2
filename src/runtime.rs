//! Logic process runtime
//!
//! One task owns the store and selects over its inputs: queued actions
//! (effect completions, terminal input, device discovery), the channel from
//! the control process, engine events, the 1 s tick and the render
//! throttle's trailing deadline. Renders go through the throttle and the
//! reconciler; the retained view tree is published on a watch channel for
//! whatever surface paints it.
//!
//! Commands for one cast device run in the order they were issued: each
//! waits for the device's previous command to finish, so a stop for a
//! replaced session always lands before the next play.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app::{Action, Effect, Store};
use crate::models::DeviceKind;
use crate::ipc::{Inbox, ToLogic};
use crate::stream::cast::{self, CastReceiver, CattReceiver};
use crate::stream::engine::EngineEvent;
use crate::stream::player::LocalPlayer;
use crate::throttle::{Schedule, Throttle, TICK_INTERVAL};
use crate::ui::node::Node;
use crate::ui::reconcile::{apply, diff};
use crate::ui::views;

/// How often `catt scan` is repeated while no Chromecast is known
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(30);

/// Sender half for actions produced outside the store
pub type ActionSender = mpsc::UnboundedSender<Action>;

/// Translate a channel message into a store action
pub fn wire_action(msg: ToLogic) -> Action {
    match msg {
        ToLogic::AddTorrent(id) => Action::AddTorrent(id),
        ToLogic::Seed(files) => Action::Seed(files),
        ToLogic::FullscreenChanged(on) => Action::FullscreenChanged(on),
        ToLogic::WindowMetrics { bounds, work_area } => Action::WindowMetrics { bounds, work_area },
        ToLogic::AddTorrentFromPaste => Action::Paste,
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Retained view tree kept in sync with the state through diff/apply
#[derive(Debug)]
pub struct Renderer {
    dom: Node,
    published: watch::Sender<Node>,
    passes: u64,
}

impl Renderer {
    pub fn new() -> (Self, watch::Receiver<Node>) {
        let dom = Node::text("");
        let (published, rx) = watch::channel(dom.clone());
        (
            Self {
                dom,
                published,
                passes: 0,
            },
            rx,
        )
    }

    pub fn dom(&self) -> &Node {
        &self.dom
    }

    /// Number of render passes run so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Rebuild the view, patch the retained tree and publish it if it changed
    pub fn render(&mut self, next: Node) {
        self.passes += 1;
        let patch = diff(&self.dom, &next);
        if patch.is_empty() {
            return;
        }
        let prev = std::mem::replace(&mut self.dom, Node::text(""));
        self.dom = match apply(prev, &patch) {
            Ok(dom) => dom,
            Err(e) => {
                warn!("patch failed ({}), replacing view", e);
                next
            }
        };
        debug!("render pass {}: {} op(s)", self.passes, patch.len());
        self.published.send_replace(self.dom.clone());
    }
}

// =============================================================================
// Logic Process
// =============================================================================

pub struct LogicProcess {
    store: Store,
    inbox: Inbox<ToLogic>,
    actions: mpsc::UnboundedReceiver<Action>,
    actions_tx: ActionSender,
    engine_events: mpsc::UnboundedReceiver<EngineEvent>,
    throttle: Throttle,
    renderer: Renderer,
    player: LocalPlayer,
    stop_player: Option<oneshot::Sender<()>>,
    /// Last command issued to each cast device
    device_commands: HashMap<DeviceKind, JoinHandle<()>>,
}

impl LogicProcess {
    pub fn new(
        store: Store,
        inbox: Inbox<ToLogic>,
        engine_events: mpsc::UnboundedReceiver<EngineEvent>,
        render_interval: Duration,
        player: LocalPlayer,
    ) -> (Self, ActionSender, watch::Receiver<Node>) {
        let (actions_tx, actions) = mpsc::unbounded_channel();
        let (renderer, dom) = Renderer::new();
        let process = Self {
            store,
            inbox,
            actions,
            actions_tx: actions_tx.clone(),
            engine_events,
            throttle: Throttle::new(render_interval),
            renderer,
            player,
            stop_player: None,
            device_commands: HashMap::new(),
        };
        (process, actions_tx, dom)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Run until the user quits; returns the store for inspection
    pub async fn run(mut self) -> Store {
        info!(
            "logic process started (render interval {:?})",
            self.throttle.interval()
        );
        let mut tick = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.render_now();
        while self.store.state.running {
            let deadline = self.throttle.deadline();
            tokio::select! {
                Some(action) = self.actions.recv() => self.dispatch(action),
                Some(msg) = self.inbox.recv() => self.dispatch(wire_action(msg)),
                Some(event) = self.engine_events.recv() => self.dispatch(Action::Engine(event)),
                _ = tick.tick() => self.dispatch(Action::Tick),
                _ = async {
                    match deadline {
                        Some(at) => sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    if self.throttle.fire(Instant::now()) {
                        self.render_now();
                    }
                }
            }
        }

        self.stop_local_player();
        info!("logic process stopped");
        self.store
    }

    /// Dispatch, start the requested effects and schedule a render
    pub fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
        for effect in self.store.take_effects() {
            self.run_effect(effect);
        }
        if self.store.take_render_request() {
            match self.throttle.schedule(Instant::now()) {
                Schedule::RunNow => self.render_now(),
                Schedule::Deferred(at) => debug!("render deferred to {:?}", at),
            }
        }
    }

    fn render_now(&mut self) {
        let next = views::app(&self.store.state);
        self.renderer.render(next);
    }

    fn run_effect(&mut self, effect: Effect) {
        debug!("effect: {:?}", effect);
        let tx = self.actions_tx.clone();
        match effect {
            Effect::Listen { ticket, server } => {
                tokio::spawn(async move {
                    let action = match server.listen(0).await {
                        Ok(addr) => Action::ServerListening {
                            ticket,
                            server,
                            addr,
                        },
                        Err(e) => {
                            server.destroy();
                            Action::ServerFailed {
                                ticket,
                                error: e.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(action);
                });
            }
            Effect::Cast {
                device,
                url,
                options,
            } => {
                let kind = device.kind();
                self.queue_device_command(kind, async move {
                    if let Err(e) = device.play(&url, &options).await {
                        let _ = tx.send(Action::DeviceError {
                            kind: device.kind(),
                            message: e.to_string(),
                        });
                    }
                });
            }
            Effect::StopCast { device } => {
                let kind = device.kind();
                self.queue_device_command(kind, async move {
                    if let Err(e) = device.stop().await {
                        warn!("stopping {} failed: {}", device.name(), e);
                    }
                });
            }
            Effect::LaunchPlayer { ticket, url, title } => {
                self.stop_local_player();
                match self.player.play(&url, &title) {
                    Ok(mut child) => {
                        let (stop_tx, stop_rx) = oneshot::channel();
                        self.stop_player = Some(stop_tx);
                        tokio::spawn(async move {
                            tokio::select! {
                                status = child.wait() => debug!("player exited: {:?}", status),
                                _ = stop_rx => {
                                    if let Err(e) = child.kill().await {
                                        warn!("failed to stop player: {}", e);
                                    }
                                }
                            }
                            let _ = tx.send(Action::PlayerExited(ticket));
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(Action::PlayerFailed {
                            ticket,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Effect::StopPlayer => self.stop_local_player(),
        }
    }

    /// Run `command` once the device's previous command has finished
    fn queue_device_command<F>(&mut self, kind: DeviceKind, command: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.device_commands.remove(&kind);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            command.await;
        });
        self.device_commands.insert(kind, handle);
    }

    fn stop_local_player(&mut self) {
        if let Some(stop) = self.stop_player.take() {
            let _ = stop.send(());
        }
    }
}

// =============================================================================
// Device Discovery
// =============================================================================

/// Report a Chromecast to the store: the named one right away, or the first
/// one `catt scan` finds (rescanning until one shows up)
pub fn spawn_discovery(
    actions: ActionSender,
    catt_path: String,
    device: Option<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(name) = device {
            let receiver: Arc<dyn CastReceiver> =
                Arc::new(CattReceiver::with_path(catt_path, name));
            let _ = actions.send(Action::DeviceFound(receiver));
            return;
        }

        loop {
            match cast::discover(&catt_path).await {
                Ok(devices) => {
                    if let Some(found) = devices.into_iter().next() {
                        info!("discovered {}", found);
                        let receiver: Arc<dyn CastReceiver> =
                            Arc::new(CattReceiver::with_path(catt_path, found.name));
                        let _ = actions.send(Action::DeviceFound(receiver));
                        return;
                    }
                }
                Err(e) => {
                    // catt missing will not fix itself
                    warn!("device discovery disabled: {}", e);
                    return;
                }
            }
            if actions.is_closed() {
                return;
            }
            tokio::time::sleep(DISCOVERY_INTERVAL).await;
        }
    })
}
