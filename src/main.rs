//! seedcast - stream torrents to a local player or a Chromecast
//!
//! # Usage
//!
//! ```bash
//! # Launch the TUI
//! seedcast
//!
//! # Add a magnet link and seed a folder on startup
//! seedcast "magnet:?xt=urn:btih:..." --seed ~/Videos
//!
//! # No TUI, log to stderr
//! seedcast --headless --seed movie.mp4 --device "Living Room TV"
//! ```

use std::fs::OpenOptions;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange,
        Event, KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seedcast::app::{Action, Store};
use seedcast::cli::Cli;
use seedcast::config::Config;
use seedcast::control::{paste_lines, ControlProcess, TerminalPlatform};
use seedcast::ipc;
use seedcast::runtime::{spawn_discovery, ActionSender, LogicProcess};
use seedcast::stream::engine::LocalEngine;
use seedcast::stream::player::LocalPlayer;
use seedcast::stream::session::SessionManager;
use seedcast::ui::node::Node;
use seedcast::ui::terminal::paint;

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config();
    let log_path = init_tracing(&cli, &config)?;
    info!("seedcast starting (log: {:?})", log_path);

    // Logic side: engine, store, runtime
    let (logic_end, control_end) = ipc::link();
    let (engine_tx, engine_rx) = mpsc::unbounded_channel();
    let engine = LocalEngine::new(engine_tx);
    let store = Store::new(Box::new(engine), logic_end.outbox, SessionManager::detect());
    let (logic, actions, dom) = LogicProcess::new(
        store,
        logic_end.inbox,
        engine_rx,
        config.render_profile.interval(),
        LocalPlayer::new(config.player),
    );

    // Control side: the terminal is the window
    let platform = TerminalPlatform::new(!cli.headless, config.work_area);
    let control = ControlProcess::new(platform, control_end);
    for id in &cli.torrent_ids {
        control.add_torrent(id.clone());
    }
    control.seed(cli.seed.clone());
    let control_task = tokio::spawn(control.run());

    if !cli.no_discovery {
        spawn_discovery(actions.clone(), config.catt_path.clone(), config.default_device.clone());
    }

    let logic_task = tokio::spawn(logic.run());
    let store = if cli.headless {
        run_headless(actions, logic_task).await?
    } else {
        run_tui(actions, dom, logic_task).await?
    };

    info!("{} torrent(s) at exit", store.state.torrents.len());
    // Dropping the store closes the channel, which stops the control process
    drop(store);
    control_task.await.context("control process panicked")?;
    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

/// Log file for TUI mode (~/.cache/seedcast/seedcast.log)
fn log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("seedcast").join("seedcast.log"))
}

/// Install the tracing subscriber. The TUI owns the screen, so it logs to a
/// file; headless mode logs to stderr.
fn init_tracing(cli: &Cli, config: &Config) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_filter.as_deref().unwrap_or(cli.log_level()))
    });

    let (writer, path) = if cli.headless {
        (BoxMakeWriter::new(std::io::stderr), None)
    } else {
        match log_path() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening {}", path.display()))?;
                (BoxMakeWriter::new(Mutex::new(file)), Some(path))
            }
            None => (BoxMakeWriter::new(std::io::sink), None),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(cli.headless),
        )
        .init();
    Ok(path)
}

// =============================================================================
// Headless Mode
// =============================================================================

async fn run_headless(actions: ActionSender, logic: JoinHandle<Store>) -> Result<Store> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            let _ = actions.send(Action::Quit);
        }
    });
    logic.await.context("logic process panicked")
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI until the logic process stops
async fn run_tui(
    actions: ActionSender,
    dom: watch::Receiver<Node>,
    logic: JoinHandle<Store>,
) -> Result<Store> {
    let mut terminal = init_terminal()?;

    let stop = Arc::new(AtomicBool::new(false));
    let (redraw_tx, redraw_rx) = mpsc::unbounded_channel();
    let input = {
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || read_input(actions, redraw_tx, stop))
    };

    let result = draw_loop(&mut terminal, dom, redraw_rx).await;

    stop.store(true, Ordering::Relaxed);
    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;
    result?;

    if let Err(e) = input.await {
        warn!("input thread failed: {}", e);
    }
    logic.await.context("logic process panicked")
}

/// Paint every published view tree; ends when the logic process drops it
async fn draw_loop(
    terminal: &mut Tui,
    mut dom: watch::Receiver<Node>,
    mut redraw: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    loop {
        let tree = dom.borrow_and_update().clone();
        terminal.draw(|frame| paint(frame, &tree))?;

        tokio::select! {
            changed = dom.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            Some(()) = redraw.recv() => {}
        }
    }
}

/// Blocking crossterm reader: keys, focus and pastes become actions
fn read_input(actions: ActionSender, redraw: mpsc::UnboundedSender<()>, stop: Arc<AtomicBool>) {
    const POLL_RATE: Duration = Duration::from_millis(100);

    while !stop.load(Ordering::Relaxed) && !actions.is_closed() {
        match event::poll(POLL_RATE) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("terminal input failed: {}", e);
                return;
            }
        }
        let action = match event::read() {
            // Only handle key press events (ignore releases on Windows)
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(Action::Key(key)),
            Ok(Event::FocusGained) => Some(Action::WindowFocus(true)),
            Ok(Event::FocusLost) => Some(Action::WindowFocus(false)),
            Ok(Event::Paste(text)) => {
                for id in paste_lines(&text) {
                    let _ = actions.send(Action::AddTorrent(id.to_string()));
                }
                None
            }
            Ok(Event::Resize(..)) => {
                let _ = redraw.send(());
                None
            }
            Ok(_) => None,
            Err(e) => {
                warn!("terminal input failed: {}", e);
                return;
            }
        };
        if let Some(action) = action {
            let _ = actions.send(action);
        }
    }
}
