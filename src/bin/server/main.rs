//! linechat-server: terminal console for the linechat relay.
//!
//! The log pane shows connection events and every relayed message. Text
//! typed into the input box is broadcast under the `SERVER` label.
//!
//! `--headless` skips the console: the server starts immediately, logs to
//! stderr and stops on Ctrl-C.

mod app;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use app::{App, AppEvent, ServerCommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use linechat::ChatServer;
use linechat::config::ServerConfig;
use linechat::sink::{ChannelSink, TracingSink};
use ratatui::{Terminal, prelude::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("LINECHAT_CONFIG").unwrap_or_else(|_| "linechat-server.toml".to_string());
    let config = ServerConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {config_path}"))?;
    if std::env::args().any(|arg| arg == "--headless") {
        return run_headless(config).await;
    }
    init_logging(&config.log_file)?;

    let (sink, mut log_rx) = ChannelSink::new();
    let server = Arc::new(ChatServer::new(config, Arc::new(sink)));
    let configured_addr = server.config().listen_addr();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let controller = tokio::spawn(run_controller(server.clone(), cmd_rx, event_tx));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cmd_tx, configured_addr);
    let result = run_app(&mut terminal, &mut app, &mut log_rx, &mut event_rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    controller.abort();
    server.stop().await?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

async fn run_headless(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let server = ChatServer::new(config, Arc::new(TracingSink));
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    server.stop().await?;
    Ok(())
}

fn init_logging(path: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Executes console commands against the server, one at a time.
async fn run_controller(
    server: Arc<ChatServer>,
    mut cmd_rx: mpsc::UnboundedReceiver<ServerCommand>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let event = match cmd {
            ServerCommand::Start => match server.start().await {
                Ok(addr) => AppEvent::Started(addr),
                Err(e) => AppEvent::Error(e.to_string()),
            },
            ServerCommand::Stop => match server.stop().await {
                Ok(()) => AppEvent::Stopped,
                Err(e) => AppEvent::Error(e.to_string()),
            },
            ServerCommand::Broadcast(text) => {
                AppEvent::Delivered(server.broadcast_from_server(&text).await)
            }
            ServerCommand::ListPeers => AppEvent::Peers(server.peers().await),
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    log_rx: &mut mpsc::UnboundedReceiver<String>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            Some(line) = log_rx.recv() => {
                app.push_log(line);
            }
            Some(app_event) = event_rx.recv() => {
                app.handle_app_event(app_event);
            }
            _ = tokio::time::sleep(Duration::from_millis(5)) => {
                while event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                            return Ok(());
                        }
                        app.handle_key(key);
                    }
                }
            }
        }
    }
}
