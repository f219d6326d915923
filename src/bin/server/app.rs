use std::net::SocketAddr;

use crossterm::event::{KeyCode, KeyEvent};
use linechat::dispatch::DispatchReport;
use linechat::server::PeerInfo;
use tokio::sync::mpsc;

const MAX_LOG_LINES: usize = 2000;

#[derive(Debug)]
pub enum AppEvent {
    Started(SocketAddr),
    Stopped,
    Delivered(DispatchReport),
    Peers(Vec<PeerInfo>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    Start,
    Stop,
    Broadcast(String),
    ListPeers,
}

/// What a line typed into the input box means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(ServerCommand),
    Help,
    Unknown(String),
    Empty,
}

pub fn parse_input(text: &str) -> Input {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    match trimmed {
        "/start" => Input::Command(ServerCommand::Start),
        "/stop" => Input::Command(ServerCommand::Stop),
        "/peers" => Input::Command(ServerCommand::ListPeers),
        "/help" => Input::Help,
        cmd if cmd.starts_with('/') => Input::Unknown(cmd.to_string()),
        _ => Input::Command(ServerCommand::Broadcast(text.to_string())),
    }
}

pub struct App {
    pub cmd_tx: mpsc::UnboundedSender<ServerCommand>,
    pub log: Vec<String>,
    pub input: String,
    pub status: String,
    pub listen_addr: Option<SocketAddr>,
    pub configured_addr: String,
    /// Lines scrolled up from the bottom of the log
    pub scroll: usize,
}

impl App {
    pub fn new(cmd_tx: mpsc::UnboundedSender<ServerCommand>, configured_addr: String) -> Self {
        Self {
            cmd_tx,
            log: Vec::new(),
            input: String::new(),
            status: "Stopped. Type /start to listen.".to_string(),
            listen_addr: None,
            configured_addr,
            scroll: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.listen_addr.is_some()
    }

    pub fn push_log(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Started(addr) => {
                self.listen_addr = Some(addr);
                self.status = format!("Listening on {addr}");
            }
            AppEvent::Stopped => {
                self.listen_addr = None;
                self.status = "Stopped".to_string();
            }
            AppEvent::Delivered(report) => {
                self.status = format!(
                    "Delivered to {} peer(s), {} failed",
                    report.delivered, report.failed
                );
            }
            AppEvent::Peers(peers) => {
                self.status = format!("{} peer(s) connected", peers.len());
                for peer in peers {
                    let line = match peer.identity {
                        Some(identity) => format!("[PEER] {} ({})", peer.addr, identity.name),
                        None => format!("[PEER] {}", peer.addr),
                    };
                    self.push_log(line);
                }
            }
            AppEvent::Error(e) => {
                self.status = format!("Error: {e}");
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::PageUp => {
                self.scroll = (self.scroll + 10).min(self.log.len().saturating_sub(1));
            }
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::End => self.scroll = 0,
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        match parse_input(&text) {
            Input::Command(ServerCommand::Broadcast(_)) if !self.is_running() => {
                self.status = "Server is not running".to_string();
            }
            Input::Command(cmd) => {
                self.scroll = 0;
                let _ = self.cmd_tx.send(cmd);
            }
            Input::Help => {
                self.push_log(
                    "[HELP] /start  /stop  /peers  | text broadcasts, @<host:port>: text goes to one peer"
                        .to_string(),
                );
            }
            Input::Unknown(cmd) => self.status = format!("Unknown command: {cmd}"),
            Input::Empty => {}
        }
    }
}
