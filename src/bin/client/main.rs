//! linechat: console client.
//!
//! Configuration comes from the environment (or `.env`):
//! - `LINECHAT_HOST` / `LINECHAT_PORT`: server address
//! - `LINECHAT_FRAMING`: `chunk` (default) or `lines`, must match the server
//! - `LINECHAT_HANDSHAKE`: `name_email` to send name and e-mail first

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use linechat::client::{ChatClient, receive_loop};
use linechat::constants::{DEFAULT_HOST, DEFAULT_PORT};
use linechat::{DisplaySink, Framing};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Prints inbound chat lines in cyan and local notices in colour.
struct ConsoleSink;

impl DisplaySink for ConsoleSink {
    fn write(&self, line: &str) {
        if line.starts_with("[ERROR]") {
            println!("{}", line.red());
        } else if line.starts_with("[DISCONNECTED]") {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.cyan());
        }
    }
}

type StdinLines = Lines<BufReader<Stdin>>;

async fn prompt(lines: &mut StdinLines, text: &str) -> Result<Option<String>> {
    print!("{}", text.yellow());
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

/// Asks until a non-blank answer is given. `None` on end of input.
async fn prompt_required(lines: &mut StdinLines, text: &str) -> Result<Option<String>> {
    let mut answer = prompt(lines, text).await?;
    while let Some(value) = &answer {
        if !value.trim().is_empty() {
            break;
        }
        println!("{}", "This field cannot be empty.".red());
        answer = prompt(lines, text).await?;
    }
    Ok(answer)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let host = std::env::var("LINECHAT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = match std::env::var("LINECHAT_PORT") {
        Ok(p) => p.parse().context("LINECHAT_PORT must be a port number")?,
        Err(_) => DEFAULT_PORT,
    };
    let framing = match std::env::var("LINECHAT_FRAMING") {
        Ok(mode) => Framing::parse(&mode)?,
        Err(_) => Framing::default(),
    };
    let send_handshake = std::env::var("LINECHAT_HANDSHAKE").is_ok_and(|v| v == "name_email");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let answer = prompt(&mut stdin, "Would you like to connect (yes/no)? ").await?;
    if !answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("yes")) {
        return Ok(());
    }

    let (mut client, reader) = match ChatClient::connect((host.as_str(), port), framing).await {
        Ok(connected) => connected,
        Err(e) => {
            println!("{}", format!("[ERROR] Could not connect to server: {e}").red());
            return Ok(());
        }
    };
    println!(
        "{}",
        format!("[SUCCESS] Connected to server as {}.", client.local_addr()).green()
    );

    if send_handshake {
        let Some(name) = prompt_required(&mut stdin, "Enter your name: ").await? else {
            return client.disconnect().await.map_err(Into::into);
        };
        let Some(email) = prompt_required(&mut stdin, "Enter your email: ").await? else {
            return client.disconnect().await.map_err(Into::into);
        };
        client.handshake(name.trim(), email.trim()).await?;
    }

    let receiver = tokio::spawn(receive_loop(reader, Arc::new(ConsoleSink)));

    println!(
        "{}",
        "Instructions for sending messages:\n\
         - To broadcast to all clients: @all: message\n\
         - To send to a specific client: @host:port: message (e.g., @127.0.0.1:5051: Hello)\n\
         - Type 'q' to disconnect"
            .green()
    );

    loop {
        if receiver.is_finished() {
            break;
        }
        let Some(line) = prompt(&mut stdin, "Message (q to quit, @all: for broadcast): ").await? else {
            break;
        };
        if line == "q" {
            break;
        }
        if let Err(e) = client.submit_line(&line).await {
            println!("{}", format!("[ERROR] Failed to send message: {e}").red());
            break;
        }
    }

    if let Err(e) = client.disconnect().await {
        tracing::debug!(error = %e, "disconnect after connection loss");
    }
    receiver.abort();
    println!("{}", "Disconnected".red());
    Ok(())
}
