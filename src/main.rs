//! Chatovod Chat Client - Entry Point
//!
//! Connects to a chat, optionally signs in under a nickname and prints
//! every chat event as JSON until interrupted.

use std::env;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatovod::{Chat, ChatEvent, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatovod=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatovod=info")),
        )
        .init();

    // Chat name from the command line, otherwise CHATOVOD_* variables
    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(name) => ClientConfig::for_chat(&name),
        None => ClientConfig::from_env()?
            .ok_or("usage: chatovod <chat> [nickname] (or set CHATOVOD_CHAT)")?,
    };
    let nickname = args.next();

    // Printer task
    let (mut events_tx, mut events_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
        }
    });

    let mut chat = Chat::new(config)?;
    info!("Connecting to {}", chat.config().base_url());
    chat.start(&mut events_tx).await?;

    if let Some(nickname) = nickname {
        chat.enter(&nickname).await?;
    }

    tokio::select! {
        result = chat.listen(&mut events_tx) => {
            if let Err(e) = result {
                error!("Disconnected: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, leaving chat");
        }
    }

    if let Err(e) = chat.close().await {
        warn!("Failed to leave chat cleanly: {}", e);
    }

    drop(events_tx);
    printer.await?;
    Ok(())
}
