//! Line-oriented chat client.
//!
//! Demonstrates:
//! - Opening a MessageChannel and waiting for `open`
//! - Forwarding stdin lines as outbound messages
//! - Printing inbound messages as plain text (never as markup)
//! - Observing lifecycle transitions
//!
//! Usage:
//!   cargo run --example chat_client
//!   cargo run --example chat_client -- ws://127.0.0.1:9000
//!   cargo run --example chat_client -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::{Args, DEFAULT_ADDRESS};
use tokio::io::{AsyncBufReadExt, BufReader};
use ws_broadcast::{LifecycleState, MessageChannel, Result};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let address = args.target.as_deref().unwrap_or(DEFAULT_ADDRESS);
    println!("=== Chat Client: {address} ===\n");

    let channel = MessageChannel::open(address)?;
    let mut messages = channel.messages().expect("first call returns the sequence");
    let mut lifecycle = channel.lifecycle();

    tokio::spawn(async move {
        while let Some(event) = messages.next().await {
            // Debug formatting escapes control characters.
            println!("< {:?}", event.text());
        }
    });

    tokio::spawn(async move {
        while let Some(state) = lifecycle.next().await {
            println!("[Lifecycle] {state}");
        }
    });

    channel.wait_open().await?;
    println!("Type a message and press Enter. Ctrl+D to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if let Err(e) = channel.send(line) {
            println!("[Send] {e}");
            if channel.state().is_terminal() {
                break;
            }
        }
    }

    channel.close();

    // Let the close frame go out before the runtime stops.
    let mut remaining = channel.lifecycle();
    while remaining.next().await.is_some() {}

    if channel.state() == LifecycleState::Closed {
        println!("\n[Done] Channel closed");
    }

    Ok(())
}
