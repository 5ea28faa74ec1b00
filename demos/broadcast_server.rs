//! Broadcast endpoint.
//!
//! Demonstrates:
//! - Binding a BroadcastServer on a fixed port
//! - Relaying every client message to all clients
//! - Graceful shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example broadcast_server
//!   cargo run --example broadcast_server -- 9000
//!   cargo run --example broadcast_server -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use common::{Args, DEFAULT_PORT};
use ws_broadcast::{BroadcastServer, Error, Result, ServerConfig};

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
    println!("=== Broadcast Server ===\n");

    let port = match args.target {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|e| Error::config(format!("invalid port '{raw}': {e}")))?,
        None => DEFAULT_PORT,
    };

    let config = ServerConfig::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    let server = BroadcastServer::bind(config).await?;
    println!("[Server] Listening on {}\n", server.ws_url());

    common::wait_for_exit().await;

    println!("\n[Server] {} client(s) connected, shutting down", server.client_count());
    server.shutdown();

    Ok(())
}
