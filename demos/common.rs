//! Shared utilities for the demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Graceful exit handling

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when none is given.
pub const DEFAULT_ADDRESS: &str = "ws://localhost:8080";

/// Port used by the server demo when none is given.
pub const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for the demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    /// First non-flag argument (address or port, demo-specific).
    pub target: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            target: args.into_iter().find(|a| !a.starts_with("--")),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "ws_broadcast=debug"
    } else {
        "ws_broadcast=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Wait for Ctrl+C.
pub async fn wait_for_exit() {
    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();
}
