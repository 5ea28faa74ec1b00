//! ws-broadcast - Real-time text broadcast over WebSocket.
//!
//! This library provides a single-connection text channel with an
//! observable lifecycle, and the broadcast endpoint it talks to.
//!
//! # Architecture
//!
//! - **Client ([`MessageChannel`])**: owns one WebSocket connection,
//!   sends text frames, yields inbound frames as a lazy sequence
//! - **Server ([`BroadcastServer`])**: relays every text frame from any
//!   client to all clients, prefixed with the sender's name
//!
//! Key design principles:
//!
//! - One `send` is one frame on the wire; no envelope, no buffering
//! - Sends before `open` fail with [`Error::NotReady`]
//! - Lifecycle: `connecting -> open -> closed | errored`, never backwards
//! - No automatic reconnect; resilience is layered by the caller
//! - Inbound text is untrusted data, delivered verbatim
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_broadcast::{MessageChannel, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let channel = MessageChannel::open("ws://localhost:8080")?;
//!     let mut messages = channel.messages().expect("first call");
//!
//!     channel.wait_open().await?;
//!     channel.send("hello")?;
//!
//!     while let Some(event) = messages.next().await {
//!         println!("{}", event.text());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`MessageChannel`], lifecycle, addresses, configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`server`] | [`BroadcastServer`] endpoint |

// ============================================================================
// Modules
// ============================================================================

/// Client-side message channel.
///
/// - [`MessageChannel`] - One owned connection
/// - [`LifecycleState`] - Connection lifecycle
/// - [`ChannelBuilder`] - Fluent configuration
pub mod channel;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Broadcast endpoint.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    Address, ChannelBuilder, ChannelConfig, Fault, InboundEvent, LifecycleEvents, LifecycleState,
    Limits, MessageChannel, Messages, Scheme,
};

// Server types
pub use server::{BroadcastServer, ServerConfig};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ClientId;
