//! Server side: the broadcast endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐                 ┌───────────────────────────────┐
//! │ client A │◄───────────────►│  BroadcastServer              │
//! └──────────┘    WebSocket    │  accept loop ─► session tasks │
//! ┌──────────┐                 │        │              ▲       │
//! │ client B │◄───────────────►│        └──► Hub ──────┘       │
//! └──────────┘                 └───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Listener, accept loop and per-client sessions |
//! | `exchange` | `exchange` command: parsing, rates lookup, report |
//! | `hub` | Peer registry and fan-out |

// ============================================================================
// Submodules
// ============================================================================

/// Broadcast server and configuration.
pub mod core;

/// `exchange` chat command.
mod exchange;

/// Peer registry and fan-out.
mod hub;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{BroadcastServer, ServerConfig};
