//! Client side: one owned WebSocket text channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   commands    ┌──────────────────┐   WebSocket   ┌──────────┐
//! │  MessageChannel  │──────────────►│  connection task │◄─────────────►│ endpoint │
//! │  send / close    │               │  (event loop)    │  text frames  │          │
//! │                  │◄──────────────│                  │               └──────────┘
//! └──────────────────┘  Messages +   └──────────────────┘
//!                       LifecycleEvents
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `address` | `ws://` / `wss://` target parsing |
//! | `config` | Limits, configuration and builder |
//! | `core` | `MessageChannel` and its event loop |
//! | `state` | Lifecycle state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Target address parsing.
pub mod address;

/// Channel configuration and builder.
pub mod config;

/// MessageChannel and its connection task.
pub mod core;

/// Lifecycle state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use address::{Address, Scheme};
pub use config::{ChannelBuilder, ChannelConfig, Limits};
pub use core::{InboundEvent, MessageChannel, Messages};
pub use state::{Fault, LifecycleEvents, LifecycleState};
