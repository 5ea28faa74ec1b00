//! Error types for ws-broadcast.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```no_run
//! use ws_broadcast::{MessageChannel, Result};
//!
//! async fn example() -> Result<()> {
//!     let channel = MessageChannel::open("ws://127.0.0.1:8080")?;
//!     channel.wait_open().await?;
//!     channel.send("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidAddress`] |
//! | Channel | [`Error::NotReady`], [`Error::ConnectFailure`], [`Error::TransportDrop`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::channel::{Fault, LifecycleState};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when channel or server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Address is not a usable WebSocket URI.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The address as given by the caller.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Send attempted while the channel is not open.
    ///
    /// The text was not queued. The caller decides whether to re-submit.
    #[error("Channel not ready for sending (state: {state})")]
    NotReady {
        /// Lifecycle state observed at the time of the call.
        state: LifecycleState,
    },

    /// Address unreachable or handshake rejected.
    #[error("Connect failed: {message}")]
    ConnectFailure {
        /// Description of the connect failure.
        message: String,
    },

    /// Connection lost after it was open.
    #[error("Transport dropped: {message}")]
    TransportDrop {
        /// Description of the transport failure.
        message: String,
    },

    /// Connection closed cleanly.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid address error.
    #[inline]
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not-ready error for the given state.
    #[inline]
    pub fn not_ready(state: LifecycleState) -> Self {
        Self::NotReady { state }
    }

    /// Creates a connect failure error.
    #[inline]
    pub fn connect_failure(message: impl Into<String>) -> Self {
        Self::ConnectFailure {
            message: message.into(),
        }
    }

    /// Creates a transport drop error.
    #[inline]
    pub fn transport_drop(message: impl Into<String>) -> Self {
        Self::TransportDrop {
            message: message.into(),
        }
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::ConnectFailure { reason } => Self::ConnectFailure { message: reason },
            Fault::TransportDrop { reason } => Self::TransportDrop { message: reason },
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a [`Error::NotReady`] error.
    #[inline]
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailure { .. }
                | Self::TransportDrop { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Only a premature send qualifies: the same channel may accept the
    /// text once it is open. Everything else needs a new channel.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotReady { state } if !state.is_terminal())
    }
}

// ============================================================================
// Tests
// ============================================================================
