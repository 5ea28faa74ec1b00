//! Channel configuration and builder.
//!
//! Provides a fluent API for configuring a [`MessageChannel`] before
//! opening it, and JSON loading for file-based setups.
//!
//! # Example
//!
//! ```no_run
//! use ws_broadcast::MessageChannel;
//!
//! # async fn example() -> ws_broadcast::Result<()> {
//! let channel = MessageChannel::builder()
//!     .address("ws://127.0.0.1:8080")
//!     .max_message_size(64 * 1024)
//!     .open()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

use super::address::Address;
use super::core::MessageChannel;

// ============================================================================
// Limits
// ============================================================================

/// Frame and message size limits applied by the transport.
///
/// `None` keeps the transport default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Largest accepted message, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_message_size: Option<usize>,

    /// Largest accepted single frame, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frame_size: Option<usize>,
}

impl Limits {
    /// Checks that limits are non-zero and consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on a zero limit or a frame limit above
    /// the message limit.
    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == Some(0) {
            return Err(Error::config("max_message_size must be greater than 0"));
        }
        if self.max_frame_size == Some(0) {
            return Err(Error::config("max_frame_size must be greater than 0"));
        }
        if let (Some(message), Some(frame)) = (self.max_message_size, self.max_frame_size)
            && frame > message
        {
            return Err(Error::config(format!(
                "max_frame_size ({frame}) exceeds max_message_size ({message})"
            )));
        }
        Ok(())
    }

    /// Builds the transport configuration.
    #[must_use]
    pub fn to_websocket_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        if let Some(size) = self.max_message_size {
            config = config.max_message_size(Some(size));
        }
        if let Some(size) = self.max_frame_size {
            config = config.max_frame_size(Some(size));
        }
        config
    }
}

// ============================================================================
// ChannelConfig
// ============================================================================

/// Validated configuration for one [`MessageChannel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Target endpoint.
    pub address: Address,

    /// Transport limits.
    #[serde(flatten)]
    pub limits: Limits,
}

impl ChannelConfig {
    /// Creates a configuration with default limits.
    #[inline]
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            limits: Limits::default(),
        }
    }

    /// Loads a configuration from JSON.
    ///
    /// ```json
    /// { "address": "ws://127.0.0.1:8080", "max_message_size": 65536 }
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document does not parse
    /// - [`Error::Config`] if the limits are invalid
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.limits.validate()?;
        Ok(config)
    }
}

// ============================================================================
// ChannelBuilder
// ============================================================================

/// Builder for a [`ChannelConfig`] or an opened [`MessageChannel`].
///
/// Use [`MessageChannel::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ChannelBuilder {
    /// Unparsed target address.
    address: Option<String>,
    /// Transport limits.
    limits: Limits,
}

impl ChannelBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target address (e.g. `ws://localhost:8080`).
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the largest accepted inbound message, in bytes.
    #[inline]
    #[must_use]
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.limits.max_message_size = Some(bytes);
        self
    }

    /// Sets the largest accepted inbound frame, in bytes.
    #[inline]
    #[must_use]
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.limits.max_frame_size = Some(bytes);
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no address was set or limits are invalid
    /// - [`Error::InvalidAddress`] if the address does not parse
    pub fn build(self) -> Result<ChannelConfig> {
        let raw = self.address.ok_or_else(|| {
            Error::config(
                "Channel address is required. Use .address() to set it.\n\
                 Example: MessageChannel::builder().address(\"ws://127.0.0.1:8080\")",
            )
        })?;
        let address = Address::parse(&raw)?;
        self.limits.validate()?;

        Ok(ChannelConfig {
            address,
            limits: self.limits,
        })
    }

    /// Validates the configuration and opens the channel.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn open(self) -> Result<MessageChannel> {
        Ok(MessageChannel::open_with_config(self.build()?))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_address() {
        let err = ChannelBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_builder_rejects_bad_address() {
        let err = ChannelBuilder::new()
            .address("tcp://localhost:1")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_builder_sets_limits() {
        let config = ChannelBuilder::new()
            .address("ws://localhost:9000")
            .max_message_size(1024)
            .max_frame_size(512)
            .build()
            .unwrap();

        assert_eq!(config.address.port(), 9000);
        assert_eq!(config.limits.max_message_size, Some(1024));
        assert_eq!(config.limits.max_frame_size, Some(512));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = ChannelBuilder::new()
            .address("ws://localhost:9000")
            .max_message_size(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_frame_above_message_rejected() {
        let limits = Limits {
            max_message_size: Some(100),
            max_frame_size: Some(200),
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_websocket_config_applies_limits() {
        let limits = Limits {
            max_message_size: Some(4096),
            max_frame_size: Some(1024),
        };
        let config = limits.to_websocket_config();
        assert_eq!(config.max_message_size, Some(4096));
        assert_eq!(config.max_frame_size, Some(1024));
    }

    #[test]
    fn test_from_json() {
        let config =
            ChannelConfig::from_json(r#"{"address":"ws://127.0.0.1:8080","max_message_size":65536}"#)
                .unwrap();
        assert_eq!(config.address.host(), "127.0.0.1");
        assert_eq!(config.limits.max_message_size, Some(65536));
        assert_eq!(config.limits.max_frame_size, None);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            ChannelConfig::from_json("{"),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            ChannelConfig::from_json(r#"{"address":"ws://x","max_frame_size":0}"#),
            Err(Error::Config { .. })
        ));
    }
}
