//! WebSocket target addresses.
//!
//! An [`Address`] is a parsed, validated `ws://` or `wss://` URI.
//!
//! # Example
//!
//! ```
//! use ws_broadcast::Address;
//!
//! # fn main() -> ws_broadcast::Result<()> {
//! let address: Address = "ws://localhost:8080".parse()?;
//! assert_eq!(address.host(), "localhost");
//! assert_eq!(address.port(), 8080);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Scheme
// ============================================================================

/// Socket-oriented URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain WebSocket (`ws://`).
    Ws,
    /// WebSocket over TLS (`wss://`).
    Wss,
}

impl Scheme {
    /// Returns the scheme as written in a URI.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }

    /// Returns the port used when the URI has none.
    #[inline]
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Ws => 80,
            Self::Wss => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Address
// ============================================================================

/// Target of a [`MessageChannel`](super::MessageChannel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    url: Url,
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Address {
    /// Parses and validates a WebSocket URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the input is not a URI, uses a
    /// scheme other than `ws`/`wss`, or has no host.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| Error::invalid_address(input, e.to_string()))?;

        let scheme = match url.scheme() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            other => {
                return Err(Error::invalid_address(
                    input,
                    format!("unsupported scheme '{other}'"),
                ));
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::invalid_address(input, "missing host"))?
            .to_string();

        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self {
            url,
            scheme,
            host,
            port,
        })
    }

    /// Returns the scheme.
    #[inline]
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the host name or IP literal.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, falling back to the scheme default.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the full URI.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.url.into()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ws_with_port() {
        let address = Address::parse("ws://localhost:8080").unwrap();
        assert_eq!(address.scheme(), Scheme::Ws);
        assert_eq!(address.host(), "localhost");
        assert_eq!(address.port(), 8080);
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(Address::parse("ws://example.com").unwrap().port(), 80);
        assert_eq!(Address::parse("wss://example.com/chat").unwrap().port(), 443);
    }

    #[test]
    fn test_ip_literal() {
        let address = Address::parse("ws://127.0.0.1:9000/").unwrap();
        assert_eq!(address.host(), "127.0.0.1");
        assert_eq!(address.port(), 9000);
    }

    #[test]
    fn test_rejects_http() {
        let err = Address::parse("http://localhost:8080").unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { ref reason, .. } if reason.contains("http")));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Address::parse("not a uri"),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_host() {
        assert!(Address::parse("ws://").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let address: Address = serde_json::from_str("\"ws://localhost:9000\"").unwrap();
        assert_eq!(address.port(), 9000);

        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"ws://localhost:9000/\"");

        assert!(serde_json::from_str::<Address>("\"ftp://x\"").is_err());
    }
}
