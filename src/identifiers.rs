//! Type-safe identifiers.
//!
//! Newtype wrappers keep server-side peer IDs from mixing with other
//! UUIDs at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ClientId
// ============================================================================

/// Identifier of one peer connected to a broadcast server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generates a new random identifier.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the display name handed out for this peer.
    ///
    /// Format: `guest-` followed by the first 8 hex digits of the UUID.
    #[must_use]
    pub fn display_name(&self) -> String {
        let simple = self.0.simple().to_string();
        format!("guest-{}", &simple[..8])
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ClientId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    #[test]
    fn test_display_name() {
        let id = ClientId::from(Uuid::parse_str("0123abcd-0000-4000-8000-000000000000").unwrap());
        assert_eq!(id.display_name(), "guest-0123abcd");
    }

    #[test]
    fn test_serde_transparent() {
        let id = ClientId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
