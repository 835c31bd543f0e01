//! Connection identifiers
//!
//! The token exchanged at connection setup: a hyphenated v4 UUID string
//! followed by a NUL, so it travels as a fixed-size buffer.

use std::fmt;
use uuid::Uuid;

/// Bytes in a connection identifier: 36 UUID characters plus a NUL
pub const CONNECTION_ID_LENGTH: usize = 36 + 1;

const UUID_TEXT_LENGTH: usize = CONNECTION_ID_LENGTH - 1;

/// Unique connection identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId([u8; CONNECTION_ID_LENGTH]);

impl ConnectionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        let mut bytes = [0u8; CONNECTION_ID_LENGTH];
        uuid.hyphenated().encode_lower(&mut bytes[..UUID_TEXT_LENGTH]);
        Self(bytes)
    }

    /// Parse an identifier received from a peer
    ///
    /// Accepts exactly `CONNECTION_ID_LENGTH` bytes holding a hyphenated UUID
    /// and a trailing NUL.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != CONNECTION_ID_LENGTH || bytes[UUID_TEXT_LENGTH] != 0 {
            return None;
        }
        let text = std::str::from_utf8(&bytes[..UUID_TEXT_LENGTH]).ok()?;
        let uuid = Uuid::try_parse(text).ok()?;
        Some(Self::from_uuid(uuid))
    }

    /// All bytes, including the trailing NUL
    pub fn as_bytes(&self) -> &[u8; CONNECTION_ID_LENGTH] {
        &self.0
    }

    /// The UUID text without the NUL
    pub fn as_str(&self) -> &str {
        // Only ever filled by `encode_lower`, which writes ASCII.
        std::str::from_utf8(&self.0[..UUID_TEXT_LENGTH]).unwrap_or_default()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.as_str())
    }
}
