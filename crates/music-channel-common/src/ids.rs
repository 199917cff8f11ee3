//! Typed identifier wrappers.
//!
//! Newtypes keep a tracker id from being passed where a chat id is expected,
//! and keep the tracker id format (dash-free, 128-bit random) in one place.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier minted for a job when its transform starts.
///
/// Used as the result cache key and embedded in choice tokens. The textual
/// form is a UUIDv4 in simple (32 hex digit, no dash) notation, so it never
/// contains the choice token separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerId(String);

impl TrackerId {
    /// Mint a fresh, random tracker id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a tracker id received back from the wire.
    ///
    /// Returns `None` for an empty string or one containing `-`.
    pub fn from_wire(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.contains('-') {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-level chat (user or group) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport-level message identifier, unique within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
