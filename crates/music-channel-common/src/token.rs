//! Choice token wire format.
//!
//! A choice token is the opaque payload attached to each inline keyboard
//! button offered after a successful transform. Its exact shape is
//! `<trackerID>-<destinationTag>` where the tag is `channel` or `bot`.
//! Anything else is rejected whole; nothing is partially parsed.

use crate::ids::TrackerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '-';

/// Where a redeemed result is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// The configured broadcast channel.
    Channel,
    /// Back to the user who pressed the button.
    #[serde(rename = "bot")]
    Direct,
}

impl Destination {
    /// Wire tag for this destination.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Direct => "bot",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "channel" => Some(Self::Channel),
            "bot" => Some(Self::Direct),
            _ => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Reasons a payload is not a valid choice token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChoiceTokenError {
    #[error("expected exactly two dash-separated parts, found {0}")]
    PartCount(usize),

    #[error("empty tracker id")]
    EmptyTrackerId,

    #[error("unknown destination tag: {0}")]
    UnknownDestination(String),
}

/// A parsed `<trackerID>-<destinationTag>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceToken {
    tracker_id: TrackerId,
    destination: Destination,
}

impl ChoiceToken {
    pub fn new(tracker_id: TrackerId, destination: Destination) -> Self {
        Self {
            tracker_id,
            destination,
        }
    }

    pub fn tracker_id(&self) -> &TrackerId {
        &self.tracker_id
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }
}

impl fmt::Display for ChoiceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.tracker_id, SEPARATOR, self.destination.tag())
    }
}

impl FromStr for ChoiceToken {
    type Err = ChoiceTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [id, tag] = parts.as_slice() else {
            return Err(ChoiceTokenError::PartCount(parts.len()));
        };

        let tracker_id = TrackerId::from_wire(id).ok_or(ChoiceTokenError::EmptyTrackerId)?;
        let destination = Destination::from_tag(tag)
            .ok_or_else(|| ChoiceTokenError::UnknownDestination(tag.to_string()))?;

        Ok(Self::new(tracker_id, destination))
    }
}
