//! Lineup entry and channel label types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChannelParseError;

/// One entry in a backend channel lineup.
///
/// Only the channel label and display name are interpreted by the
/// daemon; every other backend field is carried opaquely in `extra`
/// and round-trips unchanged through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Channel label, `<major>` or `<major>.<minor>` (e.g. `"7"`, `"7.1"`).
    pub channel: String,
    /// Display name, conventionally embedding the channel label.
    #[serde(rename = "callSign")]
    pub call_sign: String,
    /// Backend-specific fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Station {
    /// Create a station with no extra backend fields.
    pub fn new(channel: impl Into<String>, call_sign: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            call_sign: call_sign.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A parsed channel label.
///
/// The minor part is kept verbatim (including leading zeros) so that
/// re-rendering the label never alters what the backend published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLabel {
    /// Major channel number.
    pub major: u32,
    /// Minor suffix after the first `.`, if any.
    pub minor: Option<String>,
}

impl ChannelLabel {
    /// Returns the label with the major number replaced, minor kept.
    pub fn with_major(&self, major: u32) -> ChannelLabel {
        ChannelLabel {
            major,
            minor: self.minor.clone(),
        }
    }
}

impl FromStr for ChannelLabel {
    type Err = ChannelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major_part, minor) = match s.split_once('.') {
            Some((major, minor)) if !minor.is_empty() => (major, Some(minor.to_string())),
            Some(_) => return Err(ChannelParseError(s.to_string())),
            None => (s, None),
        };

        let major: u32 = major_part
            .parse()
            .map_err(|_| ChannelParseError(s.to_string()))?;

        Ok(ChannelLabel { major, minor })
    }
}

impl fmt::Display for ChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}
