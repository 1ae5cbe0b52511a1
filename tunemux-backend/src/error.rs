//! Error types for backend service interactions.

use thiserror::Error;

/// Errors surfaced by a [`crate::BackendService`] implementation.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The channel lineup could not be fetched.
    #[error("Lineup fetch failed: {0}")]
    LineupFailed(String),

    /// The backend does not know the requested channel.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// A stream locator could not be resolved for a known channel.
    #[error("Stream resolution failed for channel {channel}: {reason}")]
    StreamFailed { channel: String, reason: String },

    /// The backend returned a payload that could not be decoded.
    #[error("Failed to decode backend response: {0}")]
    DecodeError(String),
}

/// Errors surfaced by a [`crate::GeoProvider`] implementation.
///
/// Auto-detection happens once at startup; a failure here is fatal for
/// the tuner that needed it.
#[derive(Error, Debug)]
pub enum GeoError {
    /// The detection service could not be reached or answered badly.
    #[error("Geo auto-detection failed: {0}")]
    DetectionFailed(String),
}

/// A channel label did not parse as `<major>[.<minor>]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed channel label: {0:?}")]
pub struct ChannelParseError(pub String);
