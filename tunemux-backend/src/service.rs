//! Capability traits implemented by backend collaborators.

use async_trait::async_trait;

use crate::error::{BackendError, GeoError};
use crate::geo::Geo;
use crate::station::Station;

/// One backend streaming region.
///
/// A tuner holds exactly one handle; the multiplexer routes per-channel
/// stream requests back through the handle that produced the channel.
/// Implementations may block on network I/O and may fail — callers
/// propagate errors rather than retry.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Fetch the region's current channel lineup, in backend order.
    async fn get_lineup(&self) -> Result<Vec<Station>, BackendError>;

    /// Resolve a channel label to a playable stream locator.
    ///
    /// Fails with [`BackendError::UnknownChannel`] when the backend does
    /// not carry the channel.
    async fn resolve_stream(&self, channel: &str) -> Result<String, BackendError>;
}

/// Auto-detection of a [`Geo`] from the host's network identity.
///
/// Called once at startup for each [`Geo::Auto`] entry; failure is
/// fatal to startup.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Detect the local geographic identity.
    async fn resolve(&self) -> Result<Geo, GeoError>;
}
