//! A virtual tuner device bound to one geographic identity.

use std::fmt;
use std::sync::Arc;

use tunemux_backend::{BackendService, Geo};

/// One virtual tuner: a geo, the backend handle serving that geo, and
/// an optional network port.
///
/// The port is `None` when the tuner is reachable only through the
/// multiplexer; the access URL exists only when a port is assigned.
/// Tuners are constructed once at startup and hold no persisted state.
pub struct Tuner {
    /// Geographic identity this tuner serves.
    pub geo: Geo,
    /// Backend region handle created from the geo.
    pub backend: Arc<dyn BackendService>,
    /// Assigned port, absent when multiplexed away.
    pub port: Option<u16>,
    /// Stable identifier for this process run.
    pub uid: String,
    /// Access URL, derived from the bind address and port.
    pub url: Option<String>,
}

impl Tuner {
    /// Construct a tuner; the URL is derived iff a port is assigned.
    pub fn new(
        geo: Geo,
        backend: Arc<dyn BackendService>,
        port: Option<u16>,
        bind_address: &str,
        uid: String,
    ) -> Self {
        let url = port.map(|p| format!("http://{}:{}", bind_address, p));
        Self {
            geo,
            backend,
            port,
            uid,
            url,
        }
    }
}

impl fmt::Debug for Tuner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuner")
            .field("geo", &self.geo)
            .field("port", &self.port)
            .field("uid", &self.uid)
            .field("url", &self.url)
            .finish()
    }
}
