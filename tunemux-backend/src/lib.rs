//! Backend service contracts for the tunemux virtual tuner daemon.
//!
//! This crate defines the types shared between the tunemux daemon and
//! whatever streaming backend it fronts:
//!
//! - [`Geo`]: the geographic identity that selects a backend region
//! - [`Station`]: one lineup entry as delivered by a backend
//! - [`ChannelLabel`]: parsed `<major>[.<minor>]` channel identifier
//! - [`BackendService`]: the capability interface a backend region
//!   exposes (fetch lineup, resolve a channel to a stream locator)
//! - [`GeoProvider`]: auto-detection of a [`Geo`] at startup
//!
//! The daemon only ever talks to a backend through [`BackendService`],
//! so regions are interchangeable and tests can substitute fakes.

pub mod error;
pub mod geo;
pub mod service;
pub mod station;

pub use error::{BackendError, ChannelParseError, GeoError};
pub use geo::Geo;
pub use service::{BackendService, GeoProvider};
pub use station::{ChannelLabel, Station};
