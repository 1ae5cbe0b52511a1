//! Geographic identity for backend region selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A geographic identity driving which backend region a tuner serves.
///
/// Construction modes are mutually exclusive: explicit coordinates, a
/// postal code, or auto-detection (resolved externally at startup).
/// Two values are equal iff they were constructed with the same mode
/// and the same underlying value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geo {
    /// Explicit latitude/longitude pair.
    Coordinates { latitude: f64, longitude: f64 },
    /// A postal code within the backend's coverage.
    Zipcode(String),
    /// Resolved at runtime by a [`crate::GeoProvider`].
    Auto,
}

impl Geo {
    /// Create a Geo from explicit coordinates.
    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Geo::Coordinates {
            latitude,
            longitude,
        }
    }

    /// Create a Geo from a postal code.
    pub fn zipcode(zip: impl Into<String>) -> Self {
        Geo::Zipcode(zip.into())
    }

    /// Returns true if this Geo still needs external resolution.
    pub fn is_auto(&self) -> bool {
        matches!(self, Geo::Auto)
    }
}

impl fmt::Display for Geo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geo::Coordinates {
                latitude,
                longitude,
            } => write!(f, "{},{}", latitude, longitude),
            Geo::Zipcode(zip) => write!(f, "zip {}", zip),
            Geo::Auto => write!(f, "auto-detect"),
        }
    }
}
