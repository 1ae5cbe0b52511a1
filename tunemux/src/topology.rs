//! Tuner topology planning.
//!
//! Pure computations that decide, before anything is constructed, how
//! many tuner devices exist, which geographic identity each one serves,
//! and which network port each device owns. Ports must never collide:
//! the multiplexer is always placed one slot past the highest tuner
//! slot, whether or not the tuners occupy theirs.

use tunemux_backend::Geo;

use crate::config::ConfigError;

/// Port layout for a set of tuners and an optional multiplexer.
///
/// Deterministic in its inputs; holds no state beyond them.
#[derive(Debug, Clone, Copy)]
pub struct Topology {
    tuner_count: usize,
    multiplex: bool,
    multiplex_debug: bool,
    base_port: u16,
}

impl Topology {
    /// Plan the port layout for `tuner_count` tuners.
    pub fn plan(tuner_count: usize, multiplex: bool, multiplex_debug: bool, base_port: u16) -> Self {
        Self {
            tuner_count,
            multiplex,
            multiplex_debug,
            base_port,
        }
    }

    /// Port for the tuner at `index` (0-based position in the geo list).
    ///
    /// `None` means the tuner is reachable only through the multiplexer.
    /// In multiplex-debug mode tuners keep their own ports for
    /// per-region diagnostics.
    pub fn tuner_port(&self, index: usize) -> Option<u16> {
        if !self.multiplex || self.multiplex_debug {
            Some(self.base_port + index as u16)
        } else {
            None
        }
    }

    /// Port for the multiplexer; `None` when multiplexing is disabled.
    ///
    /// Always `base_port + tuner_count`, one past the highest tuner
    /// slot, so it cannot collide with any tuner port.
    pub fn multiplexer_port(&self) -> Option<u16> {
        if self.multiplex {
            Some(self.base_port + self.tuner_count as u16)
        } else {
            None
        }
    }
}

/// Expand geo override configuration into the canonical tuner ordering.
///
/// - `override_location` set: exactly one Geo with those coordinates.
/// - `override_zipcodes` set: one Geo per comma-separated postal code,
///   trimmed, input order preserved, duplicates kept.
/// - Neither: one auto-detect Geo.
///
/// Both set at once is a configuration conflict and fails loudly; the
/// returned ordering is the tuner index used everywhere else.
pub fn resolve_geos(
    override_location: Option<&str>,
    override_zipcodes: Option<&str>,
) -> Result<Vec<Geo>, ConfigError> {
    match (override_location, override_zipcodes) {
        (Some(_), Some(_)) => Err(ConfigError::OverrideConflict),
        (Some(location), None) => Ok(vec![parse_location(location)?]),
        (None, Some(zipcodes)) => Ok(zipcodes
            .split(',')
            .map(|zip| Geo::zipcode(zip.trim()))
            .collect()),
        (None, None) => Ok(vec![Geo::Auto]),
    }
}

/// Parse a `"lat,long"` override string.
fn parse_location(location: &str) -> Result<Geo, ConfigError> {
    let invalid = || ConfigError::InvalidLocation(location.to_string());

    let (lat, long) = location.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = long.trim().parse().map_err(|_| invalid())?;

    Ok(Geo::coordinates(latitude, longitude))
}
