//! Merged runtime settings and their validation.

use std::path::PathBuf;

use thiserror::Error;
use tunemux_backend::Geo;

/// Configuration errors, all fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Both geo overrides were given; location would silently win.
    #[error("override_location and override_zipcodes are mutually exclusive")]
    OverrideConflict,

    /// The location override did not parse as `"lat,long"`.
    #[error("Invalid override_location (expected \"lat,long\"): {0:?}")]
    InvalidLocation(String),
}

/// Fully merged settings (CLI over config file over defaults).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address tuner/multiplexer URLs are derived from.
    pub bind_address: String,
    /// Base port; tuner `i` gets `base_port + i`.
    pub base_port: u16,
    /// Merge all tuners behind one multiplexer device.
    pub multiplex: bool,
    /// Keep per-tuner ports open while multiplexing, for diagnostics.
    pub multiplex_debug: bool,
    /// Renumber merged channels into per-tuner blocks of 100.
    pub remap: bool,
    /// `"lat,long"` geo override.
    pub override_location: Option<String>,
    /// Comma-separated postal code overrides.
    pub override_zipcodes: Option<String>,
    /// Base URL of the backend streaming service.
    pub backend_url: String,
    /// URL of the IP geolocation service used for auto-detection.
    pub geo_service_url: String,
    /// Explicit ffmpeg path; `$PATH` is searched when unset.
    pub ffmpeg: Option<PathBuf>,
    /// Pass streams through without transcoding.
    pub direct: bool,
    /// Device identifier base; generated per run when unset.
    pub uid: Option<String>,
}

impl Settings {
    /// Expand the geo overrides into the canonical tuner ordering.
    ///
    /// Empty override strings are treated as unset.
    pub fn geos(&self) -> Result<Vec<Geo>, ConfigError> {
        crate::topology::resolve_geos(
            non_empty(self.override_location.as_deref()),
            non_empty(self.override_zipcodes.as_deref()),
        )
    }

    /// Validate settings that can only fail at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geos().map(|_| ())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
