//! Startup orchestration.
//!
//! Ties the pieces together in a fixed order: resolve geos, plan the
//! port topology, construct one tuner per geo, construct and populate
//! the multiplexer when enabled, then report what came up. Backends and
//! geo detection are reached only through their traits so the sequence
//! is testable without a network.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use uuid::Uuid;

use tunemux_backend::{BackendService, Geo, GeoError, GeoProvider};

use crate::config::{ConfigError, Settings};
use crate::multiplexer::Multiplexer;
use crate::topology::Topology;
use crate::tuner::Tuner;

/// Fatal startup failures.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// The assembled daemon: geos, tuners, and the optional multiplexer.
pub struct App {
    settings: Settings,
    uid: String,
    /// Resolved geos, in canonical tuner order.
    pub geos: Vec<Geo>,
    /// One tuner per geo, same order.
    pub tuners: Vec<Arc<Tuner>>,
    /// Present iff multiplexing is enabled.
    pub multiplexer: Option<Arc<Multiplexer>>,
}

impl App {
    /// Create an unstarted app from validated settings.
    pub fn new(settings: Settings) -> Self {
        let uid = settings
            .uid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            settings,
            uid,
            geos: Vec::new(),
            tuners: Vec::new(),
            multiplexer: None,
        }
    }

    /// Run the startup sequence.
    ///
    /// `backend_factory` builds the backend handle for one geo; the
    /// daemon passes an HTTP client constructor, tests pass fakes.
    pub async fn start<F>(
        &mut self,
        geo_provider: &dyn GeoProvider,
        backend_factory: F,
    ) -> Result<(), StartupError>
    where
        F: Fn(&Geo) -> Arc<dyn BackendService>,
    {
        self.init_geos(geo_provider).await?;

        let topology = Topology::plan(
            self.geos.len(),
            self.settings.multiplex,
            self.settings.multiplex_debug,
            self.settings.base_port,
        );

        self.init_tuners(&topology, &backend_factory);
        self.init_multiplexer(&topology).await;
        self.check_ffmpeg();
        self.report();
        Ok(())
    }

    /// Expand overrides and resolve any auto-detect geo.
    async fn init_geos(&mut self, geo_provider: &dyn GeoProvider) -> Result<(), StartupError> {
        let mut geos = self.settings.geos()?;
        for geo in &mut geos {
            if geo.is_auto() {
                *geo = geo_provider.resolve().await?;
                info!("Auto-detected geo: {}", geo);
            }
        }
        self.geos = geos;
        Ok(())
    }

    /// Construct one tuner per geo with its planned port.
    fn init_tuners<F>(&mut self, topology: &Topology, backend_factory: &F)
    where
        F: Fn(&Geo) -> Arc<dyn BackendService>,
    {
        self.tuners = self
            .geos
            .iter()
            .enumerate()
            .map(|(index, geo)| {
                Arc::new(Tuner::new(
                    geo.clone(),
                    backend_factory(geo),
                    topology.tuner_port(index),
                    &self.settings.bind_address,
                    format!("{}_{}", self.uid, index),
                ))
            })
            .collect();
    }

    /// Construct the multiplexer and hand it the tuner list.
    async fn init_multiplexer(&mut self, topology: &Topology) {
        let Some(port) = topology.multiplexer_port() else {
            return;
        };

        let multiplexer = Arc::new(Multiplexer::new(
            port,
            &self.settings.bind_address,
            self.uid.clone(),
            self.settings.remap,
        ));
        multiplexer.register(self.tuners.clone()).await;
        self.multiplexer = Some(multiplexer);
    }

    /// Locate the transcoder binary; absence downgrades to passthrough.
    fn check_ffmpeg(&self) {
        if self.settings.direct {
            return;
        }

        let target = self
            .settings
            .ffmpeg
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        match which::which(&target) {
            Ok(path) => info!("Using ffmpeg at {}", path.display()),
            Err(_) => warn!(
                "ffmpeg not found ({}); streams will be passed through untranscoded",
                target.display()
            ),
        }
    }

    /// One line per device describing how it is reachable.
    fn report(&self) {
        info!("tunemux configured with {} tuner(s)", self.tuners.len());
        for tuner in &self.tuners {
            match &tuner.url {
                Some(url) => info!("  Tuner {} ({}): {}", tuner.uid, tuner.geo, url),
                None => info!("  Tuner {} ({}): via multiplexer", tuner.uid, tuner.geo),
            }
        }
        if let Some(multiplexer) = &self.multiplexer {
            info!("  Multiplexer {}: {}", multiplexer.uid, multiplexer.url);
        }
    }
}
