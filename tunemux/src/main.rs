//! tunemux: virtual tuner array daemon.
//!
//! Presents one or more virtual tuner devices to DVR clients, each
//! bound to a geographic backend region, optionally merged behind a
//! single multiplexer device with collision-free channel renumbering.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

mod app;
mod backend;
mod config;
mod logging;
mod multiplexer;
mod topology;
mod tuner;

use app::App;
use backend::{HttpBackend, IpGeoProvider};
use config::Settings;

/// tunemux - virtual tuner array with lineup multiplexing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address device URLs are derived from
    #[arg(short, long)]
    bind_address: Option<String>,

    /// Base port; tuner i is assigned base + i
    #[arg(short, long)]
    port: Option<u16>,

    /// Merge all tuners behind one multiplexer device
    #[arg(long)]
    multiplex: bool,

    /// Keep per-tuner ports open while multiplexing (diagnostics)
    #[arg(long)]
    multiplex_debug: bool,

    /// Renumber merged channels into per-tuner blocks of 100
    #[arg(long)]
    remap: bool,

    /// Geo override as "lat,long" (one tuner)
    #[arg(long)]
    override_location: Option<String>,

    /// Comma-separated postal code overrides (one tuner each)
    #[arg(long)]
    override_zipcodes: Option<String>,

    /// Base URL of the backend streaming service
    #[arg(long)]
    backend_url: Option<String>,

    /// URL of the IP geolocation service
    #[arg(long)]
    geo_service_url: Option<String>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Pass streams through without transcoding
    #[arg(long)]
    direct: bool,

    /// Device identifier base (generated per run when unset)
    #[arg(long)]
    uid: Option<String>,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    tuner: TunerSection,
    #[serde(default)]
    geo: GeoSection,
    #[serde(default)]
    backend: BackendSection,
    #[serde(default)]
    streaming: StreamingSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
struct TunerSection {
    bind_address: Option<String>,
    port: Option<u16>,
    multiplex: Option<bool>,
    multiplex_debug: Option<bool>,
    remap: Option<bool>,
    uid: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct GeoSection {
    override_location: Option<String>,
    override_zipcodes: Option<String>,
    service_url: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct BackendSection {
    url: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct StreamingSection {
    ffmpeg: Option<String>,
    direct: Option<bool>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

fn load_config(path: &PathBuf) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Merge CLI arguments over config file values into final settings.
fn merge_settings(args: &Args, file: &ConfigFile) -> Settings {
    Settings {
        bind_address: args
            .bind_address
            .clone()
            .or_else(|| file.tuner.bind_address.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        base_port: args.port.or(file.tuner.port).unwrap_or(6077),
        multiplex: args.multiplex || file.tuner.multiplex.unwrap_or(false),
        multiplex_debug: args.multiplex_debug || file.tuner.multiplex_debug.unwrap_or(false),
        remap: args.remap || file.tuner.remap.unwrap_or(false),
        override_location: args
            .override_location
            .clone()
            .or_else(|| file.geo.override_location.clone()),
        override_zipcodes: args
            .override_zipcodes
            .clone()
            .or_else(|| file.geo.override_zipcodes.clone()),
        backend_url: args
            .backend_url
            .clone()
            .or_else(|| file.backend.url.clone())
            .unwrap_or_else(|| "http://127.0.0.1:9000/api".to_string()),
        geo_service_url: args
            .geo_service_url
            .clone()
            .or_else(|| file.geo.service_url.clone())
            .unwrap_or_else(|| "http://ip-api.com/json".to_string()),
        ffmpeg: args
            .ffmpeg
            .clone()
            .or_else(|| file.streaming.ffmpeg.clone().map(PathBuf::from)),
        direct: args.direct || file.streaming.direct.unwrap_or(false),
        uid: args.uid.clone().or_else(|| file.tuner.uid.clone()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("tunemux.toml");
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    });
    let file_config = if let Some(config_path) = &config_path {
        match load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };

    // Merge logging configs (command line takes precedence)
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };
    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };

    logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )
    .expect("Failed to initialize logging");

    let settings = merge_settings(&args, &file_config);
    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    info!("tunemux starting...");
    info!("  Bind address: {}", settings.bind_address);
    info!("  Base port: {}", settings.base_port);
    info!("  Multiplex: {}", settings.multiplex);
    info!("  Backend: {}", settings.backend_url);

    let geo_provider = IpGeoProvider::new(settings.geo_service_url.clone());
    let backend_url = settings.backend_url.clone();

    let mut app = App::new(settings);
    if let Err(e) = app
        .start(&geo_provider, |geo| {
            Arc::new(HttpBackend::new(backend_url.clone(), geo.clone()))
        })
        .await
    {
        error!("Startup failed: {}", e);
        return Err(e.into());
    }

    info!("Startup complete");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
