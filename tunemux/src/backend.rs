//! HTTP implementations of the backend collaborator traits.
//!
//! The only networked code in the daemon. Everything else reaches these
//! through the [`BackendService`] / [`GeoProvider`] traits, so the core
//! never depends on the wire details here.

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;

use tunemux_backend::{BackendError, BackendService, Geo, GeoError, GeoProvider, Station};

/// Backend region client speaking the JSON lineup/stream API.
///
/// One client per [`Geo`]; the geo is sent as query parameters on every
/// request so the backend scopes its answers to that region.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    geo: Geo,
}

impl HttpBackend {
    /// Create a client for one backend region.
    pub fn new(base_url: impl Into<String>, geo: Geo) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            geo,
        }
    }

    fn geo_query(&self) -> Vec<(&'static str, String)> {
        match &self.geo {
            Geo::Coordinates {
                latitude,
                longitude,
            } => vec![
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
            ],
            Geo::Zipcode(zip) => vec![("zipcode", zip.clone())],
            // Auto geos are resolved before any backend is constructed.
            Geo::Auto => vec![],
        }
    }
}

#[async_trait]
impl BackendService for HttpBackend {
    async fn get_lineup(&self) -> Result<Vec<Station>, BackendError> {
        let url = format!("{}/lineup", self.base_url);
        debug!("Fetching lineup from {} ({})", url, self.geo);

        let response = self
            .client
            .get(&url)
            .query(&self.geo_query())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BackendError::LineupFailed(e.to_string()))?;

        response
            .json::<Vec<Station>>()
            .await
            .map_err(|e| BackendError::DecodeError(e.to_string()))
    }

    async fn resolve_stream(&self, channel: &str) -> Result<String, BackendError> {
        let url = format!("{}/stations/{}/stream", self.base_url, channel);
        debug!("Resolving stream for channel {} via {}", channel, url);

        let response = self
            .client
            .get(&url)
            .query(&self.geo_query())
            .send()
            .await
            .map_err(|e| BackendError::StreamFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::UnknownChannel(channel.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| BackendError::StreamFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let body: StreamResponse = response
            .json()
            .await
            .map_err(|e| BackendError::DecodeError(e.to_string()))?;
        Ok(body.stream_url)
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(rename = "streamUrl")]
    stream_url: String,
}

/// Geo auto-detection against an ip-api style JSON endpoint.
pub struct IpGeoProvider {
    client: reqwest::Client,
    service_url: String,
}

impl IpGeoProvider {
    /// Create a provider querying `service_url`.
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            service_url: service_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpGeoResponse {
    lat: f64,
    lon: f64,
}

#[async_trait]
impl GeoProvider for IpGeoProvider {
    async fn resolve(&self) -> Result<Geo, GeoError> {
        let response = self
            .client
            .get(&self.service_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GeoError::DetectionFailed(e.to_string()))?;

        let body: IpGeoResponse = response
            .json()
            .await
            .map_err(|e| GeoError::DetectionFailed(e.to_string()))?;

        debug!("Auto-detected location: {},{}", body.lat, body.lon);
        Ok(Geo::coordinates(body.lat, body.lon))
    }
}
