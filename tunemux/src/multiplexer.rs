//! Lineup multiplexing and channel routing.
//!
//! The multiplexer merges the lineups of all registered tuners into a
//! single lineup and keeps a channel → backend routing table so stream
//! requests land on the region that owns the channel. When remapping is
//! enabled each tuner's channels are renumbered into a block of 100
//! (`tuner_index * 100 + major`), which keeps merged lineups
//! collision-free for up to 100 majors per region and stays invertible
//! (`tuner_index = new_major / 100`).

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use tunemux_backend::{BackendError, BackendService, ChannelLabel, ChannelParseError, Station};

use crate::tuner::Tuner;

/// Errors surfaced by multiplexer operations.
#[derive(Error, Debug)]
pub enum MultiplexError {
    /// The channel is absent from the current routing table. This is a
    /// caller-sequencing error (no lineup fetched, or the label never
    /// existed), never a connectivity failure.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// A backend call failed; propagated rather than served partially.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A backend published a label the remapper cannot renumber.
    /// Guessing here would reintroduce the collisions remapping exists
    /// to prevent.
    #[error(transparent)]
    BadChannel(#[from] ChannelParseError),
}

type RoutingTable = HashMap<String, Arc<dyn BackendService>>;

/// Aggregate device merging multiple tuners' lineups into one.
///
/// Registration order is significant: a tuner's position in the list is
/// the `tuner_index` the remapper multiplies by. The routing table is a
/// snapshot rebuilt in full on every [`get_stations`](Self::get_stations)
/// call and swapped atomically, so concurrent stream lookups see either
/// the previous or the next complete table, never a mix.
pub struct Multiplexer {
    /// Assigned port; a multiplexer is always independently reachable.
    pub port: u16,
    /// Device identifier, distinct from any tuner's.
    pub uid: String,
    /// Access URL derived from the bind address and port.
    pub url: String,
    remap: bool,
    tuners: RwLock<Vec<Arc<Tuner>>>,
    routing: RwLock<Arc<RoutingTable>>,
    // Serializes lineup fetches; readers of `routing` are not blocked.
    fetch_lock: Mutex<()>,
}

impl Multiplexer {
    /// Create a multiplexer listening conceptually on `port`.
    pub fn new(port: u16, bind_address: &str, uid: String, remap: bool) -> Self {
        if remap {
            warn!("Channel remapping enabled: merged channel numbers will not match the backend's own numbering");
        }
        Self {
            port,
            uid,
            url: format!("http://{}:{}", bind_address, port),
            remap,
            tuners: RwLock::new(Vec::new()),
            routing: RwLock::new(Arc::new(HashMap::new())),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Replace the registered tuner list.
    ///
    /// Prior registrations are discarded, not accumulated. Must be
    /// called before the first lineup fetch.
    pub async fn register(&self, tuners: Vec<Arc<Tuner>>) {
        for tuner in &tuners {
            info!("Registered tuner {} ({}) with multiplexer", tuner.uid, tuner.geo);
        }
        *self.tuners.write().await = tuners;
    }

    /// Fetch and merge every registered tuner's lineup, in order.
    ///
    /// Rebuilds the routing table from scratch and swaps it in only
    /// after every lineup fetched successfully; one failing backend
    /// fails the whole call and leaves the previous table in place.
    pub async fn get_stations(&self) -> Result<Vec<Station>, MultiplexError> {
        let _fetch = self.fetch_lock.lock().await;

        let tuners: Vec<Arc<Tuner>> = self.tuners.read().await.clone();
        let mut merged = Vec::new();
        let mut routing = RoutingTable::new();

        for (tuner_index, tuner) in tuners.iter().enumerate() {
            let mut lineup = tuner.backend.get_lineup().await?;
            for station in &mut lineup {
                if self.remap {
                    let (channel, call_sign) = remap(station, tuner_index)?;
                    station.channel = channel;
                    station.call_sign = call_sign;
                }
                routing.insert(station.channel.clone(), Arc::clone(&tuner.backend));
            }
            merged.extend(lineup);
        }

        *self.routing.write().await = Arc::new(routing);
        Ok(merged)
    }

    /// Resolve a merged channel label to a playable stream locator.
    ///
    /// Looks the label up in the most recently built routing table and
    /// delegates to the owning backend.
    pub async fn get_station_stream_uri(&self, channel: &str) -> Result<String, MultiplexError> {
        let routing = Arc::clone(&*self.routing.read().await);
        let backend = routing
            .get(channel)
            .ok_or_else(|| MultiplexError::ChannelNotFound(channel.to_string()))?;
        Ok(backend.resolve_stream(channel).await?)
    }

    /// Number of currently registered tuners.
    pub async fn tuner_count(&self) -> usize {
        self.tuners.read().await.len()
    }
}

/// Renumber one station into its tuner's channel block.
///
/// Returns the new channel label and the display name with the first
/// literal occurrence of the old label replaced. A display name that
/// does not embed the label is returned unchanged; the rename is
/// cosmetic, routing correctness only depends on the label itself.
fn remap(station: &Station, tuner_index: usize) -> Result<(String, String), ChannelParseError> {
    let label: ChannelLabel = station.channel.parse()?;
    let new_label = label
        .with_major(tuner_index as u32 * 100 + label.major)
        .to_string();
    let call_sign = station.call_sign.replacen(&station.channel, &new_label, 1);
    Ok((new_label, call_sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tunemux_backend::Geo;

    struct FakeBackend {
        name: &'static str,
        lineup: Vec<Station>,
        fail: AtomicBool,
    }

    impl FakeBackend {
        fn new(name: &'static str, lineup: Vec<Station>) -> Arc<Self> {
            Arc::new(Self {
                name,
                lineup,
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl BackendService for FakeBackend {
        async fn get_lineup(&self) -> Result<Vec<Station>, BackendError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BackendError::LineupFailed("backend down".to_string()));
            }
            Ok(self.lineup.clone())
        }

        async fn resolve_stream(&self, channel: &str) -> Result<String, BackendError> {
            Ok(format!("http://{}/streams/{}", self.name, channel))
        }
    }

    fn tuner(geo: &str, backend: Arc<dyn BackendService>, uid: &str) -> Arc<Tuner> {
        Arc::new(Tuner::new(
            Geo::zipcode(geo),
            backend,
            None,
            "127.0.0.1",
            uid.to_string(),
        ))
    }

    fn multiplexer(remap: bool) -> Multiplexer {
        Multiplexer::new(6077, "1.2.3.4", "MULTI".to_string(), remap)
    }

    #[test]
    fn test_remap_major_only() {
        let station = Station::new("1", "CBS 1");
        assert_eq!(
            remap(&station, 1).unwrap(),
            ("101".to_string(), "CBS 101".to_string())
        );
    }

    #[test]
    fn test_remap_major_minor() {
        let station = Station::new("2.2", "CBS 2.2");
        assert_eq!(
            remap(&station, 3).unwrap(),
            ("302.2".to_string(), "CBS 302.2".to_string())
        );
    }

    #[test]
    fn test_remap_index_zero_keeps_number() {
        let station = Station::new("7.1", "ABC 7.1");
        assert_eq!(
            remap(&station, 0).unwrap(),
            ("7.1".to_string(), "ABC 7.1".to_string())
        );
    }

    #[test]
    fn test_remap_name_without_label_unchanged() {
        let station = Station::new("4", "Eyewitness News");
        assert_eq!(
            remap(&station, 2).unwrap(),
            ("204".to_string(), "Eyewitness News".to_string())
        );
    }

    #[test]
    fn test_remap_replaces_first_occurrence_only() {
        let station = Station::new("5", "5 News at 5");
        assert_eq!(
            remap(&station, 1).unwrap(),
            ("105".to_string(), "105 News at 5".to_string())
        );
    }

    #[test]
    fn test_remap_preserves_minor_leading_zero() {
        let station = Station::new("9.02", "PBS 9.02");
        assert_eq!(
            remap(&station, 1).unwrap(),
            ("109.02".to_string(), "PBS 109.02".to_string())
        );
    }

    #[test]
    fn test_remap_rejects_malformed_label() {
        let station = Station::new("seven", "Channel Seven");
        assert!(remap(&station, 1).is_err());
    }

    #[test]
    fn test_multiplexer_url() {
        let mp = multiplexer(false);
        assert_eq!(mp.url, "http://1.2.3.4:6077");
        assert_eq!(mp.uid, "MULTI");
        assert_eq!(mp.port, 6077);
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let mp = multiplexer(false);
        let b = FakeBackend::new("a", vec![]);

        mp.register(vec![
            tuner("1", b.clone(), "T_0"),
            tuner("2", b.clone(), "T_1"),
        ])
        .await;
        assert_eq!(mp.tuner_count().await, 2);

        mp.register(vec![tuner("3", b, "T_2")]).await;
        assert_eq!(mp.tuner_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_stations_merges_in_order() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2"), Station::new("4", "NBC 4")]);
        let b1 = FakeBackend::new("west", vec![Station::new("7", "ABC 7")]);

        let mp = multiplexer(false);
        mp.register(vec![tuner("10001", b0, "T_0"), tuner("90210", b1, "T_1")])
            .await;

        let stations = mp.get_stations().await.unwrap();
        let channels: Vec<&str> = stations.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(channels, vec!["2", "4", "7"]);
    }

    #[tokio::test]
    async fn test_routing_reaches_owning_backend() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2")]);
        let b1 = FakeBackend::new("west", vec![Station::new("7", "ABC 7")]);

        let mp = multiplexer(false);
        mp.register(vec![tuner("10001", b0, "T_0"), tuner("90210", b1, "T_1")])
            .await;
        mp.get_stations().await.unwrap();

        assert_eq!(
            mp.get_station_stream_uri("2").await.unwrap(),
            "http://east/streams/2"
        );
        assert_eq!(
            mp.get_station_stream_uri("7").await.unwrap(),
            "http://west/streams/7"
        );
    }

    #[tokio::test]
    async fn test_remapped_routing() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2")]);
        let b1 = FakeBackend::new("west", vec![Station::new("2", "KCBS 2")]);

        let mp = multiplexer(true);
        mp.register(vec![tuner("10001", b0, "T_0"), tuner("90210", b1, "T_1")])
            .await;

        let stations = mp.get_stations().await.unwrap();
        let channels: Vec<&str> = stations.iter().map(|s| s.channel.as_str()).collect();
        assert_eq!(channels, vec!["2", "102"]);
        assert_eq!(stations[1].call_sign, "KCBS 102");

        // Colliding majors route to their own regions after remap.
        assert_eq!(
            mp.get_station_stream_uri("2").await.unwrap(),
            "http://east/streams/2"
        );
        assert_eq!(
            mp.get_station_stream_uri("102").await.unwrap(),
            "http://west/streams/102"
        );
    }

    #[tokio::test]
    async fn test_get_stations_idempotent() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2"), Station::new("2.1", "CBS 2.1")]);

        let mp = multiplexer(true);
        mp.register(vec![tuner("10001", b0, "T_0")]).await;

        let first = mp.get_stations().await.unwrap();
        let second = mp.get_stations().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            mp.get_station_stream_uri("2.1").await.unwrap(),
            "http://east/streams/2.1"
        );
    }

    #[tokio::test]
    async fn test_routing_rebuilt_not_merged() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2")]);
        let b1 = FakeBackend::new("west", vec![Station::new("7", "ABC 7")]);

        let mp = multiplexer(false);
        mp.register(vec![tuner("10001", b0, "T_0")]).await;
        mp.get_stations().await.unwrap();
        assert!(mp.get_station_stream_uri("2").await.is_ok());

        // Re-register with a different tuner; the old channel must
        // disappear from the routing table after the next fetch.
        mp.register(vec![tuner("90210", b1, "T_1")]).await;
        mp.get_stations().await.unwrap();

        assert!(matches!(
            mp.get_station_stream_uri("2").await,
            Err(MultiplexError::ChannelNotFound(_))
        ));
        assert!(mp.get_station_stream_uri("7").await.is_ok());
    }

    #[tokio::test]
    async fn test_lineup_failure_propagates_and_keeps_old_routing() {
        let b0 = FakeBackend::new("east", vec![Station::new("2", "CBS 2")]);

        let mp = multiplexer(false);
        mp.register(vec![tuner("10001", b0.clone(), "T_0")]).await;
        mp.get_stations().await.unwrap();

        b0.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            mp.get_stations().await,
            Err(MultiplexError::Backend(_))
        ));

        // The previous complete table still answers lookups.
        assert_eq!(
            mp.get_station_stream_uri("2").await.unwrap(),
            "http://east/streams/2"
        );
    }

    #[tokio::test]
    async fn test_stream_uri_before_fetch_is_not_found() {
        let mp = multiplexer(false);
        assert!(matches!(
            mp.get_station_stream_uri("2").await,
            Err(MultiplexError::ChannelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_label_fails_remap_fetch() {
        let b0 = FakeBackend::new("east", vec![Station::new("not-a-channel", "Mystery")]);

        let mp = multiplexer(true);
        mp.register(vec![tuner("10001", b0, "T_0")]).await;

        assert!(matches!(
            mp.get_stations().await,
            Err(MultiplexError::BadChannel(_))
        ));
    }
}
