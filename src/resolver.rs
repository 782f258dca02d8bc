use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::{MatchRequest, WidgetConfig};
use crate::error::{NotFound, Result, WidgetError};
use crate::model::MatchRecord;
use crate::source::{EventQuery, EventSource, SourceKind, SourceOrder};
use crate::store::{cache_key, MatchStore};

/// What a resolution hands to the renderer.
pub type Outcome = std::result::Result<Resolution, NotFound>;

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Origin {
    Primary,
    LeagueFeed,
    Cache,
}

impl From<SourceKind> for Origin {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Primary => Origin::Primary,
            SourceKind::LeagueFeed => Origin::LeagueFeed,
        }
    }
}

/// A resolved match together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub record: MatchRecord,
    pub origin: Origin,
}

impl Resolution {
    /// True when the record was served from the cache because no live source had it.
    pub fn is_stale(&self) -> bool {
        self.origin == Origin::Cache
    }
}

/// Flights are keyed by match id alone, like the cache, so one match never
/// has two writers regardless of the league it was requested under.
type FlightKey = String;
type Flights = Mutex<HashMap<FlightKey, watch::Receiver<Option<Outcome>>>>;

enum Flight {
    Lead(watch::Sender<Option<Outcome>>),
    Join(watch::Receiver<Option<Outcome>>),
}

/// Resolves match records through the live sources, falling back to the cache.
///
/// Concurrent calls for the same match id share a single resolution, even
/// when they name different leagues; joiners receive the leader's record.
pub struct MatchResolver {
    primary: Arc<dyn EventSource>,
    league_feed: Arc<dyn EventSource>,
    store: Arc<dyn MatchStore>,
    default_league: String,
    fetch_timeout: Duration,
    order: SourceOrder,
    in_flight: Flights,
}

impl MatchResolver {
    /// Create a resolver with the default league, timeout and source order.
    pub fn new(
        primary: Arc<dyn EventSource>,
        league_feed: Arc<dyn EventSource>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self::from_config(&WidgetConfig::default(), primary, league_feed, store)
    }

    pub fn from_config(
        config: &WidgetConfig,
        primary: Arc<dyn EventSource>,
        league_feed: Arc<dyn EventSource>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self {
            primary,
            league_feed,
            store,
            default_league: config.default_league.clone(),
            fetch_timeout: config.fetch_timeout,
            order: config.source_order,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_source_order(mut self, order: SourceOrder) -> Self {
        self.order = order;
        self
    }

    pub fn default_league(&self) -> &str {
        &self.default_league
    }

    /// Resolve the freshest available record for `request`.
    ///
    /// A fresh record is persisted before the optional sub-event filter is
    /// applied. A stale record is returned exactly as it was persisted.
    #[instrument(skip(self, request), fields(match_id = %request.match_id, league_id = ?request.league_id))]
    pub async fn resolve(&self, request: &MatchRequest) -> Outcome {
        let league_id = request
            .league_id
            .as_deref()
            .unwrap_or(&self.default_league);
        let mut resolution = self.resolve_shared(league_id, &request.match_id).await?;
        if let Some(sub_event_id) = &request.sub_event_id {
            if !resolution.is_stale() {
                resolution.record.retain_sub_event(sub_event_id);
            }
        }
        Ok(resolution)
    }

    /// Join an in-flight resolution of the same match, or lead a new one.
    async fn resolve_shared(&self, league_id: &str, match_id: &str) -> Outcome {
        let key: FlightKey = match_id.to_owned();
        loop {
            let role = {
                let mut flights = self.flights();
                match flights.get(&key) {
                    Some(rx) => Flight::Join(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        flights.insert(key.clone(), rx);
                        Flight::Lead(tx)
                    }
                }
            };

            match role {
                Flight::Lead(tx) => {
                    let _flight = FlightGuard {
                        flights: &self.in_flight,
                        key: &key,
                    };
                    let outcome = self.resolve_chain(league_id, match_id).await;
                    tx.send_replace(Some(outcome.clone()));
                    return outcome;
                }
                Flight::Join(mut rx) => {
                    debug!(league_id, match_id, "joining in-flight resolution");
                    let shared = rx.wait_for(Option::is_some).await.map(|v| (*v).clone());
                    match shared {
                        Ok(Some(outcome)) => return outcome,
                        // The leader was cancelled before finishing; try again.
                        _ => continue,
                    }
                }
            }
        }
    }

    async fn resolve_chain(&self, league_id: &str, match_id: &str) -> Outcome {
        for kind in self.order.steps() {
            match self.lookup(kind, league_id, match_id).await {
                Ok(record) => {
                    self.persist(match_id, &record).await;
                    info!(league_id, match_id, %kind, "resolved match");
                    return Ok(Resolution {
                        record,
                        origin: kind.into(),
                    });
                }
                Err(e @ WidgetError::NoMatchInResponse { .. }) => debug!(error = %e, "falling back"),
                Err(e) => warn!(error = %e, "source lookup failed, falling back"),
            }
        }

        let key = cache_key(match_id);
        match self.store.get(&key).await {
            Ok(Some(record)) => {
                info!(league_id, match_id, "serving stale match from cache");
                Ok(Resolution {
                    record,
                    origin: Origin::Cache,
                })
            }
            Ok(None) => {
                info!(league_id, match_id, "no data for match");
                Err(NotFound {
                    match_id: match_id.to_owned(),
                })
            }
            Err(e) => {
                warn!(error = %e, "cache unavailable, treating as miss");
                Err(NotFound {
                    match_id: match_id.to_owned(),
                })
            }
        }
    }

    async fn lookup(&self, kind: SourceKind, league_id: &str, match_id: &str) -> Result<MatchRecord> {
        let (source, query) = match kind {
            SourceKind::Primary => (
                &self.primary,
                EventQuery {
                    league_id,
                    match_id: Some(match_id),
                },
            ),
            SourceKind::LeagueFeed => (
                &self.league_feed,
                EventQuery {
                    league_id,
                    match_id: None,
                },
            ),
        };

        let feed = tokio::time::timeout(self.fetch_timeout, source.fetch_events(&query))
            .await
            .map_err(|_| WidgetError::Timeout {
                source_kind: kind,
                after: self.fetch_timeout,
            })??;

        let event = feed
            .take_event(match_id)?
            .ok_or_else(|| WidgetError::NoMatchInResponse {
                source_kind: kind,
                match_id: match_id.to_owned(),
            })?;
        event.into_record(league_id)
    }

    async fn persist(&self, match_id: &str, record: &MatchRecord) {
        let key = cache_key(match_id);
        if let Err(e) = self.store.set(&key, record).await {
            warn!(key, error = %e, "failed to persist match record");
        }
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<FlightKey, watch::Receiver<Option<Outcome>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a flight entry when its leader finishes or is dropped.
struct FlightGuard<'a> {
    flights: &'a Flights,
    key: &'a FlightKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.key);
    }
}
