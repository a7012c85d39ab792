//! Fetch-and-cache gateway for flight listings
//!
//! Wraps an upstream flight source behind the in-memory cache. Concurrent
//! callers for the same stale or missing key coalesce onto a single upstream
//! fetch, background warm-up is fire-and-forget, and upstream failures
//! degrade to serving the previous payload when one exists.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore, ClearOutcome};
use crate::config::{ApiCredentials, GatewayConfig};
use crate::data::{FlightBatch, FlightQuery, FlightRecord, FlightsError, SchipholClient};
use crate::filter;

/// Upstream source of flight listings
///
/// `SchipholClient` is the production implementation; tests substitute
/// scripted sources.
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// Fetches the full (possibly multi-page) listing for a query
    async fn fetch(&self, query: &FlightQuery) -> Result<FlightBatch, FlightsError>;
}

#[async_trait]
impl FlightSource for SchipholClient {
    async fn fetch(&self, query: &FlightQuery) -> Result<FlightBatch, FlightsError> {
        self.fetch_all(query).await
    }
}

/// Errors surfaced to gateway callers
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Upstream failed and no cached payload exists; safe to retry
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// What `ensure_warmed` decided to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmOutcome {
    /// Entry missing or stale; a background fetch was scheduled
    Scheduled,
    /// Entry is fresh; nothing to do
    AlreadyFresh,
    /// A background refresh for this key is already running
    AlreadyRefreshing,
    /// Background refresh is disabled by configuration
    Disabled,
}

/// Combined snapshot for the JSON status surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReport {
    /// Cache contents and counters
    pub cache: CacheStats,
    /// Keys with a background refresh currently running
    pub refreshing: Vec<String>,
}

type FetchResult = Result<Vec<FlightRecord>, GatewayError>;

/// Whether this caller runs the upstream fetch or waits on another's
enum FetchRole {
    Leader(broadcast::Sender<FetchResult>),
    Follower(broadcast::Receiver<FetchResult>),
}

/// Fetch-and-cache gateway over an upstream flight source
///
/// Created at process start and never torn down during normal operation.
/// Cloning yields another handle to the same cache, in-flight map, and
/// refresh registry, which is how background tasks share state.
#[derive(Clone)]
pub struct FlightGateway {
    source: Arc<dyn FlightSource>,
    store: CacheStore,
    inflight: Arc<DashMap<String, broadcast::Sender<FetchResult>>>,
    refreshing: Arc<DashMap<String, ()>>,
    config: GatewayConfig,
}

impl FlightGateway {
    /// Creates a gateway over an arbitrary source
    pub fn new(source: Arc<dyn FlightSource>, config: GatewayConfig) -> Self {
        Self {
            source,
            store: CacheStore::new(config.ttl),
            inflight: Arc::new(DashMap::new()),
            refreshing: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Creates a gateway backed by the production Schiphol client
    pub fn with_schiphol(credentials: ApiCredentials, config: GatewayConfig) -> Self {
        let client = SchipholClient::with_timeout(credentials, config.request_timeout);
        Self::new(Arc::new(client), config)
    }

    /// Returns the listing for a query, fetching upstream at most once
    ///
    /// A fresh cached entry is returned directly. Otherwise the fetch is
    /// coalesced with any concurrent fetch for the same key, the
    /// ground-transport filter is applied, and the result is cached. When the
    /// fetch fails and an expired entry survives, that previous payload is
    /// returned unchanged rather than failing the caller.
    pub async fn get(&self, query: &FlightQuery) -> Result<Vec<FlightRecord>, GatewayError> {
        let key = query.cache_key();

        if let Some(cached) = self.store.read(&key) {
            if !cached.is_expired {
                self.store.record_hit();
                debug!(key = %key, records = cached.records.len(), "cache hit");
                return Ok(cached.records);
            }
        }
        self.store.record_miss();

        match self.fetch_coalesced(&key, query).await {
            Ok(records) => Ok(records),
            Err(err) => match self.store.read(&key) {
                Some(stale) => {
                    self.store.record_stale_hit();
                    warn!(key = %key, error = %err, "upstream failed; serving stale cache");
                    Ok(stale.records)
                }
                None => Err(err),
            },
        }
    }

    /// Fetches several queries concurrently
    ///
    /// Returns one result per query, in input order. Queries sharing a cache
    /// key still coalesce onto a single upstream fetch.
    pub async fn get_many(
        &self,
        queries: &[FlightQuery],
    ) -> Vec<Result<Vec<FlightRecord>, GatewayError>> {
        futures::future::join_all(queries.iter().map(|query| self.get(query))).await
    }

    /// Schedules a background fetch if the entry is missing or stale
    ///
    /// Fire-and-forget: never blocks on the upstream. Idempotent per key;
    /// calling it repeatedly while a refresh is running is a no-op. A failed
    /// background fetch leaves the previous payload untouched.
    pub fn ensure_warmed(&self, query: &FlightQuery) -> WarmOutcome {
        if !self.config.background_refresh {
            return WarmOutcome::Disabled;
        }

        let key = query.cache_key();
        if let Some(cached) = self.store.read(&key) {
            if !cached.is_expired {
                return WarmOutcome::AlreadyFresh;
            }
        }

        let registered = match self.refreshing.entry(key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                true
            }
            Entry::Occupied(_) => false,
        };
        if !registered {
            return WarmOutcome::AlreadyRefreshing;
        }

        debug!(key = %key, "scheduling background warm-up");
        let gateway = self.clone();
        let query = query.clone();
        tokio::spawn(async move {
            let key = query.cache_key();
            if let Err(err) = gateway.fetch_coalesced(&key, &query).await {
                warn!(key = %key, error = %err, "background warm-up failed");
            }
            gateway.refreshing.remove(&key);
        });

        WarmOutcome::Scheduled
    }

    /// Keys with a background refresh currently running
    ///
    /// Read-only: checking status never registers or schedules work. Use
    /// `ensure_warmed` to request a refresh.
    pub fn refresh_status(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .refreshing
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Removes one entry, or all entries when `key` is `None`
    pub fn clear(&self, key: Option<&str>) -> ClearOutcome {
        self.store.clear(key)
    }

    /// Snapshot of cache contents and counters
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Combined stats and refresh status for the JSON status surface
    pub fn report(&self) -> GatewayReport {
        GatewayReport {
            cache: self.stats(),
            refreshing: self.refresh_status(),
        }
    }

    /// Runs the upstream fetch for a key, coalescing concurrent callers
    ///
    /// The first caller for a key becomes the leader and performs the fetch;
    /// everyone else arriving before it finishes subscribes to the leader's
    /// broadcast and waits. At most one upstream fetch runs per key.
    async fn fetch_coalesced(&self, key: &str, query: &FlightQuery) -> FetchResult {
        let role = match self.inflight.entry(key.to_string()) {
            Entry::Occupied(occupied) => FetchRole::Follower(occupied.get().subscribe()),
            Entry::Vacant(vacant) => {
                let (tx, _rx) = broadcast::channel(1);
                vacant.insert(tx.clone());
                FetchRole::Leader(tx)
            }
        };

        match role {
            FetchRole::Follower(mut rx) => match rx.recv().await {
                Ok(result) => result,
                // Leader dropped without broadcasting (task aborted)
                Err(_) => Err(GatewayError::UpstreamUnavailable(
                    "in-flight fetch aborted".to_string(),
                )),
            },
            FetchRole::Leader(tx) => {
                let result = self.fetch_and_store(key, query).await;
                self.inflight.remove(key);
                if tx.receiver_count() > 0 {
                    let _ = tx.send(result.clone());
                }
                result
            }
        }
    }

    /// Performs one upstream fetch, filters, and caches the result
    async fn fetch_and_store(&self, key: &str, query: &FlightQuery) -> FetchResult {
        match self.source.fetch(query).await {
            Ok(batch) => {
                let records = filter::exclude_ground_transport(batch.records);
                if batch.partial {
                    warn!(key = %key, pages = batch.pages_fetched, "caching partial flight listing");
                }
                debug!(
                    key = %key,
                    records = records.len(),
                    pages = batch.pages_fetched,
                    "cached upstream fetch"
                );
                self.store.write(key, records.clone(), batch.partial);
                Ok(records)
            }
            Err(err) => Err(GatewayError::UpstreamUnavailable(err.to_string())),
        }
    }
}
