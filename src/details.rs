//! # Detail Cache
//!
//! Enriched, display-ready records for a set of position ids.
//!
//! Staleness is keyed: an entry is served only if it is within the TTL *and*
//! was produced from exactly the requested id set (order-insensitive). Loads
//! are debounced so a burst of id-list changes collapses into one batch fetch
//! using the last call's ids. A failing per-id lookup degrades to a zero-valued
//! record instead of failing the batch.

use crate::cache_view::{publish, set_loading, CacheView, LoadOutcome};
use crate::debounce::Debouncer;
use crate::in_flight::InFlightSet;
use crate::ledger::{LedgerReader, PositionDetail};
use crate::metrics;
use crate::settings::CacheSettings;
use crate::ttl_cache::KeyedCacheEntry;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const CACHE_NAME: &str = "detailed_positions";

/// Order-insensitive identity of a requested id list.
pub type PositionIdSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: String,
    pub description: String,
    pub expiry_days: String,
    pub pt_balance_display: String,
    pub yt_balance_display: String,
    pub yield_token: String,
    pub py_state_id: String,
}

impl DetailRecord {
    /// Zero-valued record standing in for an id whose lookup failed.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            description: String::new(),
            expiry_days: "0".to_string(),
            pt_balance_display: "0".to_string(),
            yt_balance_display: "0".to_string(),
            yield_token: String::new(),
            py_state_id: String::new(),
        }
    }

    pub fn from_detail(id: &str, detail: PositionDetail) -> Self {
        let non_empty = |value: Option<String>, fallback: &str| {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            id: id.to_string(),
            description: non_empty(detail.description, ""),
            expiry_days: non_empty(detail.expiry_days, "0"),
            pt_balance_display: non_empty(detail.pt_balance_display, "0"),
            yt_balance_display: non_empty(detail.yt_balance_display, "0"),
            yield_token: non_empty(detail.yield_token, ""),
            py_state_id: non_empty(detail.state_id, ""),
        }
    }
}

/// In-flight key for an id set: `detailed-` + sorted ids joined by commas.
pub fn detail_request_key(ids: &PositionIdSet) -> String {
    let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
    format!("detailed-{}", joined.join(","))
}

#[derive(Debug, Clone)]
pub struct DetailCacheConfig {
    pub ttl: Duration,
    pub debounce: Duration,
}

impl Default for DetailCacheConfig {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl From<&CacheSettings> for DetailCacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            ttl: settings.detailed_positions_ttl(),
            debounce: settings.debounce_delay(),
        }
    }
}

struct DetailInner {
    ledger: Arc<dyn LedgerReader>,
    entry: Mutex<KeyedCacheEntry<PositionIdSet, Vec<DetailRecord>>>,
    /// Most recently requested id set; completed batches for any other set are dropped.
    latest_request: Mutex<PositionIdSet>,
    in_flight: InFlightSet,
    state: watch::Sender<CacheView<Vec<DetailRecord>>>,
}

pub struct DetailCache {
    inner: Arc<DetailInner>,
    config: DetailCacheConfig,
    debouncer: Debouncer,
}

impl DetailCache {
    pub fn new(ledger: Arc<dyn LedgerReader>, config: DetailCacheConfig) -> Self {
        let (state, _) = watch::channel(CacheView::default());
        Self {
            inner: Arc::new(DetailInner {
                ledger,
                entry: Mutex::new(KeyedCacheEntry::default()),
                latest_request: Mutex::new(PositionIdSet::new()),
                in_flight: InFlightSet::new(),
                state,
            }),
            config,
            debouncer: Debouncer::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheView<Vec<DetailRecord>>> {
        self.inner.state.subscribe()
    }

    pub fn data(&self) -> Vec<DetailRecord> {
        self.inner.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Cancel a pending debounced fetch (unmount).
    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    pub async fn load(&self, ids: &[String], force_refresh: bool) -> LoadOutcome {
        if ids.is_empty() {
            self.debouncer.cancel();
            *self.inner.latest_request.lock().await = PositionIdSet::new();
            publish(&self.inner.state, Vec::new(), false, None);
            return LoadOutcome::MissingInput;
        }

        let requested: PositionIdSet = ids.iter().cloned().collect();
        let now = Instant::now();
        *self.inner.latest_request.lock().await = requested.clone();

        if !force_refresh {
            let entry = self.inner.entry.lock().await;
            if entry.is_valid_for(&requested, self.config.ttl, now) {
                debug!("Using cached detailed positions ({} ids)", requested.len());
                metrics::increment_cache_hit(CACHE_NAME);
                self.debouncer.cancel();
                publish(
                    &self.inner.state,
                    entry.data().clone(),
                    false,
                    entry.entry.timestamp,
                );
                return LoadOutcome::Cached;
            }
        }

        let request_key = detail_request_key(&requested);
        if self.inner.in_flight.contains(&request_key) {
            debug!("Detailed positions request already pending, skipping");
            metrics::increment_inflight_skip(CACHE_NAME);
            self.debouncer.cancel();
            return LoadOutcome::AlreadyInFlight;
        }

        let inner = self.inner.clone();
        self.debouncer.schedule(self.config.debounce, async move {
            inner.fetch_batch(requested, request_key).await;
        });
        LoadOutcome::Scheduled
    }
}

impl DetailInner {
    async fn fetch_batch(&self, requested: PositionIdSet, request_key: String) -> LoadOutcome {
        let Some(_guard) = self.in_flight.acquire(&request_key) else {
            metrics::increment_inflight_skip(CACHE_NAME);
            return LoadOutcome::AlreadyInFlight;
        };
        metrics::increment_cache_miss(CACHE_NAME);
        set_loading(&self.state, true);

        info!("Loading detailed positions ({} ids)", requested.len());
        let lookups = requested.iter().map(|id| async move {
            metrics::increment_remote_call(CACHE_NAME, "get_position_detail");
            match self.ledger.get_position_detail(id).await {
                Ok(detail) => DetailRecord::from_detail(id, detail),
                Err(e) => {
                    metrics::increment_remote_error(CACHE_NAME, "get_position_detail");
                    warn!("Failed to get details for position {}: {}", id, e);
                    DetailRecord::placeholder(id)
                }
            }
        });
        let records = join_all(lookups).await;

        if *self.latest_request.lock().await != requested {
            debug!("Detailed positions for a superseded id set arrived, discarding");
            set_loading(&self.state, false);
            return LoadOutcome::Discarded;
        }

        let fetched_at = Instant::now();
        self.entry
            .lock()
            .await
            .store(requested, records.clone(), fetched_at);
        publish(&self.state, records, false, Some(fetched_at));
        info!("Detailed positions loaded");
        LoadOutcome::Fetched
    }
}
