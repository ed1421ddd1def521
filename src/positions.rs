//! # Position Cache
//!
//! Caches the position-object identifiers owned by the connected account.
//!
//! A `load` goes through four gates, in order:
//!
//! 1. **TTL** (5 min): a valid entry for the same account is served without I/O
//! 2. **In-flight**: a second load for the same account is skipped, not queued
//! 3. **Minimum interval** (30 s): unforced loads soon after a completed fetch are skipped,
//!    even when the entry itself is stale
//! 4. **Fetch**: ids, then one auxiliary lookup per id concurrently
//!
//! A failed refresh keeps the previous entry; only a complete batch is committed.

use crate::cache_view::{publish, set_loading, CacheView, LoadOutcome};
use crate::in_flight::InFlightSet;
use crate::ledger::{LedgerError, LedgerReader};
use crate::metrics;
use crate::notify::Notifier;
use crate::settings::CacheSettings;
use crate::ttl_cache::KeyedCacheEntry;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info};

const CACHE_NAME: &str = "positions";

/// One position owned by the account. `info` is the opaque auxiliary lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub id: String,
    pub info: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct PositionCacheConfig {
    pub ttl: Duration,
    pub min_fetch_interval: Duration,
}

impl Default for PositionCacheConfig {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl From<&CacheSettings> for PositionCacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            ttl: settings.positions_ttl(),
            min_fetch_interval: settings.min_fetch_interval(),
        }
    }
}

pub struct PositionCache {
    ledger: Arc<dyn LedgerReader>,
    notifier: Arc<dyn Notifier>,
    config: PositionCacheConfig,
    account: std::sync::RwLock<Option<String>>,
    entry: Mutex<KeyedCacheEntry<String, Vec<PositionRecord>>>,
    last_fetch: Mutex<Option<Instant>>,
    in_flight: InFlightSet,
    state: watch::Sender<CacheView<Vec<PositionRecord>>>,
}

impl PositionCache {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        notifier: Arc<dyn Notifier>,
        config: PositionCacheConfig,
    ) -> Self {
        let (state, _) = watch::channel(CacheView::default());
        Self {
            ledger,
            notifier,
            config,
            account: std::sync::RwLock::new(None),
            entry: Mutex::new(KeyedCacheEntry::default()),
            last_fetch: Mutex::new(None),
            in_flight: InFlightSet::new(),
            state,
        }
    }

    /// Switch the account the cache serves. Does not fetch; call `load` afterwards.
    pub fn on_inputs_changed(&self, account: Option<String>) {
        let changed = {
            let mut current = self.account.write().unwrap_or_else(|e| e.into_inner());
            if *current == account {
                false
            } else {
                *current = account;
                true
            }
        };
        if changed {
            publish(&self.state, Vec::new(), false, None);
        }
    }

    pub fn account(&self) -> Option<String> {
        self.account
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheView<Vec<PositionRecord>>> {
        self.state.subscribe()
    }

    pub fn data(&self) -> Vec<PositionRecord> {
        self.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn position_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .data
            .iter()
            .map(|record| record.id.clone())
            .collect()
    }

    /// Alias of [`PositionCache::load`] matching the UI-facing `refresh(force?)`.
    pub async fn refresh(&self, force_refresh: bool) -> LoadOutcome {
        self.load(force_refresh).await
    }

    pub async fn load(&self, force_refresh: bool) -> LoadOutcome {
        let Some(account) = self.account() else {
            publish(&self.state, Vec::new(), false, None);
            return LoadOutcome::MissingInput;
        };

        let now = Instant::now();
        let cache_key = format!("positions-{}", account);

        if !force_refresh {
            let entry = self.entry.lock().await;
            if entry.is_valid_for(&account, self.config.ttl, now) {
                debug!("Using cached positions for {}", account);
                metrics::increment_cache_hit(CACHE_NAME);
                publish(&self.state, entry.data().clone(), false, entry.entry.timestamp);
                return LoadOutcome::Cached;
            }
        }

        if self.in_flight.contains(&cache_key) {
            debug!("Positions request already pending for {}, skipping", account);
            metrics::increment_inflight_skip(CACHE_NAME);
            return LoadOutcome::AlreadyInFlight;
        }

        if !force_refresh {
            let last_fetch = self.last_fetch.lock().await;
            if let Some(last) = *last_fetch {
                if now.saturating_duration_since(last) < self.config.min_fetch_interval {
                    debug!(
                        "Positions fetched {:?} ago for {}, below minimum interval",
                        now.saturating_duration_since(last),
                        account
                    );
                    return LoadOutcome::RateLimited;
                }
            }
        }

        let Some(_guard) = self.in_flight.acquire(&cache_key) else {
            metrics::increment_inflight_skip(CACHE_NAME);
            return LoadOutcome::AlreadyInFlight;
        };
        metrics::increment_cache_miss(CACHE_NAME);
        set_loading(&self.state, true);

        info!("Loading positions for {}", account);
        let result = self.fetch_positions(&account).await;

        if self.account().as_deref() != Some(account.as_str()) {
            debug!("Account changed while loading positions for {}, discarding", account);
            set_loading(&self.state, false);
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(records) => {
                let fetched_at = Instant::now();
                info!("Loaded {} positions for {}", records.len(), account);
                self.entry
                    .lock()
                    .await
                    .store(account, records.clone(), fetched_at);
                *self.last_fetch.lock().await = Some(fetched_at);
                publish(&self.state, records, false, Some(fetched_at));
                LoadOutcome::Fetched
            }
            Err(e) => {
                error!("Error loading user positions for {}: {}", account, e);
                self.notifier.error("Failed to load user positions");
                set_loading(&self.state, false);
                LoadOutcome::Failed
            }
        }
    }

    async fn fetch_positions(&self, account: &str) -> Result<Vec<PositionRecord>, LedgerError> {
        let start = std::time::Instant::now();
        metrics::increment_remote_call(CACHE_NAME, "get_position_ids");
        let ids = self.ledger.get_position_ids(account).await.map_err(|e| {
            metrics::increment_remote_error(CACHE_NAME, "get_position_ids");
            e
        })?;
        metrics::record_remote_latency(CACHE_NAME, "get_position_ids", start.elapsed());

        let lookups = ids.into_iter().map(|id| async move {
            metrics::increment_remote_call(CACHE_NAME, "get_position_info");
            let info = self.ledger.get_position_info(&id).await?;
            Ok::<_, LedgerError>(PositionRecord { id, info })
        });
        try_join_all(lookups).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{PositionDetail, QuoteKind};
    use crate::notify::NotifyLevel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubLedger {
        ids: Vec<String>,
        id_calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl LedgerReader for StubLedger {
        async fn get_position_ids(&self, _account: &str) -> Result<Vec<String>, LedgerError> {
            self.id_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(LedgerError::Remote("node unavailable".to_string()));
            }
            Ok(self.ids.clone())
        }

        async fn get_position_info(&self, id: &str) -> Result<serde_json::Value, LedgerError> {
            Ok(serde_json::json!({ "py_state_id": format!("state-{}", id) }))
        }

        async fn get_position_detail(&self, _id: &str) -> Result<PositionDetail, LedgerError> {
            Err(LedgerError::Unsupported("detail"))
        }

        async fn get_swap_quote(
            &self,
            _kind: QuoteKind,
            _amount: u64,
            _pool_stats_id: &str,
            _pool_id: &str,
        ) -> Result<f64, LedgerError> {
            Err(LedgerError::Unsupported("quote"))
        }

        async fn get_token_balance(&self, _a: &str, _t: &str) -> Result<String, LedgerError> {
            Err(LedgerError::Unsupported("balance"))
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        errors: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, level: NotifyLevel, _message: &str) {
            if level == NotifyLevel::Error {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn cache_with(ledger: Arc<StubLedger>, notifier: Arc<CountingNotifier>) -> PositionCache {
        let cache = PositionCache::new(ledger, notifier, PositionCacheConfig::default());
        cache.on_inputs_changed(Some("0xabc".to_string()));
        cache
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_account_short_circuits() {
        let ledger = Arc::new(StubLedger::default());
        let cache = PositionCache::new(
            ledger.clone(),
            Arc::new(CountingNotifier::default()),
            PositionCacheConfig::default(),
        );
        assert_eq!(cache.load(true).await, LoadOutcome::MissingInput);
        assert_eq!(ledger.id_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_issue_one_remote_call() {
        let ledger = Arc::new(StubLedger {
            ids: vec!["p1".to_string(), "p2".to_string()],
            ..Default::default()
        });
        let cache = cache_with(ledger.clone(), Arc::new(CountingNotifier::default()));

        let (first, second) = tokio::join!(cache.load(false), cache.load(false));
        assert_eq!(first, LoadOutcome::Fetched);
        assert_eq!(second, LoadOutcome::AlreadyInFlight);
        assert_eq!(ledger.id_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.position_ids(), vec!["p1", "p2"]);
        assert_eq!(
            cache.data()[0].info,
            serde_json::json!({ "py_state_id": "state-p1" })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_entry() {
        let ledger = Arc::new(StubLedger {
            ids: vec!["p1".to_string()],
            ..Default::default()
        });
        let notifier = Arc::new(CountingNotifier::default());
        let cache = cache_with(ledger.clone(), notifier.clone());

        assert_eq!(cache.load(false).await, LoadOutcome::Fetched);
        ledger.fail.store(true, Ordering::SeqCst);
        assert_eq!(cache.load(true).await, LoadOutcome::Failed);

        assert_eq!(notifier.errors.load(Ordering::SeqCst), 1);
        assert_eq!(cache.position_ids(), vec!["p1"]);
        assert!(!cache.is_loading());
        assert_eq!(cache.load(false).await, LoadOutcome::Cached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimum_interval_gate_is_independent_of_ttl() {
        let ledger = Arc::new(StubLedger::default());
        let config = PositionCacheConfig {
            ttl: Duration::from_secs(1),
            min_fetch_interval: Duration::from_secs(30),
        };
        let cache = PositionCache::new(ledger.clone(), Arc::new(CountingNotifier::default()), config);
        cache.on_inputs_changed(Some("0xabc".to_string()));

        assert_eq!(cache.load(false).await, LoadOutcome::Fetched);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.load(false).await, LoadOutcome::RateLimited);
        assert_eq!(cache.load(true).await, LoadOutcome::Fetched);
        assert_eq!(ledger.id_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_account_switch_misses_cache() {
        let ledger = Arc::new(StubLedger::default());
        let cache = cache_with(ledger.clone(), Arc::new(CountingNotifier::default()));

        assert_eq!(cache.load(false).await, LoadOutcome::Fetched);
        cache.on_inputs_changed(Some("0xdef".to_string()));
        // different account: TTL hit impossible, but the interval floor still applies
        assert_eq!(cache.load(false).await, LoadOutcome::RateLimited);
        assert_eq!(cache.load(true).await, LoadOutcome::Fetched);
        assert_eq!(ledger.id_calls.load(Ordering::SeqCst), 2);
    }
}
