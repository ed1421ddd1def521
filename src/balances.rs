//! # Balance Cache
//!
//! Underlying-token and SY balances of the connected account for one market.
//! Loaded once per mount or `(account, pool)` change, and force-refreshed by
//! the write handlers after a confirmed transaction.

use crate::cache_view::{publish, set_loading, CacheView, LoadOutcome};
use crate::in_flight::InFlightSet;
use crate::ledger::{LedgerError, LedgerReader};
use crate::metrics;
use crate::notify::Notifier;
use crate::settings::{find_pool, PoolConfig};
use crate::ttl_cache::KeyedCacheEntry;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const CACHE_NAME: &str = "balances";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenBalances {
    /// Underlying yield-bearing token
    pub underlying: Decimal,
    pub sy: Decimal,
}

/// `(account, pool_id)`
pub type BalanceKey = (String, String);

/// Node balance string to a decimal. An empty string counts as zero.
pub fn parse_balance(raw: &str) -> Result<Decimal, LedgerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed)
        .map_err(|e| LedgerError::Decode(format!("balance {:?}: {}", trimmed, e)))
}

#[derive(Debug, Clone, Default)]
struct BalanceInputs {
    account: Option<String>,
    pool_id: Option<String>,
}

pub struct BalanceCache {
    ledger: Arc<dyn LedgerReader>,
    notifier: Arc<dyn Notifier>,
    pools: Arc<[PoolConfig]>,
    inputs: RwLock<BalanceInputs>,
    initialized: AtomicBool,
    entry: Mutex<KeyedCacheEntry<BalanceKey, TokenBalances>>,
    in_flight: InFlightSet,
    state: watch::Sender<CacheView<TokenBalances>>,
}

impl BalanceCache {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        notifier: Arc<dyn Notifier>,
        pools: Arc<[PoolConfig]>,
    ) -> Self {
        let (state, _) = watch::channel(CacheView::default());
        Self {
            ledger,
            notifier,
            pools,
            inputs: RwLock::new(BalanceInputs::default()),
            initialized: AtomicBool::new(false),
            entry: Mutex::new(KeyedCacheEntry::default()),
            in_flight: InFlightSet::new(),
            state,
        }
    }

    /// New account or pool: the next `load_once` fetches again.
    pub fn on_inputs_changed(&self, account: Option<String>, pool_id: Option<String>) {
        let mut inputs = self.inputs.write().unwrap_or_else(|e| e.into_inner());
        if inputs.account != account || inputs.pool_id != pool_id {
            inputs.account = account;
            inputs.pool_id = pool_id;
            self.initialized.store(false, Ordering::SeqCst);
            publish(&self.state, TokenBalances::default(), false, None);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheView<TokenBalances>> {
        self.state.subscribe()
    }

    pub fn data(&self) -> TokenBalances {
        self.state.borrow().data
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Fetch once for the current inputs; later calls are no-ops until the inputs change.
    pub async fn load_once(&self) -> Option<LoadOutcome> {
        let inputs = self.current_inputs();
        if inputs.account.is_none() || inputs.pool_id.is_none() {
            return None;
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.refresh(false).await)
    }

    pub async fn refresh(&self, force_refresh: bool) -> LoadOutcome {
        let inputs = self.current_inputs();
        let Some(pool_id) = inputs.pool_id else {
            warn!("Pool ID is undefined");
            publish(&self.state, TokenBalances::default(), false, None);
            return LoadOutcome::MissingInput;
        };
        let Some(account) = inputs.account else {
            publish(&self.state, TokenBalances::default(), false, None);
            return LoadOutcome::MissingInput;
        };
        let Some(pool) = find_pool(&self.pools, &pool_id).cloned() else {
            warn!("Pool info not found for pool {}", pool_id);
            publish(&self.state, TokenBalances::default(), false, None);
            return LoadOutcome::MissingInput;
        };

        let key: BalanceKey = (account.clone(), pool_id.clone());
        if !force_refresh {
            let entry = self.entry.lock().await;
            if entry.matches(&key) {
                debug!("Using cached balances for {} in {}", account, pool_id);
                metrics::increment_cache_hit(CACHE_NAME);
                publish(&self.state, *entry.data(), false, entry.entry.timestamp);
                return LoadOutcome::Cached;
            }
        }

        let request_key = format!("balances-{}-{}", account, pool_id);
        let Some(_guard) = self.in_flight.acquire(&request_key) else {
            debug!("Balance request already pending for {}, skipping", account);
            metrics::increment_inflight_skip(CACHE_NAME);
            return LoadOutcome::AlreadyInFlight;
        };
        metrics::increment_cache_miss(CACHE_NAME);
        set_loading(&self.state, true);

        info!("Loading token balances for {} in {}", account, pool.name);
        let result = self.fetch_balances(&account, &pool).await;

        let current = self.current_inputs();
        if current.account.as_deref() != Some(account.as_str())
            || current.pool_id.as_deref() != Some(pool_id.as_str())
        {
            debug!("Balance inputs changed while loading, discarding");
            set_loading(&self.state, false);
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(balances) => {
                let fetched_at = Instant::now();
                self.entry.lock().await.store(key, balances, fetched_at);
                publish(&self.state, balances, false, Some(fetched_at));
                info!("Token balances loaded");
                LoadOutcome::Fetched
            }
            Err(e) => {
                error!("Error loading token balances: {}", e);
                self.notifier.error("Failed to load token balances");
                set_loading(&self.state, false);
                LoadOutcome::Failed
            }
        }
    }

    async fn fetch_balances(
        &self,
        account: &str,
        pool: &PoolConfig,
    ) -> Result<TokenBalances, LedgerError> {
        let (underlying, sy) = tokio::try_join!(
            self.fetch_balance(account, &pool.coin),
            self.fetch_balance(account, &pool.sy_coin),
        )?;
        Ok(TokenBalances { underlying, sy })
    }

    async fn fetch_balance(&self, account: &str, token_id: &str) -> Result<Decimal, LedgerError> {
        metrics::increment_remote_call(CACHE_NAME, "get_token_balance");
        let raw = self.ledger.get_token_balance(account, token_id).await.map_err(|e| {
            metrics::increment_remote_error(CACHE_NAME, "get_token_balance");
            e
        })?;
        parse_balance(&raw)
    }

    fn current_inputs(&self) -> BalanceInputs {
        self.inputs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
