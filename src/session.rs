//! # Market Session
//!
//! Everything one mounted market page needs, wired together: the four cache
//! units, the swap form state, amount linking and the write handlers.
//!
//! The session is passive. The embedding UI drives it explicitly:
//!
//! - `connect_account` when the wallet account changes
//! - `mount` once the page is shown (positions + balances)
//! - `sync_details` whenever the position list changes
//! - `on_amount_change` / `select_tab` / `select_position` from the swap form
//! - `swap` / `create_position` / `seed_liquidity` for writes
//!
//! Dropping the session (or calling `unmount`) cancels pending debounce timers.

use crate::amount_change::{AmountChangeHandler, InputSide};
use crate::balances::BalanceCache;
use crate::cache_view::LoadOutcome;
use crate::details::{DetailCache, DetailCacheConfig};
use crate::error::SdkError;
use crate::handlers::{WriteError, WriteHandlers, WriteReceipt};
use crate::ledger::{LedgerReader, LedgerWriter};
use crate::notify::Notifier;
use crate::positions::{PositionCache, PositionCacheConfig};
use crate::quotes::{QuoteCache, QuoteCacheConfig};
use crate::settings::{PoolConfig, Settings};
use crate::swap_state::{SwapState, SwapStateHandle, Tab};
use std::sync::Arc;
use tracing::info;

pub struct MarketSession {
    pool: PoolConfig,
    positions: Arc<PositionCache>,
    details: DetailCache,
    quotes: Arc<QuoteCache>,
    balances: Arc<BalanceCache>,
    swap: SwapStateHandle,
    amounts: AmountChangeHandler,
    handlers: WriteHandlers,
}

impl MarketSession {
    pub fn new(
        settings: &Settings,
        pool_id: &str,
        reader: Arc<dyn LedgerReader>,
        writer: Arc<dyn LedgerWriter>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SdkError> {
        let pool = settings
            .find_pool(pool_id)
            .cloned()
            .ok_or_else(|| SdkError::UnknownPool(pool_id.to_string()))?;

        let positions = Arc::new(PositionCache::new(
            reader.clone(),
            notifier.clone(),
            PositionCacheConfig::from(&settings.cache),
        ));
        let details = DetailCache::new(reader.clone(), DetailCacheConfig::from(&settings.cache));
        let quotes = Arc::new(QuoteCache::new(
            reader.clone(),
            QuoteCacheConfig::from(settings),
        ));
        let balances = Arc::new(BalanceCache::new(
            reader.clone(),
            notifier.clone(),
            settings.pools.clone().into(),
        ));
        let swap = SwapStateHandle::new(SwapState::new(settings.values.default_slippage));
        let amounts = AmountChangeHandler::new(
            quotes.clone(),
            swap.clone(),
            settings.cache.amount_debounce_delay(),
        );
        let handlers = WriteHandlers::new(
            writer,
            reader,
            notifier,
            positions.clone(),
            balances.clone(),
            settings.values.clone(),
            settings.contracts.clone(),
        );

        info!("Market session for {} ({})", pool.name, pool.pool_id);
        Ok(Self {
            pool,
            positions,
            details,
            quotes,
            balances,
            swap,
            amounts,
            handlers,
        })
    }

    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    pub fn positions(&self) -> &PositionCache {
        &self.positions
    }

    pub fn details(&self) -> &DetailCache {
        &self.details
    }

    pub fn quotes(&self) -> &QuoteCache {
        &self.quotes
    }

    pub fn balances(&self) -> &BalanceCache {
        &self.balances
    }

    pub fn swap_state(&self) -> &SwapStateHandle {
        &self.swap
    }

    pub fn handlers(&self) -> &WriteHandlers {
        &self.handlers
    }

    pub fn connect_account(&self, account: Option<String>) {
        self.positions.on_inputs_changed(account.clone());
        self.balances
            .on_inputs_changed(account, Some(self.pool.pool_id.clone()));
    }

    /// Initial page load: positions and balances concurrently.
    pub async fn mount(&self) -> (LoadOutcome, Option<LoadOutcome>) {
        tokio::join!(self.positions.load(false), self.balances.load_once())
    }

    /// Load details for the currently cached position ids.
    pub async fn sync_details(&self) -> LoadOutcome {
        let ids = self.positions.position_ids();
        self.details.load(&ids, false).await
    }

    pub fn on_amount_change(&self, side: InputSide, value: Option<f64>) {
        self.amounts
            .on_amount_change(side, value, &self.pool.py_state_id, &self.pool.pool_id);
    }

    pub fn select_tab(&self, tab: Tab) {
        self.amounts.cancel_pending();
        self.swap.update(|state| state.select_tab(tab));
    }

    pub fn select_position(&self, position_id: Option<String>) {
        self.swap
            .update(|state| state.selected_position = position_id);
    }

    pub async fn swap(&self) -> Result<WriteReceipt, WriteError> {
        self.handlers.swap(Some(&self.pool), &self.swap).await
    }

    pub async fn create_position(&self) -> Result<WriteReceipt, WriteError> {
        self.handlers.create_position(Some(&self.pool)).await
    }

    pub async fn seed_liquidity(
        &self,
        position_id: Option<&str>,
        amount: Option<f64>,
    ) -> Result<WriteReceipt, WriteError> {
        self.handlers
            .seed_liquidity(Some(&self.pool), position_id, amount)
            .await
    }

    /// Cancel pending debounced work. In-flight remote calls run to completion.
    pub fn unmount(&self) {
        self.details.cancel_pending();
        self.amounts.cancel_pending();
    }
}
