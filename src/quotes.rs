//! # Calculation Cache
//!
//! Short-lived cache of router swap quotes keyed by
//! `(kind, amount, pool_stats_id, pool_id)`. The entered amount is part of the
//! key, so different amounts never collide.
//!
//! `compute` returns `None` for anything it cannot answer right now: invalid
//! input, a duplicate of an in-flight request, a remote error, or a quote that
//! is negative or non-finite. Only sane quotes are ever cached.

use crate::amounts::{
    from_contract_amount_with, to_contract_amount_with, validate_calculation_inputs,
};
use crate::in_flight::InFlightSet;
use crate::ledger::{LedgerReader, QuoteKind};
use crate::metrics;
use crate::settings::Settings;
use crate::ttl_cache::CacheEntry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const CACHE_NAME: &str = "calculation";

#[derive(Debug, Clone)]
pub struct QuoteCacheConfig {
    pub ttl: Duration,
    pub amount_multiplier: f64,
    pub max_amount: f64,
}

impl Default for QuoteCacheConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for QuoteCacheConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            ttl: settings.cache.calculation_ttl(),
            amount_multiplier: settings.values.amount_multiplier,
            max_amount: settings.values.max_amount,
        }
    }
}

/// Composite key shared by the cache map and the in-flight set.
pub fn quote_key(kind: QuoteKind, amount: f64, pool_stats_id: &str, pool_id: &str) -> String {
    format!("{}-{}-{}-{}", kind, amount, pool_stats_id, pool_id)
}

pub struct QuoteCache {
    ledger: Arc<dyn LedgerReader>,
    config: QuoteCacheConfig,
    entries: DashMap<String, CacheEntry<f64>>,
    in_flight: InFlightSet,
}

impl QuoteCache {
    pub fn new(ledger: Arc<dyn LedgerReader>, config: QuoteCacheConfig) -> Self {
        Self {
            ledger,
            config,
            entries: DashMap::new(),
            in_flight: InFlightSet::new(),
        }
    }

    /// Quote in display units, or `None` when no usable result is available.
    pub async fn compute(
        &self,
        kind: QuoteKind,
        amount: f64,
        pool_stats_id: &str,
        pool_id: &str,
    ) -> Option<f64> {
        if let Err(e) =
            validate_calculation_inputs(amount, pool_stats_id, pool_id, self.config.max_amount)
        {
            warn!("Rejected {} calculation input: {}", kind, e);
            return None;
        }

        let key = quote_key(kind, amount, pool_stats_id, pool_id);
        let now = Instant::now();

        if let Some(cached) = self.entries.get(&key) {
            if cached.is_valid(self.config.ttl, now) {
                debug!("Using cached result for {}: {}", kind, cached.data);
                metrics::increment_cache_hit(CACHE_NAME);
                return Some(cached.data);
            }
        }

        let Some(_guard) = self.in_flight.acquire(&key) else {
            debug!("Request already pending for {}, skipping", kind);
            metrics::increment_inflight_skip(CACHE_NAME);
            return None;
        };
        metrics::increment_cache_miss(CACHE_NAME);

        let fixed_amount = to_contract_amount_with(amount, self.config.amount_multiplier);
        debug!("Calculating {} for amount {} ({})", kind, amount, fixed_amount);

        let start = std::time::Instant::now();
        metrics::increment_remote_call(CACHE_NAME, kind.as_str());
        let raw = match self
            .ledger
            .get_swap_quote(kind, fixed_amount, pool_stats_id, pool_id)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                metrics::increment_remote_error(CACHE_NAME, kind.as_str());
                error!("Error calculating {}: {}", kind, e);
                return None;
            }
        };
        metrics::record_remote_latency(CACHE_NAME, kind.as_str(), start.elapsed());

        let result = from_contract_amount_with(raw, self.config.amount_multiplier);
        if !result.is_finite() || result < 0.0 {
            warn!("Invalid calculation result for {}: {}", kind, result);
            return None;
        }

        self.entries.insert(
            key,
            CacheEntry {
                data: result,
                timestamp: Some(Instant::now()),
            },
        );

        info!("Calculated {}: {}", kind, result);
        Some(result)
    }

    /// Drop every cached quote and pending marker.
    pub fn clear(&self) {
        self.entries.clear();
        self.in_flight.clear();
        debug!("Calculation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
