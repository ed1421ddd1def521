//! Shared fixtures: an in-memory ledger with call counters and a recording notifier.

#![allow(dead_code)]

use async_trait::async_trait;
use stellaris_market_sdk::ledger::{
    CreatePositionRequest, LedgerError, LedgerReader, LedgerWriter, PositionDetail, QuoteKind,
    SeedLiquidityRequest, SwapRequest, SyDepositRequest,
};
use stellaris_market_sdk::notify::{Notifier, NotifyLevel};
use stellaris_market_sdk::settings::{PoolConfig, Settings};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const ACCOUNT: &str = "0xa11ce";
pub const POOL_ID: &str = "0xpool";
pub const PY_STATE_ID: &str = "0xstate";
pub const COIN: &str = "0xcoin";
pub const SY_COIN: &str = "0xsycoin";
pub const TX_HASH: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890fedcba";

pub fn test_pool() -> PoolConfig {
    PoolConfig {
        pool_id: POOL_ID.to_string(),
        name: "sthApt".to_string(),
        py_state_id: PY_STATE_ID.to_string(),
        coin: COIN.to_string(),
        sy_coin: SY_COIN.to_string(),
        base_apy: 8.44,
    }
}

pub fn test_settings() -> Settings {
    Settings {
        pools: vec![test_pool()],
        ..Settings::default()
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub struct MockLedger {
    pub latency: Duration,
    pub position_ids: Mutex<Vec<String>>,
    pub failing_details: Mutex<HashSet<String>>,
    pub quote_raw: Mutex<f64>,
    pub balances: Mutex<HashMap<String, String>>,
    pub fail_positions: AtomicBool,
    pub fail_balances: AtomicBool,
    pub fail_writes: AtomicBool,

    pub id_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub quote_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub write_calls: AtomicUsize,

    pub detail_requests: Mutex<Vec<String>>,
    pub quote_requests: Mutex<Vec<(QuoteKind, u64, String, String)>>,
    pub deposits: Mutex<Vec<SyDepositRequest>>,
    pub swaps: Mutex<Vec<SwapRequest>>,
    pub created: Mutex<Vec<CreatePositionRequest>>,
    pub seeded: Mutex<Vec<SeedLiquidityRequest>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(10),
            position_ids: Mutex::new(Vec::new()),
            failing_details: Mutex::new(HashSet::new()),
            quote_raw: Mutex::new(0.0),
            balances: Mutex::new(HashMap::new()),
            fail_positions: AtomicBool::new(false),
            fail_balances: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            id_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            detail_requests: Mutex::new(Vec::new()),
            quote_requests: Mutex::new(Vec::new()),
            deposits: Mutex::new(Vec::new()),
            swaps: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            seeded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_positions(self, values: &[&str]) -> Self {
        *self.position_ids.lock().unwrap() = ids(values);
        self
    }

    pub fn with_quote(self, raw: f64) -> Self {
        self.set_quote(raw);
        self
    }

    pub fn with_balances(self, underlying: &str, sy: &str) -> Self {
        {
            let mut balances = self.balances.lock().unwrap();
            balances.insert(COIN.to_string(), underlying.to_string());
            balances.insert(SY_COIN.to_string(), sy.to_string());
        }
        self
    }

    pub fn set_quote(&self, raw: f64) {
        *self.quote_raw.lock().unwrap() = raw;
    }

    pub fn fail_detail(&self, id: &str) {
        self.failing_details.lock().unwrap().insert(id.to_string());
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn write_result(&self) -> Result<String, LedgerError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Remote("insufficient balance".to_string()));
        }
        Ok(TX_HASH.to_string())
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn get_position_ids(&self, _account: &str) -> Result<Vec<String>, LedgerError> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(LedgerError::Remote("node unavailable".to_string()));
        }
        Ok(self.position_ids.lock().unwrap().clone())
    }

    async fn get_position_info(&self, position_id: &str) -> Result<serde_json::Value, LedgerError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!([PY_STATE_ID, position_id]))
    }

    async fn get_position_detail(&self, position_id: &str) -> Result<PositionDetail, LedgerError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.detail_requests
            .lock()
            .unwrap()
            .push(position_id.to_string());
        tokio::time::sleep(self.latency).await;
        if self.failing_details.lock().unwrap().contains(position_id) {
            return Err(LedgerError::Remote(format!("no such position {}", position_id)));
        }
        Ok(PositionDetail {
            description: Some(format!("PT-sthApt {}", position_id)),
            pt_balance_display: Some("1.5".to_string()),
            yt_balance_display: Some("2.5".to_string()),
            yield_token: Some(COIN.to_string()),
            expiry_days: Some("30".to_string()),
            state_id: Some(PY_STATE_ID.to_string()),
        })
    }

    async fn get_swap_quote(
        &self,
        kind: QuoteKind,
        amount: u64,
        pool_stats_id: &str,
        pool_id: &str,
    ) -> Result<f64, LedgerError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.quote_requests.lock().unwrap().push((
            kind,
            amount,
            pool_stats_id.to_string(),
            pool_id.to_string(),
        ));
        tokio::time::sleep(self.latency).await;
        Ok(*self.quote_raw.lock().unwrap())
    }

    async fn get_token_balance(&self, _account: &str, token_id: &str) -> Result<String, LedgerError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_balances.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(token_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LedgerWriter for MockLedger {
    async fn submit_sy_deposit(&self, request: SyDepositRequest) -> Result<String, LedgerError> {
        tokio::time::sleep(self.latency).await;
        self.deposits.lock().unwrap().push(request);
        self.write_result()
    }

    async fn submit_create_position(
        &self,
        request: CreatePositionRequest,
    ) -> Result<String, LedgerError> {
        tokio::time::sleep(self.latency).await;
        self.created.lock().unwrap().push(request);
        self.write_result()
    }

    async fn submit_swap(&self, request: SwapRequest) -> Result<String, LedgerError> {
        tokio::time::sleep(self.latency).await;
        self.swaps.lock().unwrap().push(request);
        self.write_result()
    }

    async fn submit_seed_liquidity(
        &self,
        request: SeedLiquidityRequest,
    ) -> Result<String, LedgerError> {
        tokio::time::sleep(self.latency).await;
        self.seeded.lock().unwrap().push(request);
        self.write_result()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    pub fn at(&self, level: NotifyLevel) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}
