//! # Write Handlers
//!
//! State-mutating operations: create position, swap, seed liquidity.
//!
//! Each handler validates its inputs, submits through the [`LedgerWriter`],
//! notifies the user, and on success schedules a forced refresh of the
//! Position Cache and the Balance Cache after a short delay so the node has
//! indexed the transaction. The Calculation Cache is never touched by writes.
//!
//! A rejected write notifies with the remote error message and leaves every
//! cache as it was.

use crate::amounts::{shorten_hash, to_contract_amount_with};
use crate::balances::BalanceCache;
use crate::cache_view::LoadOutcome;
use crate::ledger::{
    CreatePositionRequest, LedgerError, LedgerReader, LedgerWriter, QuoteKind,
    SeedLiquidityRequest, SwapRequest, SyDepositRequest,
};
use crate::notify::Notifier;
use crate::positions::PositionCache;
use crate::settings::{ContractSettings, PoolConfig, ValueSettings};
use crate::swap_state::{SwapStateHandle, Tab};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const STATUS_IN_PROGRESS: &str = "Transaction in progress...";
pub const STATUS_SWAP_SUCCESS: &str = "Swap successful!";
pub const STATUS_SWAP_FAILED: &str = "Swap failed, please try again";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WriteError {
    #[error("Please connect wallet first")]
    NotConnected,
    #[error("Pool data not loaded")]
    PoolNotLoaded,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Amount too large, please enter a smaller amount")]
    AmountTooLarge,
    #[error("Please select a position first")]
    NoPositionSelected,
    #[error("YT swap is not available yet")]
    Unsupported,
    #[error("Invalid expected PT output")]
    InvalidExpectedOutput,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A confirmed write and its pending cache refresh.
#[derive(Debug)]
pub struct WriteReceipt {
    pub tx_hash: String,
    /// Resolves once the delayed forced refresh has completed.
    pub refresh: JoinHandle<()>,
}

pub struct WriteHandlers {
    writer: Arc<dyn LedgerWriter>,
    reader: Arc<dyn LedgerReader>,
    notifier: Arc<dyn Notifier>,
    positions: Arc<PositionCache>,
    balances: Arc<BalanceCache>,
    values: ValueSettings,
    contracts: ContractSettings,
    creating_position: AtomicBool,
    seeding: AtomicBool,
}

impl WriteHandlers {
    pub fn new(
        writer: Arc<dyn LedgerWriter>,
        reader: Arc<dyn LedgerReader>,
        notifier: Arc<dyn Notifier>,
        positions: Arc<PositionCache>,
        balances: Arc<BalanceCache>,
        values: ValueSettings,
        contracts: ContractSettings,
    ) -> Self {
        Self {
            writer,
            reader,
            notifier,
            positions,
            balances,
            values,
            contracts,
            creating_position: AtomicBool::new(false),
            seeding: AtomicBool::new(false),
        }
    }

    pub fn is_creating_position(&self) -> bool {
        self.creating_position.load(Ordering::SeqCst)
    }

    pub fn is_seeding(&self) -> bool {
        self.seeding.load(Ordering::SeqCst)
    }

    pub async fn create_position(
        &self,
        pool: Option<&PoolConfig>,
    ) -> Result<WriteReceipt, WriteError> {
        self.require_account()?;
        let pool = self.require_pool(pool)?;

        self.creating_position.store(true, Ordering::SeqCst);
        info!("Creating position in {}", pool.name);
        let result = self
            .writer
            .submit_create_position(CreatePositionRequest {
                sy_type: pool.sy_coin.clone(),
                py_state_id: pool.py_state_id.clone(),
            })
            .await;
        self.creating_position.store(false, Ordering::SeqCst);

        match result {
            Ok(tx_hash) => {
                self.notifier.success("Position created successfully!");
                Ok(self.receipt(tx_hash, self.values.refresh_delay_after_create_ms))
            }
            Err(e) => {
                error!("Create position failed: {}", e);
                self.notifier
                    .error(&format!("Failed to create position: {}", e));
                Err(e.into())
            }
        }
    }

    /// Swap the selected tab's input amount.
    ///
    /// SY tab deposits into SY; PT tab buys PT with SY for the selected
    /// position, guarded by slippage; YT tab is not tradable yet.
    pub async fn swap(
        &self,
        pool: Option<&PoolConfig>,
        swap: &SwapStateHandle,
    ) -> Result<WriteReceipt, WriteError> {
        self.require_account()?;
        let pool = self.require_pool(pool)?;

        let state = swap.snapshot();
        let amount = state.current().input;
        let amount = match amount {
            Some(amount) if amount.is_finite() && amount > 0.0 => amount,
            _ => return Err(self.warn(WriteError::InvalidAmount)),
        };
        if amount > self.values.max_amount {
            return Err(self.warn(WriteError::AmountTooLarge));
        }

        let tab = state.selected_tab();
        let position_id = match tab {
            Tab::Yt => return Err(self.warn(WriteError::Unsupported)),
            Tab::Pt => match state.selected_position.clone() {
                Some(id) if !id.is_empty() => Some(id),
                _ => return Err(self.warn(WriteError::NoPositionSelected)),
            },
            Tab::Sy => None,
        };

        swap.update(|s| {
            s.is_swap_loading = true;
            s.status = STATUS_IN_PROGRESS.to_string();
        });

        let real_amount = to_contract_amount_with(amount, self.values.amount_multiplier);
        info!("Submitting {} swap of {} ({})", tab, amount, real_amount);
        let result = match position_id {
            Some(position_id) => {
                self.submit_pt_swap(pool, real_amount, position_id, state.slippage)
                    .await
            }
            None => self
                .writer
                .submit_sy_deposit(SyDepositRequest {
                    amount: real_amount,
                    sy_address: self.contracts.default_sy_address.clone(),
                    yield_token: self.contracts.default_yield_token.clone(),
                })
                .await
                .map_err(WriteError::from),
        };

        match result {
            Ok(tx_hash) => {
                self.notifier.success(&format!(
                    "Swap successful! Hash: {}",
                    shorten_hash(&tx_hash)
                ));
                swap.update(|s| {
                    s.is_swap_loading = false;
                    s.status = STATUS_SWAP_SUCCESS.to_string();
                    s.reset(tab);
                });
                self.schedule_status_clear(swap.clone());
                Ok(self.receipt(tx_hash, self.values.refresh_delay_after_swap_ms))
            }
            Err(e) => {
                error!("Swap failed: {}", e);
                self.notifier.error(&format!("Swap failed: {}", e));
                swap.update(|s| {
                    s.is_swap_loading = false;
                    s.status = STATUS_SWAP_FAILED.to_string();
                });
                Err(e)
            }
        }
    }

    async fn submit_pt_swap(
        &self,
        pool: &PoolConfig,
        sy_amount: u64,
        position_id: String,
        slippage: f64,
    ) -> Result<String, WriteError> {
        let expected = self
            .reader
            .get_swap_quote(QuoteKind::PtOut, sy_amount, &pool.py_state_id, &pool.pool_id)
            .await?;
        if !expected.is_finite() || expected <= 0.0 {
            return Err(WriteError::InvalidExpectedOutput);
        }

        let min_pt_out = (expected * (1.0 - slippage)).floor() as u64;
        debug!(
            "Expected PT out {}, minimum {} at slippage {}",
            expected, min_pt_out, slippage
        );

        let tx_hash = self
            .writer
            .submit_swap(SwapRequest {
                min_pt_out,
                expected_pt_out: expected as u64,
                sy_amount,
                position_id,
                py_state_id: pool.py_state_id.clone(),
                pool_id: pool.pool_id.clone(),
            })
            .await?;
        Ok(tx_hash)
    }

    pub async fn seed_liquidity(
        &self,
        pool: Option<&PoolConfig>,
        position_id: Option<&str>,
        amount: Option<f64>,
    ) -> Result<WriteReceipt, WriteError> {
        self.require_account()?;
        let amount = match amount {
            Some(amount) if amount.is_finite() && amount > 0.0 => amount,
            _ => return Err(self.warn(WriteError::InvalidAmount)),
        };
        if amount > self.values.max_amount {
            return Err(self.warn(WriteError::AmountTooLarge));
        }
        let position_id = match position_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(self.warn(WriteError::NoPositionSelected)),
        };
        let pool = self.require_pool(pool)?;

        self.seeding.store(true, Ordering::SeqCst);
        let sy_amount = to_contract_amount_with(amount, self.values.amount_multiplier);
        info!("Seeding {} ({}) into {}", amount, sy_amount, pool.name);
        let result = self
            .writer
            .submit_seed_liquidity(SeedLiquidityRequest {
                sy_amount,
                position_id,
                py_state_id: pool.py_state_id.clone(),
                pool_id: pool.pool_id.clone(),
            })
            .await;
        self.seeding.store(false, Ordering::SeqCst);

        match result {
            Ok(tx_hash) => {
                self.notifier.success("Added successfully!");
                Ok(self.receipt(tx_hash, self.values.refresh_delay_after_seed_ms))
            }
            Err(e) => {
                error!("Seed liquidity failed: {}", e);
                self.notifier
                    .error(&format!("Failed to add liquidity: {}", e));
                Err(e.into())
            }
        }
    }

    fn require_account(&self) -> Result<(), WriteError> {
        match self.positions.account() {
            Some(_) => Ok(()),
            None => Err(self.warn(WriteError::NotConnected)),
        }
    }

    fn require_pool<'a>(&self, pool: Option<&'a PoolConfig>) -> Result<&'a PoolConfig, WriteError> {
        pool.ok_or_else(|| {
            self.notifier.error(&WriteError::PoolNotLoaded.to_string());
            WriteError::PoolNotLoaded
        })
    }

    fn warn(&self, err: WriteError) -> WriteError {
        warn!("Write rejected: {}", err);
        self.notifier.warning(&err.to_string());
        err
    }

    fn receipt(&self, tx_hash: String, delay_ms: u64) -> WriteReceipt {
        info!("Transaction confirmed: {}", tx_hash);
        WriteReceipt {
            tx_hash,
            refresh: self.schedule_refresh(Duration::from_millis(delay_ms)),
        }
    }

    /// Forced positions and balances reload after `delay`.
    fn schedule_refresh(&self, delay: Duration) -> JoinHandle<()> {
        let positions = self.positions.clone();
        let balances = self.balances.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let (positions_outcome, balances_outcome) =
                tokio::join!(positions.load(true), balances.refresh(true));
            if positions_outcome == LoadOutcome::AlreadyInFlight
                || balances_outcome == LoadOutcome::AlreadyInFlight
            {
                warn!(
                    "Post-write refresh skipped by a pending load: positions {:?}, balances {:?}",
                    positions_outcome, balances_outcome
                );
            } else {
                debug!(
                    "Post-write refresh: positions {:?}, balances {:?}",
                    positions_outcome, balances_outcome
                );
            }
        })
    }

    fn schedule_status_clear(&self, swap: SwapStateHandle) {
        let delay = Duration::from_millis(self.values.status_clear_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            swap.update(|s| {
                if s.status == STATUS_SWAP_SUCCESS {
                    s.status.clear();
                }
            });
        });
    }
}
