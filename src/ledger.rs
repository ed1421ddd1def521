//! # Ledger Interfaces
//!
//! The read-coordination layer talks to the remote ledger only through the two
//! traits in this module:
//!
//! - [`LedgerReader`]: view functions (positions, details, quotes, balances)
//! - [`LedgerWriter`]: signed entry functions, implemented by the wallet layer
//!
//! Every call is an asynchronous request/response pair that either resolves
//! with a value or fails with a [`LedgerError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Remote(String),
    #[error("Failed to decode ledger response: {0}")]
    Decode(String),
    #[error("Wallet not connected")]
    NotConnected,
    #[error("Unsupported ledger operation: {0}")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}

/// Which router quote to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteKind {
    /// PT received for an exact SY input
    PtOut,
    /// SY required for an exact PT output
    SyIn,
}

impl QuoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteKind::PtOut => "ptOut",
            QuoteKind::SyIn => "syIn",
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-position detail as returned by the node. Missing fields default at the cache layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PositionDetail {
    pub description: Option<String>,
    pub pt_balance_display: Option<String>,
    pub yt_balance_display: Option<String>,
    pub yield_token: Option<String>,
    pub expiry_days: Option<String>,
    #[serde(alias = "py_state_id")]
    pub state_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyDepositRequest {
    pub amount: u64,
    pub sy_address: String,
    pub yield_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatePositionRequest {
    /// SY type of the market's py-state
    pub sy_type: String,
    pub py_state_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub min_pt_out: u64,
    pub expected_pt_out: u64,
    pub sy_amount: u64,
    pub position_id: String,
    pub py_state_id: String,
    pub pool_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedLiquidityRequest {
    pub sy_amount: u64,
    pub position_id: String,
    pub py_state_id: String,
    pub pool_id: String,
}

/// View-function access to the ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Position-object identifiers owned by `account`.
    async fn get_position_ids(&self, account: &str) -> Result<Vec<String>, LedgerError>;

    /// Auxiliary per-position lookup (the position's py-state), returned opaque.
    async fn get_position_info(&self, position_id: &str) -> Result<serde_json::Value, LedgerError>;

    async fn get_position_detail(&self, position_id: &str) -> Result<PositionDetail, LedgerError>;

    /// Raw fixed-point quote as reported by the node.
    ///
    /// Returned as `f64` so that anomalous (negative / non-finite) node output
    /// reaches the caller and can be rejected there.
    async fn get_swap_quote(
        &self,
        kind: QuoteKind,
        amount: u64,
        pool_stats_id: &str,
        pool_id: &str,
    ) -> Result<f64, LedgerError>;

    /// Decimal string balance of `token_id` held by `account`.
    async fn get_token_balance(&self, account: &str, token_id: &str) -> Result<String, LedgerError>;
}

/// Signed entry-function submission. Each call resolves with the confirmed transaction hash.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn submit_sy_deposit(&self, request: SyDepositRequest) -> Result<String, LedgerError>;

    async fn submit_create_position(
        &self,
        request: CreatePositionRequest,
    ) -> Result<String, LedgerError>;

    async fn submit_swap(&self, request: SwapRequest) -> Result<String, LedgerError>;

    async fn submit_seed_liquidity(
        &self,
        request: SeedLiquidityRequest,
    ) -> Result<String, LedgerError>;
}

/// Writer for sessions without a connected wallet.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedWallet;

#[async_trait]
impl LedgerWriter for DisconnectedWallet {
    async fn submit_sy_deposit(&self, _request: SyDepositRequest) -> Result<String, LedgerError> {
        Err(LedgerError::NotConnected)
    }

    async fn submit_create_position(
        &self,
        _request: CreatePositionRequest,
    ) -> Result<String, LedgerError> {
        Err(LedgerError::NotConnected)
    }

    async fn submit_swap(&self, _request: SwapRequest) -> Result<String, LedgerError> {
        Err(LedgerError::NotConnected)
    }

    async fn submit_seed_liquidity(
        &self,
        _request: SeedLiquidityRequest,
    ) -> Result<String, LedgerError> {
        Err(LedgerError::NotConnected)
    }
}
