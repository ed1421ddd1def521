use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Time-to-live and pacing parameters for the read-coordination caches.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(default = "default_positions_ttl_ms")]
    pub positions_ttl_ms: u64,
    #[serde(default = "default_detailed_positions_ttl_ms")]
    pub detailed_positions_ttl_ms: u64,
    #[serde(default = "default_calculation_ttl_ms")]
    pub calculation_ttl_ms: u64,
    /// Floor between two completed position fetches, independent of the TTL
    #[serde(default = "default_min_fetch_interval_ms")]
    pub min_fetch_interval_ms: u64,
    #[serde(default = "default_debounce_delay_ms")]
    pub debounce_delay_ms: u64,
    #[serde(default = "default_amount_debounce_delay_ms")]
    pub amount_debounce_delay_ms: u64,
}

fn default_positions_ttl_ms() -> u64 {
    5 * 60 * 1000
}
fn default_detailed_positions_ttl_ms() -> u64 {
    2 * 60 * 1000
}
fn default_calculation_ttl_ms() -> u64 {
    30 * 1000
}
fn default_min_fetch_interval_ms() -> u64 {
    30 * 1000
}
fn default_debounce_delay_ms() -> u64 {
    300
}
fn default_amount_debounce_delay_ms() -> u64 {
    200
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            positions_ttl_ms: default_positions_ttl_ms(),
            detailed_positions_ttl_ms: default_detailed_positions_ttl_ms(),
            calculation_ttl_ms: default_calculation_ttl_ms(),
            min_fetch_interval_ms: default_min_fetch_interval_ms(),
            debounce_delay_ms: default_debounce_delay_ms(),
            amount_debounce_delay_ms: default_amount_debounce_delay_ms(),
        }
    }
}

impl CacheSettings {
    pub fn positions_ttl(&self) -> Duration {
        Duration::from_millis(self.positions_ttl_ms)
    }

    pub fn detailed_positions_ttl(&self) -> Duration {
        Duration::from_millis(self.detailed_positions_ttl_ms)
    }

    pub fn calculation_ttl(&self) -> Duration {
        Duration::from_millis(self.calculation_ttl_ms)
    }

    pub fn min_fetch_interval(&self) -> Duration {
        Duration::from_millis(self.min_fetch_interval_ms)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn amount_debounce_delay(&self) -> Duration {
        Duration::from_millis(self.amount_debounce_delay_ms)
    }
}

/// Amount handling and write-path timing.
#[derive(Debug, Deserialize, Clone)]
pub struct ValueSettings {
    #[serde(default = "default_slippage")]
    pub default_slippage: f64,
    /// Fixed-point multiplier between display amounts and ledger integers
    #[serde(default = "default_amount_multiplier")]
    pub amount_multiplier: f64,
    #[serde(default = "default_max_amount")]
    pub max_amount: f64,
    #[serde(default = "default_refresh_delay_after_create_ms")]
    pub refresh_delay_after_create_ms: u64,
    #[serde(default = "default_refresh_delay_after_swap_ms")]
    pub refresh_delay_after_swap_ms: u64,
    #[serde(default = "default_refresh_delay_after_seed_ms")]
    pub refresh_delay_after_seed_ms: u64,
    #[serde(default = "default_status_clear_delay_ms")]
    pub status_clear_delay_ms: u64,
}

fn default_slippage() -> f64 {
    0.005 // 0.5%
}
fn default_amount_multiplier() -> f64 {
    100_000_000.0
}
fn default_max_amount() -> f64 {
    1_000_000.0
}
fn default_refresh_delay_after_create_ms() -> u64 {
    1000
}
fn default_refresh_delay_after_swap_ms() -> u64 {
    2000
}
fn default_refresh_delay_after_seed_ms() -> u64 {
    2000
}
fn default_status_clear_delay_ms() -> u64 {
    3000
}

impl Default for ValueSettings {
    fn default() -> Self {
        Self {
            default_slippage: default_slippage(),
            amount_multiplier: default_amount_multiplier(),
            max_amount: default_max_amount(),
            refresh_delay_after_create_ms: default_refresh_delay_after_create_ms(),
            refresh_delay_after_swap_ms: default_refresh_delay_after_swap_ms(),
            refresh_delay_after_seed_ms: default_refresh_delay_after_seed_ms(),
            status_clear_delay_ms: default_status_clear_delay_ms(),
        }
    }
}

/// Remote node and view-function naming.
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerSettings {
    #[serde(default = "default_node_url")]
    pub node_url: String,
    #[serde(default = "default_module_address")]
    pub module_address: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_position_ids_function")]
    pub position_ids_function: String,
    #[serde(default = "default_position_state_function")]
    pub position_state_function: String,
    #[serde(default = "default_position_info_function")]
    pub position_info_function: String,
    #[serde(default = "default_pt_out_function")]
    pub pt_out_function: String,
    #[serde(default = "default_sy_in_function")]
    pub sy_in_function: String,
}

fn default_node_url() -> String {
    "https://fullnode.testnet.aptoslabs.com".to_string()
}
fn default_module_address() -> String {
    "0xa2924718273531062e31da5f4004ffc444541fde123874a9cd945384d9eda83c".to_string()
}
fn default_request_timeout_seconds() -> u64 {
    15
}
fn default_position_ids_function() -> String {
    "py_position::get_user_py_position_address".to_string()
}
fn default_position_state_function() -> String {
    "py_position::py_state_id".to_string()
}
fn default_position_info_function() -> String {
    "py_position::get_position_info".to_string()
}
fn default_pt_out_function() -> String {
    "router::get_pt_out_for_exact_sy_in_with_oracle_price".to_string()
}
fn default_sy_in_function() -> String {
    "router::get_sy_amount_in_for_exact_pt_out_with_oracle_price".to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            module_address: default_module_address(),
            request_timeout_seconds: default_request_timeout_seconds(),
            position_ids_function: default_position_ids_function(),
            position_state_function: default_position_state_function(),
            position_info_function: default_position_info_function(),
            pt_out_function: default_pt_out_function(),
            sy_in_function: default_sy_in_function(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContractSettings {
    #[serde(default = "default_sy_address")]
    pub default_sy_address: String,
    #[serde(default = "default_yield_token")]
    pub default_yield_token: String,
}

fn default_sy_address() -> String {
    "0xdb4660e349e5c784a9d4ad93fa157fa9d3651c6b1af0b1ece5a44d5350fc36e".to_string()
}
fn default_yield_token() -> String {
    "0xf36349bfb5b8a9f7f26417c596d349c0136de5d831c55f3d5432bd254ce832ef".to_string()
}

impl Default for ContractSettings {
    fn default() -> Self {
        Self {
            default_sy_address: default_sy_address(),
            default_yield_token: default_yield_token(),
        }
    }
}

/// One listed market.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PoolConfig {
    /// Market pool object
    pub pool_id: String,
    pub name: String,
    /// Py-state object the market is bound to
    pub py_state_id: String,
    /// Underlying yield-bearing token
    pub coin: String,
    pub sy_coin: String,
    #[serde(default)]
    pub base_apy: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub values: ValueSettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub contracts: ContractSettings,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl Settings {
    /// Load `Config.toml` (optional) plus `SDK__`-prefixed environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("Config.toml")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SDK").separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(url) = env::var("SDK_LEDGER_NODE_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                settings.ledger.node_url = trimmed.to_string();
            }
        }
        if let Ok(address) = env::var("SDK_LEDGER_MODULE_ADDRESS") {
            let trimmed = address.trim();
            if !trimmed.is_empty() {
                settings.ledger.module_address = trimmed.to_string();
            }
        }

        // Optional: full pool registry override via ENV (JSON array of pools)
        if let Ok(raw_pools) = env::var("SDK_POOLS") {
            let trimmed = raw_pools.trim();
            if !trimmed.is_empty() {
                match serde_json::from_str::<Vec<PoolConfig>>(trimmed) {
                    Ok(pools) => settings.pools = pools,
                    Err(e) => log::warn!("Failed to parse SDK_POOLS as JSON: {}", e),
                }
            }
        }

        Ok(settings)
    }

    pub fn find_pool(&self, pool_id: &str) -> Option<&PoolConfig> {
        find_pool(&self.pools, pool_id)
    }
}

pub fn find_pool<'a>(pools: &'a [PoolConfig], pool_id: &str) -> Option<&'a PoolConfig> {
    pools.iter().find(|pool| pool.pool_id == pool_id)
}
