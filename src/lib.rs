//! # Stellaris Market SDK
//!
//! Client-side read coordination for yield-tokenization markets. Splits a
//! deposited yield-bearing asset into standardized-yield (SY), principal (PT)
//! and yield (YT) tokens, and keeps the market page's view of the ledger fresh
//! without flooding the node.
//!
//! ## Overview
//!
//! The SDK sits between a market UI and the ledger node. It focuses on:
//!
//! - **Caching**: per-unit TTL caches for positions, position details, swap quotes and balances
//! - **Deduplication**: at most one in-flight remote call per cache key
//! - **Debouncing**: bursts of id-list changes and keystrokes collapse into one request
//! - **Invalidation**: confirmed writes force a delayed refresh of account state
//!
//! ## Architecture
//!
//! ### Primitives
//! [`ttl_cache`], [`in_flight`] and [`debounce`] are shared by every cache unit.
//!
//! ### Cache Units
//! [`positions`], [`details`], [`quotes`] and [`balances`] each own their
//! state and publish it on a `watch` channel as a [`cache_view::CacheView`].
//!
//! ### Orchestration
//! [`amount_change`] links the two swap-form fields through the quote cache;
//! [`handlers`] submits writes and schedules invalidation; [`session`] wires
//! everything for one market page.
//!
//! ### Ledger Access
//! [`ledger`] defines the reader/writer traits; [`view_client`] implements the
//! reader over the node's REST view endpoint.

// Primitives
/// TTL cache entries
pub mod ttl_cache;
/// In-flight request deduplication
pub mod in_flight;
/// Trailing-edge debounce timer
pub mod debounce;
/// UI-facing cache state
pub mod cache_view;
/// Fixed-point amounts and input validation
pub mod amounts;

// Ledger Access
/// Ledger reader/writer traits
pub mod ledger;
/// REST view-function client
pub mod view_client;

// Cache Units
/// Account position ids
pub mod positions;
/// Enriched position details
pub mod details;
/// Swap quote (calculation) cache
pub mod quotes;
/// Token balances
pub mod balances;

// Orchestration
/// Tab-scoped swap form state
pub mod swap_state;
/// Debounced amount linking
pub mod amount_change;
/// Write operations and post-write invalidation
pub mod handlers;
/// Per-market composition
pub mod session;

// Infrastructure
/// User-visible notifications
pub mod notify;
/// Metrics and observability
pub mod metrics;
/// Error types
pub mod error;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use cache_view::{CacheView, LoadOutcome};
pub use error::SdkError;
pub use handlers::{WriteError, WriteReceipt};
pub use ledger::{LedgerError, LedgerReader, LedgerWriter, QuoteKind};
pub use notify::{LogNotifier, Notifier, NotifyLevel};
pub use session::MarketSession;
pub use settings::Settings;
pub use swap_state::Tab;
pub use view_client::ViewClient;
