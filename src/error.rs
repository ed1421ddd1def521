use crate::ledger::LedgerError;

/// Errors raised while assembling a market session or its configuration.
///
/// Cache units never surface errors to callers; write operations use
/// [`crate::handlers::WriteError`].
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("Unknown pool: {0}")]
    UnknownPool(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
