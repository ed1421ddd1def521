use tokio::sync::watch;
use tokio::time::Instant;

/// What the UI reads from a cache unit: `{ data, isLoading }` plus the fetch instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheView<T> {
    pub data: T,
    pub is_loading: bool,
    pub updated_at: Option<Instant>,
}

/// Result of a `load`/`refresh` call, reported for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Required input (account, pool) missing; state reset to empty.
    MissingInput,
    /// Served from a valid cache entry.
    Cached,
    /// Same key already in flight; nothing issued.
    AlreadyInFlight,
    /// Below the minimum interval since the last completed fetch.
    RateLimited,
    /// Debounced fetch scheduled.
    Scheduled,
    Fetched,
    /// Response arrived for inputs that are no longer current; dropped.
    Discarded,
    Failed,
}

pub(crate) fn publish<T>(
    tx: &watch::Sender<CacheView<T>>,
    data: T,
    is_loading: bool,
    updated_at: Option<Instant>,
) {
    tx.send_replace(CacheView {
        data,
        is_loading,
        updated_at,
    });
}

pub(crate) fn set_loading<T>(tx: &watch::Sender<CacheView<T>>, is_loading: bool) {
    tx.send_if_modified(|view| {
        if view.is_loading == is_loading {
            return false;
        }
        view.is_loading = is_loading;
        true
    });
}
