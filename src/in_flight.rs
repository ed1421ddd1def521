use dashmap::DashSet;
use tracing::trace;

/// Keys of requests currently awaiting a remote response.
///
/// At most one request per key may be in flight. Callers that lose the race
/// must skip rather than wait: the winner populates the cache for the next check.
#[derive(Debug, Default)]
pub struct InFlightSet {
    keys: DashSet<String>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self {
            keys: DashSet::new(),
        }
    }

    /// Insert `key` unless already present. Returns false (and changes nothing) on a duplicate.
    pub fn try_acquire(&self, key: &str) -> bool {
        let acquired = self.keys.insert(key.to_string());
        trace!("in-flight acquire {} -> {}", key, acquired);
        acquired
    }

    /// Remove `key` unconditionally.
    pub fn release(&self, key: &str) {
        self.keys.remove(key);
        trace!("in-flight release {}", key);
    }

    /// Acquire `key` and hand back a guard that releases it on drop,
    /// so every exit path (error, early return, aborted task) frees the slot.
    pub fn acquire(&self, key: &str) -> Option<InFlightGuard<'_>> {
        if self.try_acquire(key) {
            Some(InFlightGuard {
                set: self,
                key: key.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&self) {
        self.keys.clear();
    }
}

/// Releases its key when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_acquire_is_rejected() {
        let set = InFlightSet::new();
        assert!(set.try_acquire("positions-0x1"));
        assert!(!set.try_acquire("positions-0x1"));
        assert_eq!(set.len(), 1);
        assert!(set.try_acquire("positions-0x2"));

        set.release("positions-0x1");
        assert!(set.try_acquire("positions-0x1"));
    }

    #[test]
    fn test_release_of_absent_key_is_harmless() {
        let set = InFlightSet::new();
        set.release("missing");
        assert!(set.is_empty());
    }

    #[test]
    fn test_guard_releases_on_every_exit_path() {
        fn fallible(set: &InFlightSet, fail: bool) -> Result<(), &'static str> {
            let _guard = set.acquire("quote").ok_or("busy")?;
            if fail {
                return Err("remote failure");
            }
            Ok(())
        }

        let set = InFlightSet::new();
        assert!(fallible(&set, true).is_err());
        assert!(!set.contains("quote"));
        assert!(fallible(&set, false).is_ok());
        assert!(!set.contains("quote"));

        let held = set.acquire("quote").expect("slot should be free");
        assert_eq!(fallible(&set, false), Err("busy"));
        drop(held);
        assert!(set.is_empty());
    }
}
