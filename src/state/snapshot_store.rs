use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{DataSource, ScoredProtocol};

/// One scored table plus what is needed to present it.
#[derive(Debug, Clone)]
pub struct ScoredSnapshot {
    pub rows: Arc<Vec<ScoredProtocol>>,
    pub sector_median_ps: f64,
    pub source: DataSource,
    pub notices: Vec<String>,
    /// Nanosecond UTC epoch of the pipeline run.
    pub generated_at_ns: u64,
}

/// Latest scored table. The refresher replaces it wholesale; API handlers
/// take a cheap clone and never see a half-written table.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<ScoredSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A poisoned lock is recovered: the slot only ever holds a complete
    /// snapshot, so a panicked writer cannot leave it half-written.
    pub fn replace(&self, snapshot: ScoredSnapshot) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(snapshot);
    }

    pub fn latest(&self) -> Option<ScoredSnapshot> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(source: DataSource) -> ScoredSnapshot {
        ScoredSnapshot {
            rows: Arc::new(Vec::new()),
            sector_median_ps: 10.0,
            source,
            notices: vec![],
            generated_at_ns: 1,
        }
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = SnapshotStore::new();
        assert!(store.latest().is_none());
    }

    #[test]
    fn replace_swaps_whole_snapshot() {
        let store = SnapshotStore::new();
        store.replace(snapshot(DataSource::Synthetic));
        store.replace(snapshot(DataSource::Live));
        assert_eq!(store.latest().map(|s| s.source), Some(DataSource::Live));
    }

    #[test]
    fn replace_survives_poisoned_lock() {
        let store = SnapshotStore::new();
        store.replace(snapshot(DataSource::Synthetic));

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.current.write().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(store.current.is_poisoned());

        store.replace(snapshot(DataSource::Live));
        assert_eq!(store.latest().map(|s| s.source), Some(DataSource::Live));
    }
}
