//! Shared health state for the /health endpoint.
//! Updated by the snapshot refresher after every load-and-score cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Rows in the current scored table.
    pub rows_loaded: AtomicU64,
    /// Nanosecond timestamp of the last completed refresh (0 = none).
    pub last_refresh_at_ns: AtomicU64,
    /// True when any input table of the current snapshot is synthetic.
    pub using_synthetic: AtomicBool,
    pub refresh_count: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&self, rows: usize, at_ns: u64, synthetic: bool) {
        self.rows_loaded.store(rows as u64, Ordering::Relaxed);
        self.last_refresh_at_ns.store(at_ns, Ordering::Relaxed);
        self.using_synthetic.store(synthetic, Ordering::Relaxed);
        self.refresh_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rows_loaded(&self) -> u64 {
        self.rows_loaded.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn using_synthetic(&self) -> bool {
        self.using_synthetic.load(Ordering::Relaxed)
    }

    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_refresh_updates_all_fields() {
        let h = HealthState::new();
        h.record_refresh(42, 1_000, true);
        h.record_refresh(43, 2_000, false);
        assert_eq!(h.rows_loaded(), 43);
        assert_eq!(h.last_refresh_at_ns(), 2_000);
        assert!(!h.using_synthetic());
        assert_eq!(h.refresh_count(), 2);
    }
}
