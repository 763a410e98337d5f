use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::api::latency::RefreshLatency;
use crate::pipeline::run_pipeline;
use crate::provider::DataProvider;
use crate::scorer::VentureScorer;
use crate::state::{ScoredSnapshot, SnapshotStore};
use crate::types::DataSource;

/// Loads both upstream tables, runs the pipeline and publishes the result.
/// Runs once at startup, then on a fixed interval; the API can trigger
/// an extra run.
pub struct SnapshotRefresher {
    provider: DataProvider,
    scorer: VentureScorer,
    store: Arc<SnapshotStore>,
    health: Arc<HealthState>,
    latency: Arc<RefreshLatency>,
    interval: Duration,
    /// Serializes scheduled and on-demand refreshes.
    in_flight: Mutex<()>,
}

impl SnapshotRefresher {
    pub fn new(
        provider: DataProvider,
        scorer: VentureScorer,
        store: Arc<SnapshotStore>,
        health: Arc<HealthState>,
        latency: Arc<RefreshLatency>,
        interval: Duration,
    ) -> Self {
        Self {
            provider,
            scorer,
            store,
            health,
            latency,
            interval,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.interval);
        ticker.tick().await; // first tick fires immediately; startup already refreshed

        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }

    /// Drop cached upstream tables before the next refresh.
    pub fn invalidate_cache(&self) {
        self.provider.invalidate_cache();
    }

    pub async fn refresh(&self) -> ScoredSnapshot {
        let _guard = self.in_flight.lock().await;

        let load_started = Instant::now();
        let dataset = self.provider.load().await;
        self.latency.load.record(load_started.elapsed());

        for notice in &dataset.notices {
            warn!(source = %dataset.source, "{notice}");
        }

        let pipeline_started = Instant::now();
        let output = run_pipeline(&dataset.protocols, &dataset.revenue, &self.scorer);
        self.latency.pipeline.record(pipeline_started.elapsed());

        let generated_at_ns = now_ns();
        let snapshot = ScoredSnapshot {
            rows: Arc::new(output.rows),
            sector_median_ps: output.sector_median_ps,
            source: dataset.source,
            notices: dataset.notices,
            generated_at_ns,
        };

        self.health.record_refresh(
            snapshot.rows.len(),
            generated_at_ns,
            snapshot.source != DataSource::Live,
        );
        info!(
            rows = snapshot.rows.len(),
            source = %snapshot.source,
            sector_median_ps = snapshot.sector_median_ps,
            matched_by_name = output.reconcile.matched_by_name,
            matched_by_symbol = output.reconcile.matched_by_symbol,
            unmatched = output.reconcile.unmatched,
            "Snapshot refreshed: {} protocols ({} data), sector median P/S {:.2}x",
            snapshot.rows.len(),
            snapshot.source,
            snapshot.sector_median_ps,
        );

        self.store.replace(snapshot.clone());
        snapshot
    }
}

pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
