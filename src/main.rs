mod api;
mod cache;
mod categories;
mod config;
mod error;
mod fetcher;
mod filter;
mod pipeline;
mod provider;
mod refresh;
mod scorer;
mod state;
mod synthetic;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::RefreshLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::provider::DataProvider;
use crate::refresh::SnapshotRefresher;
use crate::scorer::VentureScorer;
use crate::state::SnapshotStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    if let Err(e) = cfg.scoring.validate() {
        warn!("Scoring config is inconsistent, scores will still be clamped to [0, 100]: {e}");
    }
    info!(
        "Scoring weights: valuation={:.2} trend={:.2} efficiency={:.2} | P/S outlier ceiling={} default median={}",
        cfg.scoring.valuation_weight,
        cfg.scoring.trend_weight,
        cfg.scoring.efficiency_weight,
        cfg.scoring.ps_outlier_ceiling,
        cfg.scoring.default_sector_median,
    );

    // --- Shared state ---
    let store = SnapshotStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(RefreshLatency::default());

    let refresher = Arc::new(SnapshotRefresher::new(
        DataProvider::new(&cfg)?,
        VentureScorer::new(cfg.scoring),
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
        Duration::from_secs(cfg.refresh_interval_secs),
    ));

    // --- Initial load: the API never serves an empty store ---
    let snapshot = refresher.refresh().await;
    info!(
        "Bootstrap complete: {} protocols scored from {} data (cache ttl={}s, refresh every {}s)",
        snapshot.rows.len(),
        snapshot.source,
        cfg.cache_ttl_secs,
        cfg.refresh_interval_secs,
    );

    // Background refresher
    let background = Arc::clone(&refresher);
    tokio::spawn(async move { background.run().await });

    // HTTP API server
    let api_state = ApiState {
        store,
        refresher,
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
