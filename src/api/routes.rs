use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::{LatencySummary, RefreshLatency};
use crate::categories;
use crate::error::AppError;
use crate::filter::{
    category_tvl, filter_options, sort_rows, summarize, CategoryTvl, ProtocolFilter, SortKey, SortOrder, Summary,
};
use crate::pipeline::reconciler::normalize_key;
use crate::refresh::SnapshotRefresher;
use crate::state::{ScoredSnapshot, SnapshotStore};
use crate::types::{DataSource, ScoredProtocol};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SnapshotStore>,
    pub refresher: Arc<SnapshotRefresher>,
    pub health: Arc<HealthState>,
    pub latency: Arc<RefreshLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/protocols", get(get_protocols))
        .route("/protocols/:name", get(get_protocol))
        .route("/stats/summary", get(get_stats_summary))
        .route("/stats/categories", get(get_stats_categories))
        .route("/stats/latency", get(get_stats_latency))
        .route("/filters", get(get_filters))
        .route("/health", get(get_health))
        .route("/refresh", post(post_refresh))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

/// Shared by /protocols, /stats/summary and /stats/categories. `category`
/// and `chain` are comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub chain: Option<String>,
    pub min_tvl: Option<f64>,
}

impl FilterQuery {
    pub fn to_filter(&self) -> ProtocolFilter {
        build_filter(self.category.as_deref(), self.chain.as_deref(), self.min_tvl)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProtocolsQuery {
    pub category: Option<String>,
    pub chain: Option<String>,
    pub min_tvl: Option<f64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<usize>,
}

impl ProtocolsQuery {
    pub fn to_filter(&self) -> ProtocolFilter {
        build_filter(self.category.as_deref(), self.chain.as_deref(), self.min_tvl)
    }

    pub fn sort(&self) -> Result<(SortKey, SortOrder), AppError> {
        let key = match self.sort.as_deref() {
            None => SortKey::default(),
            Some(s) => SortKey::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown sort key `{s}`")))?,
        };
        let order = match self.order.as_deref() {
            None => SortOrder::default(),
            Some(s) => SortOrder::parse(s).ok_or_else(|| AppError::BadRequest(format!("unknown sort order `{s}`")))?,
        };
        Ok((key, order))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    /// Bypass the upstream cache.
    pub force: Option<bool>,
}

fn build_filter(category: Option<&str>, chain: Option<&str>, min_tvl: Option<f64>) -> ProtocolFilter {
    ProtocolFilter {
        categories: split_list(category),
        chains: split_list(chain),
        min_tvl: min_tvl.filter(|v| v.is_finite()).unwrap_or(0.0),
    }
}

fn split_list(s: Option<&str>) -> Vec<String> {
    s.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: Summary,
    pub total_protocols: usize,
    pub data_source: DataSource,
    pub notices: Vec<String>,
    pub generated_at_ns: u64,
}

#[derive(Serialize)]
pub struct CategoryOption {
    pub name: String,
    pub description: Option<&'static str>,
}

#[derive(Serialize)]
pub struct FiltersResponse {
    pub categories: Vec<CategoryOption>,
    pub chains: Vec<String>,
    pub sort_keys: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub rows_loaded: u64,
    pub last_refresh_at_ns: u64,
    pub using_synthetic: bool,
    pub refresh_count: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub load: LatencySummary,
    pub pipeline: LatencySummary,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub rows: usize,
    pub data_source: DataSource,
    pub sector_median_ps: f64,
    pub notices: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn latest(state: &ApiState) -> Result<ScoredSnapshot, AppError> {
    state.store.latest().ok_or(AppError::NotReady)
}

async fn get_protocols(
    State(state): State<ApiState>,
    Query(params): Query<ProtocolsQuery>,
) -> Result<Json<Vec<ScoredProtocol>>, AppError> {
    let (key, order) = params.sort()?;
    let snapshot = latest(&state)?;

    let mut rows = params.to_filter().apply(&snapshot.rows);
    sort_rows(&mut rows, key, order);
    if let Some(limit) = params.limit {
        rows.truncate(limit);
    }

    Ok(Json(rows.into_iter().cloned().collect()))
}

async fn get_protocol(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<ScoredProtocol>, AppError> {
    let snapshot = latest(&state)?;
    let wanted = normalize_key(&name);
    snapshot
        .rows
        .iter()
        .find(|r| normalize_key(r.name()) == wanted)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("protocol `{name}`")))
}

async fn get_stats_summary(
    State(state): State<ApiState>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let snapshot = latest(&state)?;
    let rows = params.to_filter().apply(&snapshot.rows);

    Ok(Json(SummaryResponse {
        summary: summarize(&rows, snapshot.sector_median_ps),
        total_protocols: snapshot.rows.len(),
        data_source: snapshot.source,
        notices: snapshot.notices.clone(),
        generated_at_ns: snapshot.generated_at_ns,
    }))
}

async fn get_stats_categories(
    State(state): State<ApiState>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<Vec<CategoryTvl>>, AppError> {
    let snapshot = latest(&state)?;
    let rows = params.to_filter().apply(&snapshot.rows);
    Ok(Json(category_tvl(&rows)))
}

async fn get_filters(State(state): State<ApiState>) -> Result<Json<FiltersResponse>, AppError> {
    let snapshot = latest(&state)?;
    let (category_names, chains) = filter_options(&snapshot.rows);

    Ok(Json(FiltersResponse {
        categories: category_names
            .into_iter()
            .map(|name| CategoryOption { description: categories::describe(&name), name })
            .collect(),
        chains,
        sort_keys: SortKey::ALL.iter().map(|k| k.as_str()).collect(),
    }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        rows_loaded: state.health.rows_loaded(),
        last_refresh_at_ns: state.health.last_refresh_at_ns(),
        using_synthetic: state.health.using_synthetic(),
        refresh_count: state.health.refresh_count(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        load: state.latency.load.summary(),
        pipeline: state.latency.pipeline.summary(),
    })
}

async fn post_refresh(
    State(state): State<ApiState>,
    Query(params): Query<RefreshQuery>,
) -> Json<RefreshResponse> {
    if params.force.unwrap_or(false) {
        state.refresher.invalidate_cache();
    }
    let snapshot = state.refresher.refresh().await;
    Json(RefreshResponse {
        rows: snapshot.rows.len(),
        data_source: snapshot.source,
        sector_median_ps: snapshot.sector_median_ps,
        notices: snapshot.notices,
    })
}
