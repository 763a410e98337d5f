use std::time::Instant;

use serde::Deserialize;

/// Minimum-TVL presets cycled with `t`.
pub const TVL_PRESETS: [f64; 5] = [0.0, 1e6, 1e7, 1e8, 1e9];

pub const DEFAULT_SORT_KEY: &str = "venture_score";

pub const EMPTY_RESULT_MESSAGE: &str = "No protocols match your filter criteria. Try adjusting the filters.";

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolResponse {
    pub name: String,
    pub symbol: String,
    pub tvl: f64,
    pub mcap: f64,
    pub category: Option<String>,
    pub primary_chain: String,
    pub total24h: f64,
    pub total7d: f64,
    pub total30d: f64,
    pub annualized_revenue: f64,
    /// `null` when unmeasurable.
    pub ps_ratio: Option<f64>,
    pub fair_value: f64,
    pub upside_potential: f64,
    pub daily_avg_7d: f64,
    pub revenue_trend: f64,
    pub revenue_trend_status: String,
    pub tvl_mcap_ratio: f64,
    pub valuation_score: f64,
    pub trend_score: f64,
    pub efficiency_score: f64,
    pub venture_score: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SummaryResponse {
    pub protocols_scanned: usize,
    pub sector_median_ps: f64,
    pub total_revenue_24h: f64,
    pub top_pick: Option<String>,
    pub total_protocols: usize,
    pub data_source: String,
    pub notices: Vec<String>,
}

/// One row of GET /stats/categories.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTvlResponse {
    pub category: String,
    pub tvl: f64,
    pub protocols: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryOption {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FiltersResponse {
    pub categories: Vec<CategoryOption>,
    pub chains: Vec<String>,
    pub sort_keys: Vec<String>,
}

// ---------------------------------------------------------------------------
// Filter / sort selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub category: Option<String>,
    pub chain: Option<String>,
    pub tvl_preset: usize,
    pub sort_key: String,
    pub descending: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: None,
            chain: None,
            tvl_preset: 0,
            sort_key: DEFAULT_SORT_KEY.to_string(),
            descending: true,
        }
    }
}

impl FilterState {
    pub fn min_tvl(&self) -> f64 {
        TVL_PRESETS[self.tvl_preset % TVL_PRESETS.len()]
    }

    pub fn cycle_tvl(&mut self) {
        self.tvl_preset = (self.tvl_preset + 1) % TVL_PRESETS.len();
    }

    pub fn toggle_order(&mut self) {
        self.descending = !self.descending;
    }

    /// Query string shared by /protocols and /stats/summary.
    pub fn filter_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(c) = &self.category {
            params.push(("category", c.clone()));
        }
        if let Some(c) = &self.chain {
            params.push(("chain", c.clone()));
        }
        if self.min_tvl() > 0.0 {
            params.push(("min_tvl", self.min_tvl().to_string()));
        }
        params
    }

    pub fn protocol_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.filter_params();
        params.push(("sort", self.sort_key.clone()));
        params.push(("order", if self.descending { "desc" } else { "asc" }.to_string()));
        params
    }
}

/// Next value in `None -> options[0] -> .. -> options[n-1] -> None`.
pub fn cycle_option(current: Option<&str>, options: &[String]) -> Option<String> {
    let next = match current {
        None => 0,
        Some(c) => match options.iter().position(|o| o == c) {
            Some(i) => i + 1,
            None => 0,
        },
    };
    options.get(next).cloned()
}

/// Next sort key, wrapping; falls back to the default when the list is empty.
pub fn cycle_sort_key(current: &str, keys: &[String]) -> String {
    if keys.is_empty() {
        return DEFAULT_SORT_KEY.to_string();
    }
    let i = keys.iter().position(|k| k == current).map_or(0, |i| (i + 1) % keys.len());
    keys[i].clone()
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub summary: SummaryResponse,
    pub protocols: Vec<ProtocolResponse>,
    pub filters: FiltersResponse,
    /// TVL by category for the current filter.
    pub composition: Vec<CategoryTvlResponse>,
    pub selection: FilterState,
    pub last_refresh: Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            summary: SummaryResponse::default(),
            protocols: Vec::new(),
            filters: FiltersResponse::default(),
            composition: Vec::new(),
            selection: FilterState::default(),
            last_refresh: Instant::now(),
            base_url,
        }
    }

    pub fn cycle_category(&mut self) {
        let names: Vec<String> = self.filters.categories.iter().map(|c| c.name.clone()).collect();
        self.selection.category = cycle_option(self.selection.category.as_deref(), &names);
    }

    pub fn cycle_chain(&mut self) {
        self.selection.chain = cycle_option(self.selection.chain.as_deref(), &self.filters.chains);
    }

    pub fn cycle_sort(&mut self) {
        self.selection.sort_key = cycle_sort_key(&self.selection.sort_key, &self.filters.sort_keys);
    }

    pub fn clear_filters(&mut self) {
        self.selection = FilterState::default();
    }

    pub fn category_description(&self) -> Option<&str> {
        let selected = self.selection.category.as_deref()?;
        self.filters
            .categories
            .iter()
            .find(|c| c.name == selected)
            .and_then(|c| c.description.as_deref())
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let protocols_req = client
            .get(format!("{}/protocols", self.base_url))
            .query(&self.selection.protocol_params())
            .send();
        let summary_req = client
            .get(format!("{}/stats/summary", self.base_url))
            .query(&self.selection.filter_params())
            .send();
        let filters_req = client.get(format!("{}/filters", self.base_url)).send();
        let composition_req = client
            .get(format!("{}/stats/categories", self.base_url))
            .query(&self.selection.filter_params())
            .send();

        let (protocols_res, summary_res, filters_res, composition_res) =
            tokio::join!(protocols_req, summary_req, filters_req, composition_req);

        let (protocols_resp, summary_resp) = match (protocols_res, summary_res) {
            (Ok(p), Ok(s)) => (p, s),
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        if !protocols_resp.status().is_success() {
            self.status = ConnectionStatus::Error(format!("HTTP {}", protocols_resp.status()));
            return;
        }

        let (protocols, summary) = tokio::join!(
            protocols_resp.json::<Vec<ProtocolResponse>>(),
            summary_resp.json::<SummaryResponse>(),
        );

        match (protocols, summary) {
            (Ok(p), Ok(s)) => {
                self.protocols = p;
                self.summary = s;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = Instant::now();

                if let Ok(f) = filters_res {
                    if let Ok(filters) = f.json::<FiltersResponse>().await {
                        self.filters = filters;
                    }
                }
                if let Ok(c) = composition_res {
                    if let Ok(composition) = c.json::<Vec<CategoryTvlResponse>>().await {
                        self.composition = composition;
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_usd(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1e9 {
        format!("${:.2}B", v / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", v / 1e6)
    } else if abs >= 1e3 {
        format!("${:.1}K", v / 1e3)
    } else {
        format!("${:.0}", v)
    }
}

pub fn format_ps(ps: Option<f64>) -> String {
    ps.map_or("n/a".to_string(), |v| format!("{v:.2}x"))
}

pub fn format_pct(v: f64) -> String {
    format!("{v:+.1}%")
}

/// Horizontal bar of `width` cells filled in proportion to `pct` (0-100).
pub fn share_bar(pct: f64, width: usize) -> String {
    let filled = ((pct.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cycle_option_walks_then_clears() {
        let opts = names(&["Dexs", "Lending"]);
        assert_eq!(cycle_option(None, &opts).as_deref(), Some("Dexs"));
        assert_eq!(cycle_option(Some("Dexs"), &opts).as_deref(), Some("Lending"));
        assert_eq!(cycle_option(Some("Lending"), &opts), None);
        assert_eq!(cycle_option(Some("Gone"), &opts).as_deref(), Some("Dexs"));
        assert_eq!(cycle_option(None, &[]), None);
    }

    #[test]
    fn cycle_sort_key_wraps() {
        let keys = names(&["venture_score", "tvl"]);
        assert_eq!(cycle_sort_key("venture_score", &keys), "tvl");
        assert_eq!(cycle_sort_key("tvl", &keys), "venture_score");
        assert_eq!(cycle_sort_key("tvl", &[]), DEFAULT_SORT_KEY);
    }

    #[test]
    fn tvl_presets_cycle_back_to_zero() {
        let mut f = FilterState::default();
        for expected in [1e6, 1e7, 1e8, 1e9, 0.0] {
            f.cycle_tvl();
            assert_eq!(f.min_tvl(), expected);
        }
    }

    #[test]
    fn params_only_carry_active_filters() {
        let mut f = FilterState::default();
        assert!(f.filter_params().is_empty());
        assert_eq!(
            f.protocol_params(),
            vec![("sort", "venture_score".to_string()), ("order", "desc".to_string())]
        );

        f.category = Some("Dexs".to_string());
        f.cycle_tvl();
        f.toggle_order();
        let p = f.protocol_params();
        assert!(p.contains(&("category", "Dexs".to_string())));
        assert!(p.contains(&("min_tvl", "1000000".to_string())));
        assert!(p.contains(&("order", "asc".to_string())));
    }

    #[test]
    fn clear_filters_restores_defaults() {
        let mut app = AppState::new("http://localhost:3000".to_string());
        app.selection.chain = Some("Solana".to_string());
        app.selection.tvl_preset = 3;
        app.clear_filters();
        assert_eq!(app.selection, FilterState::default());
    }

    #[test]
    fn formatting() {
        assert_eq!(format_usd(2.5e9), "$2.50B");
        assert_eq!(format_usd(1_234_567.0), "$1.23M");
        assert_eq!(format_usd(4_200.0), "$4.2K");
        assert_eq!(format_usd(12.0), "$12");
        assert_eq!(format_ps(None), "n/a");
        assert_eq!(format_ps(Some(3.14159)), "3.14x");
        assert_eq!(format_pct(12.34), "+12.3%");
        assert_eq!(format_pct(-5.0), "-5.0%");
        assert_eq!(truncate("Uniswap V3", 20), "Uniswap V3");
        assert_eq!(truncate("Uniswap V3", 5), "Unis…");
    }

    #[test]
    fn share_bar_fills_proportionally() {
        assert_eq!(share_bar(50.0, 4), "██░░");
        assert_eq!(share_bar(0.0, 3), "░░░");
        assert_eq!(share_bar(250.0, 2), "██");
        assert_eq!(share_bar(f64::NAN, 2).chars().count(), 2);
    }

    #[test]
    fn composition_rows_deserialize() {
        let json = r#"[{"category":"Lending","tvl":5e8,"protocols":1,"share_pct":96.2}]"#;
        let rows: Vec<CategoryTvlResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].category, "Lending");
        assert_eq!(rows[0].protocols, 1);
    }
}
