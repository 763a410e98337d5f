use crate::error::{AppError, Result};

pub const PROTOCOLS_URL: &str = "https://api.llama.fi/protocols";
pub const FEES_URL: &str = "https://api.llama.fi/overview/fees";

/// How long a live upstream table may be reused before it is fetched again (seconds).
pub const CACHE_TTL_SECS: u64 = 3600;

/// How often the full load-and-score cycle reruns (seconds).
pub const REFRESH_INTERVAL_SECS: u64 = 300;

/// Per-request timeout for the upstream REST calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Placeholder for `primary_chain` when a protocol lists no chains.
pub const UNKNOWN_CHAIN: &str = "Unknown";

/// Scoring model constants.
pub mod model_defaults {
    pub const VALUATION_WEIGHT: f64 = 0.40;
    pub const TREND_WEIGHT: f64 = 0.30;
    pub const EFFICIENCY_WEIGHT: f64 = 0.30;

    /// P/S multiples at or above this are excluded from the sector median.
    pub const PS_OUTLIER_CEILING: f64 = 1000.0;
    /// Sector median used when no protocol has a usable P/S.
    pub const DEFAULT_SECTOR_MEDIAN: f64 = 10.0;

    pub const UPSIDE_CLAMP: (f64, f64) = (-100.0, 200.0);
    pub const TREND_CLAMP: (f64, f64) = (-50.0, 50.0);
    pub const EFFICIENCY_RATIO_CLAMP: (f64, f64) = (0.0, 10.0);
}

/// Immutable scoring model parameters, passed explicitly into the metrics
/// calculator and the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub valuation_weight: f64,
    pub trend_weight: f64,
    pub efficiency_weight: f64,
    pub ps_outlier_ceiling: f64,
    pub default_sector_median: f64,
    /// Upside potential range (%) mapped onto the valuation score.
    pub upside_clamp: (f64, f64),
    /// Revenue trend range (%) mapped onto the trend score.
    pub trend_clamp: (f64, f64),
    /// TVL/mcap range mapped onto the efficiency score.
    pub efficiency_ratio_clamp: (f64, f64),
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use model_defaults::*;
        Self {
            valuation_weight: VALUATION_WEIGHT,
            trend_weight: TREND_WEIGHT,
            efficiency_weight: EFFICIENCY_WEIGHT,
            ps_outlier_ceiling: PS_OUTLIER_CEILING,
            default_sector_median: DEFAULT_SECTOR_MEDIAN,
            upside_clamp: UPSIDE_CLAMP,
            trend_clamp: TREND_CLAMP,
            efficiency_ratio_clamp: EFFICIENCY_RATIO_CLAMP,
        }
    }
}

impl ScoringConfig {
    /// Check the weights and clamp ranges. A config that fails here still
    /// produces bounded scores, but the factor balance is not what was intended.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("valuation_weight", self.valuation_weight),
            ("trend_weight", self.trend_weight),
            ("efficiency_weight", self.efficiency_weight),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(AppError::Config(format!("{name} must be a non-negative number, got {w}")));
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(AppError::Config(format!("scoring weights must sum to 1.0, got {sum}")));
        }

        let ranges = [
            ("upside_clamp", self.upside_clamp),
            ("trend_clamp", self.trend_clamp),
            ("efficiency_ratio_clamp", self.efficiency_ratio_clamp),
        ];
        for (name, (lo, hi)) in ranges {
            if !(lo < hi) {
                return Err(AppError::Config(format!("{name} lower bound {lo} must be below upper bound {hi}")));
            }
        }

        if !(self.ps_outlier_ceiling > 0.0) {
            return Err(AppError::Config("ps_outlier_ceiling must be positive".to_string()));
        }
        if !(self.default_sector_median > 0.0) {
            return Err(AppError::Config("default_sector_median must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    /// DefiLlama protocol list endpoint (PROTOCOLS_URL)
    pub protocols_url: String,
    /// DefiLlama fees overview endpoint (FEES_URL)
    pub fees_url: String,
    /// Upstream cache window in seconds (CACHE_TTL_SECS)
    pub cache_ttl_secs: u64,
    /// Load-and-score cycle interval in seconds (REFRESH_INTERVAL_SECS)
    pub refresh_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            protocols_url: std::env::var("PROTOCOLS_URL")
                .unwrap_or_else(|_| PROTOCOLS_URL.to_string()),
            fees_url: std::env::var("FEES_URL").unwrap_or_else(|_| FEES_URL.to_string()),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(CACHE_TTL_SECS),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .unwrap_or(REFRESH_INTERVAL_SECS),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&s| s > 0)
                .unwrap_or(HTTP_TIMEOUT_SECS),
            scoring: ScoringConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scoring_config_is_valid() {
        let cfg = ScoringConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.valuation_weight + cfg.trend_weight + cfg.efficiency_weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weights_not_summing_to_one_are_rejected() {
        let cfg = ScoringConfig { valuation_weight: 0.6, ..ScoringConfig::default() };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn inverted_clamp_range_is_rejected() {
        let cfg = ScoringConfig { trend_clamp: (50.0, -50.0), ..ScoringConfig::default() };
        assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let cfg = ScoringConfig {
            valuation_weight: 1.1,
            trend_weight: -0.4,
            efficiency_weight: 0.3,
            ..ScoringConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
