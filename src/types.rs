use serde::{Deserialize, Serialize};

use crate::config::UNKNOWN_CHAIN;

// ---------------------------------------------------------------------------
// Upstream rows (as delivered by the data provider)
// ---------------------------------------------------------------------------

/// One row of the DefiLlama protocol list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolRow {
    pub name: String,
    pub symbol: String,
    pub tvl: f64,
    pub mcap: f64,
    pub category: Option<String>,
    pub chains: Vec<String>,
}

impl ProtocolRow {
    /// First listed chain, or "Unknown" when the protocol lists none.
    pub fn primary_chain(&self) -> String {
        self.chains
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_CHAIN.to_string())
    }
}

/// One row of the DefiLlama fees overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRow {
    pub name: String,
    pub symbol: String,
    #[serde(flatten)]
    pub revenue: RevenueFields,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueFields {
    pub total24h: f64,
    pub total7d: f64,
    pub total30d: f64,
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Protocol row after reconciliation with the revenue table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolRecord {
    pub name: String,
    pub symbol: String,
    pub tvl: f64,
    pub mcap: f64,
    pub category: Option<String>,
    pub chains: Vec<String>,
    pub primary_chain: String,
    #[serde(flatten)]
    pub revenue: RevenueFields,
}

/// Price/sales multiple. `Unmeasurable` stands in for an infinite ratio
/// (no annualized revenue) so it never takes part in arithmetic.
///
/// Serializes as a number, or `null` when unmeasurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum PsRatio {
    Finite(f64),
    Unmeasurable,
}

impl PsRatio {
    /// Finite-only view: `None` wherever the ratio is unmeasurable.
    pub fn finite(self) -> Option<f64> {
        match self {
            PsRatio::Finite(v) => Some(v),
            PsRatio::Unmeasurable => None,
        }
    }
}

impl From<Option<f64>> for PsRatio {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(x) if x.is_finite() => PsRatio::Finite(x),
            _ => PsRatio::Unmeasurable,
        }
    }
}

impl From<PsRatio> for Option<f64> {
    fn from(v: PsRatio) -> Self {
        v.finite()
    }
}

impl std::fmt::Display for PsRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PsRatio::Finite(v) => write!(f, "{v:.2}x"),
            PsRatio::Unmeasurable => write!(f, "n/a"),
        }
    }
}

/// Reconciled row extended with the valuation metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    #[serde(flatten)]
    pub protocol: ProtocolRecord,
    pub annualized_revenue: f64,
    pub ps_ratio: PsRatio,
    /// Batch statistic, identical on every row of one run.
    pub sector_median_ps: f64,
    pub fair_value: f64,
    /// Percent, may be negative.
    pub upside_potential: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    Calculated,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl std::fmt::Display for TrendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendStatus::Calculated => write!(f, "Calculated"),
            TrendStatus::InsufficientData => write!(f, "Insufficient Data"),
        }
    }
}

/// Final output row: metrics plus the three sub-scores and the composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProtocol {
    #[serde(flatten)]
    pub metrics: MetricsRecord,
    pub daily_avg_7d: f64,
    /// Percent change of the last day against the 7-day daily average.
    pub revenue_trend: f64,
    pub revenue_trend_status: TrendStatus,
    pub tvl_mcap_ratio: f64,
    pub valuation_score: f64,
    pub trend_score: f64,
    pub efficiency_score: f64,
    /// 0–100, one decimal place.
    pub venture_score: f64,
}

impl ScoredProtocol {
    pub fn name(&self) -> &str {
        &self.metrics.protocol.name
    }

    pub fn protocol(&self) -> &ProtocolRecord {
        &self.metrics.protocol
    }
}

// ---------------------------------------------------------------------------
// Data provenance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Both tables came from the live API (or its cache).
    Live,
    /// One table is live, the other synthetic.
    Mixed,
    /// Both tables are synthetic.
    Synthetic,
}

impl DataSource {
    pub fn from_flags(protocols_live: bool, revenue_live: bool) -> Self {
        match (protocols_live, revenue_live) {
            (true, true) => DataSource::Live,
            (false, false) => DataSource::Synthetic,
            _ => DataSource::Mixed,
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataSource::Live => "live",
            DataSource::Mixed => "mixed",
            DataSource::Synthetic => "synthetic",
        };
        write!(f, "{s}")
    }
}
