//! Filtering, sorting and KPI summaries over a scored table. Nothing here
//! recomputes metrics; it only selects and orders rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::pipeline::metrics::saturate;
use crate::types::ScoredProtocol;

/// Rows must clear these to count as the "top undervalued pick".
pub mod pick_thresholds {
    pub const MIN_ANNUALIZED_REVENUE: f64 = 100_000.0;
    pub const MIN_VENTURE_SCORE: f64 = 50.0;
}

/// Empty category / chain lists place no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolFilter {
    pub categories: Vec<String>,
    pub chains: Vec<String>,
    pub min_tvl: f64,
}

impl ProtocolFilter {
    pub fn matches(&self, row: &ScoredProtocol) -> bool {
        let p = row.protocol();
        let category_ok = self.categories.is_empty()
            || p.category.as_ref().map_or(false, |c| self.categories.iter().any(|f| f == c));
        let chain_ok = self.chains.is_empty() || self.chains.iter().any(|f| *f == p.primary_chain);
        category_ok && chain_ok && p.tvl >= self.min_tvl
    }

    pub fn apply<'a>(&self, rows: &'a [ScoredProtocol]) -> Vec<&'a ScoredProtocol> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    VentureScore,
    Tvl,
    Mcap,
    AnnualizedRevenue,
    PsRatio,
    UpsidePotential,
    FairValue,
    RevenueTrend,
    ValuationScore,
    TrendScore,
    EfficiencyScore,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        SortKey::VentureScore,
        SortKey::Tvl,
        SortKey::Mcap,
        SortKey::AnnualizedRevenue,
        SortKey::PsRatio,
        SortKey::UpsidePotential,
        SortKey::FairValue,
        SortKey::RevenueTrend,
        SortKey::ValuationScore,
        SortKey::TrendScore,
        SortKey::EfficiencyScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::VentureScore => "venture_score",
            SortKey::Tvl => "tvl",
            SortKey::Mcap => "mcap",
            SortKey::AnnualizedRevenue => "annualized_revenue",
            SortKey::PsRatio => "ps_ratio",
            SortKey::UpsidePotential => "upside_potential",
            SortKey::FairValue => "fair_value",
            SortKey::RevenueTrend => "revenue_trend",
            SortKey::ValuationScore => "valuation_score",
            SortKey::TrendScore => "trend_score",
            SortKey::EfficiencyScore => "efficiency_score",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|k| k.as_str().eq_ignore_ascii_case(s))
    }

    /// `None` only for an unmeasurable P/S.
    fn value(self, row: &ScoredProtocol) -> Option<f64> {
        let m = &row.metrics;
        let v = match self {
            SortKey::VentureScore => row.venture_score,
            SortKey::Tvl => m.protocol.tvl,
            SortKey::Mcap => m.protocol.mcap,
            SortKey::AnnualizedRevenue => m.annualized_revenue,
            SortKey::PsRatio => return m.ps_ratio.finite(),
            SortKey::UpsidePotential => m.upside_potential,
            SortKey::FairValue => m.fair_value,
            SortKey::RevenueTrend => row.revenue_trend,
            SortKey::ValuationScore => row.valuation_score,
            SortKey::TrendScore => row.trend_score,
            SortKey::EfficiencyScore => row.efficiency_score,
        };
        Some(v)
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Stable sort; rows without a value (unmeasurable P/S) go last either way.
pub fn sort_rows(rows: &mut [&ScoredProtocol], key: SortKey, order: SortOrder) {
    rows.sort_by(|a, b| match (key.value(a), key.value(b)) {
        (Some(x), Some(y)) => match order {
            SortOrder::Ascending => x.total_cmp(&y),
            SortOrder::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub protocols_scanned: usize,
    pub sector_median_ps: f64,
    pub total_revenue_24h: f64,
    pub top_pick: Option<String>,
}

/// KPI cards for a (possibly filtered) table.
pub fn summarize(rows: &[&ScoredProtocol], sector_median_ps: f64) -> Summary {
    let total_revenue_24h: f64 = rows.iter().map(|r| r.protocol().revenue.total24h).sum();

    let top_pick = rows
        .iter()
        .filter(|r| {
            r.metrics.upside_potential > 0.0
                && r.metrics.annualized_revenue > pick_thresholds::MIN_ANNUALIZED_REVENUE
                && r.venture_score > pick_thresholds::MIN_VENTURE_SCORE
        })
        // first row wins ties
        .fold(None::<&&ScoredProtocol>, |best, r| match best {
            Some(b) if b.venture_score >= r.venture_score => Some(b),
            _ => Some(r),
        })
        .map(|r| r.name().to_string());

    Summary {
        protocols_scanned: rows.len(),
        sector_median_ps,
        total_revenue_24h,
        top_pick,
    }
}

/// Distinct categories and primary chains present in the table, sorted.
pub fn filter_options(rows: &[ScoredProtocol]) -> (Vec<String>, Vec<String>) {
    let categories: BTreeSet<&str> = rows
        .iter()
        .filter_map(|r| r.protocol().category.as_deref())
        .collect();
    let chains: BTreeSet<&str> = rows.iter().map(|r| r.protocol().primary_chain.as_str()).collect();
    (
        categories.into_iter().map(String::from).collect(),
        chains.into_iter().map(String::from).collect(),
    )
}

/// One slice of the market composition view.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTvl {
    pub category: String,
    pub tvl: f64,
    pub protocols: usize,
    /// Percent of the TVL summed over all categorized rows.
    pub share_pct: f64,
}

/// TVL summed per category, largest first (ties by name). Rows without a
/// category are left out.
pub fn category_tvl(rows: &[&ScoredProtocol]) -> Vec<CategoryTvl> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for r in rows {
        if let Some(category) = r.protocol().category.as_deref() {
            let entry = groups.entry(category).or_insert((0.0, 0));
            entry.0 = saturate(entry.0 + r.protocol().tvl);
            entry.1 += 1;
        }
    }

    let total = saturate(groups.values().map(|(tvl, _)| tvl).sum());
    let mut out: Vec<CategoryTvl> = groups
        .into_iter()
        .map(|(category, (tvl, protocols))| CategoryTvl {
            category: category.to_string(),
            tvl,
            protocols,
            share_pct: if total > 0.0 { saturate(tvl / total * 100.0) } else { 0.0 },
        })
        .collect();
    out.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));
    out
}
