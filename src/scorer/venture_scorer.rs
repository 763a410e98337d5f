use crate::config::ScoringConfig;
use crate::pipeline::metrics::saturate;
use crate::types::{MetricsRecord, ScoredProtocol, TrendStatus};

/// Blends valuation gap, revenue trend and capital efficiency into a 0–100
/// venture score. Holds its weights so differently-weighted scorers can run
/// side by side.
#[derive(Debug, Clone, Copy)]
pub struct VentureScorer {
    cfg: ScoringConfig,
}

impl VentureScorer {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.cfg
    }

    pub fn score_all(&self, records: Vec<MetricsRecord>) -> Vec<ScoredProtocol> {
        records.into_iter().map(|m| self.score(m)).collect()
    }

    pub fn score(&self, metrics: MetricsRecord) -> ScoredProtocol {
        let cfg = &self.cfg;
        let revenue = metrics.protocol.revenue;

        let valuation_score = scale(metrics.upside_potential, cfg.upside_clamp, cfg.valuation_weight);

        let daily_avg_7d = revenue.total7d / 7.0;
        let (revenue_trend, revenue_trend_status) = revenue_trend(revenue.total24h, daily_avg_7d);
        let trend_score = scale(revenue_trend, cfg.trend_clamp, cfg.trend_weight);

        let tvl_mcap_ratio = if metrics.protocol.mcap > 0.0 {
            metrics.protocol.tvl / metrics.protocol.mcap
        } else {
            0.0
        };
        let efficiency_score = scale(tvl_mcap_ratio, cfg.efficiency_ratio_clamp, cfg.efficiency_weight);

        let venture_score = composite(valuation_score, trend_score, efficiency_score);

        ScoredProtocol {
            metrics,
            daily_avg_7d: saturate(daily_avg_7d),
            revenue_trend,
            revenue_trend_status,
            tvl_mcap_ratio: saturate(tvl_mcap_ratio),
            valuation_score,
            trend_score,
            efficiency_score,
            venture_score,
        }
    }
}

impl Default for VentureScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Last-day revenue against the 7-day daily average, in percent.
fn revenue_trend(total24h: f64, daily_avg_7d: f64) -> (f64, TrendStatus) {
    if daily_avg_7d > 0.0 {
        let trend = (total24h - daily_avg_7d) / daily_avg_7d * 100.0;
        (saturate(trend), TrendStatus::Calculated)
    } else {
        (0.0, TrendStatus::InsufficientData)
    }
}

/// Clamp `value` to `[lo, hi]` and map it linearly onto `[0, weight * 100]`.
fn scale(value: f64, (lo, hi): (f64, f64), weight: f64) -> f64 {
    let max_points = (weight * 100.0).max(0.0);
    if !(hi > lo) || !max_points.is_finite() {
        return 0.0;
    }
    // infinities saturate at the range ends; NaN counts as zero
    let v = if value.is_nan() { 0.0 } else { value }.clamp(lo, hi);
    ((v - lo) / (hi - lo) * max_points).clamp(0.0, max_points)
}

/// Sum of sub-scores, rounded to one decimal, clamped to [0, 100].
fn composite(valuation: f64, trend: f64, efficiency: f64) -> f64 {
    let sum = saturate(valuation + trend + efficiency);
    let rounded = (sum * 10.0).round_ties_even() / 10.0;
    rounded.clamp(0.0, 100.0)
}
