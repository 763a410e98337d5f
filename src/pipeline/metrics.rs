use crate::config::ScoringConfig;
use crate::types::{MetricsRecord, ProtocolRecord, PsRatio, RevenueFields};

/// Overflow saturates at `±f64::MAX`; NaN becomes 0. Every metric output
/// goes through here so JSON never carries a non-finite number.
pub fn saturate(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-f64::MAX, f64::MAX)
    }
}

/// 30-day revenue × 12 when available, otherwise 24h revenue × 365.
pub fn annualized_revenue(revenue: &RevenueFields) -> f64 {
    let annual = if revenue.total30d > 0.0 {
        revenue.total30d * 12.0
    } else {
        revenue.total24h * 365.0
    };
    saturate(annual)
}

pub fn ps_ratio(mcap: f64, annualized_revenue: f64) -> PsRatio {
    if annualized_revenue > 0.0 {
        PsRatio::Finite(saturate(mcap / annualized_revenue))
    } else {
        PsRatio::Unmeasurable
    }
}

/// Median P/S across the batch, over finite ratios in `(0, ps_outlier_ceiling)`.
/// Falls back to `default_sector_median` when no ratio qualifies.
pub fn compute_sector_median(ratios: impl IntoIterator<Item = PsRatio>, cfg: &ScoringConfig) -> f64 {
    let mut valid: Vec<f64> = ratios
        .into_iter()
        .filter_map(PsRatio::finite)
        .filter(|&v| v > 0.0 && v < cfg.ps_outlier_ceiling)
        .collect();

    if valid.is_empty() {
        return cfg.default_sector_median;
    }

    valid.sort_by(f64::total_cmp);
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    }
}

/// Percent gap between fair value and market cap; 0 without a market cap.
pub fn upside_potential(fair_value: f64, mcap: f64) -> f64 {
    if mcap > 0.0 {
        saturate((fair_value - mcap) / mcap * 100.0)
    } else {
        0.0
    }
}

/// Derive the valuation metrics for a reconciled batch.
///
/// Two passes: P/S for every row, then the sector median once, broadcast
/// into fair value and upside. Row count and order are unchanged.
pub fn calculate_metrics(records: Vec<ProtocolRecord>, cfg: &ScoringConfig) -> Vec<MetricsRecord> {
    let base: Vec<(ProtocolRecord, f64, PsRatio)> = records
        .into_iter()
        .map(|r| {
            let annual = annualized_revenue(&r.revenue);
            let ps = ps_ratio(r.mcap, annual);
            (r, annual, ps)
        })
        .collect();

    let sector_median_ps = compute_sector_median(base.iter().map(|(_, _, ps)| *ps), cfg);

    base.into_iter()
        .map(|(protocol, annualized_revenue, ps_ratio)| {
            let fair_value = saturate(annualized_revenue * sector_median_ps);
            let upside_potential = upside_potential(fair_value, protocol.mcap);
            MetricsRecord {
                protocol,
                annualized_revenue,
                ps_ratio,
                sector_median_ps,
                fair_value,
                upside_potential,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mcap: f64, total24h: f64, total7d: f64, total30d: f64) -> ProtocolRecord {
        ProtocolRecord {
            name: "Foo".to_string(),
            symbol: "FOO".to_string(),
            tvl: 500_000.0,
            mcap,
            category: Some("Dexs".to_string()),
            chains: vec!["Ethereum".to_string()],
            primary_chain: "Ethereum".to_string(),
            revenue: RevenueFields { total24h, total7d, total30d },
        }
    }

    #[test]
    fn thirty_day_revenue_is_preferred() {
        let out = calculate_metrics(vec![record(1_000_000.0, 4_000.0, 28_000.0, 100_000.0)], &ScoringConfig::default());
        assert_eq!(out[0].annualized_revenue, 1_200_000.0);
        let ps = out[0].ps_ratio.finite().unwrap();
        assert!((ps - 0.8333).abs() < 1e-3, "ps={ps}");
    }

    #[test]
    fn daily_revenue_fallback_when_no_thirty_day_data() {
        let out = calculate_metrics(vec![record(1_000_000.0, 1_000.0, 0.0, 0.0)], &ScoringConfig::default());
        assert_eq!(out[0].annualized_revenue, 365_000.0);
    }

    #[test]
    fn zero_mcap_has_zero_upside() {
        let out = calculate_metrics(vec![record(0.0, 1_000.0, 7_000.0, 30_000.0)], &ScoringConfig::default());
        assert_eq!(out[0].upside_potential, 0.0);
        assert_eq!(out[0].ps_ratio, PsRatio::Finite(0.0));
    }

    #[test]
    fn ps_is_unmeasurable_exactly_when_no_revenue() {
        let rows = vec![
            record(1_000.0, 0.0, 0.0, 0.0),
            record(1_000.0, 1.0, 0.0, 0.0),
            record(0.0, 0.0, 0.0, 0.0),
        ];
        let out = calculate_metrics(rows, &ScoringConfig::default());
        for m in &out {
            assert_eq!(m.ps_ratio == PsRatio::Unmeasurable, m.annualized_revenue <= 0.0);
        }
    }

    #[test]
    fn default_median_when_nothing_qualifies() {
        let rows = vec![
            record(1_000.0, 0.0, 0.0, 0.0),        // unmeasurable
            record(0.0, 10.0, 0.0, 0.0),           // ps = 0, excluded
            record(1_000_000_000.0, 1.0, 0.0, 0.0), // ps way above ceiling
        ];
        let out = calculate_metrics(rows, &ScoringConfig::default());
        assert!(out.iter().all(|m| m.sector_median_ps == 10.0));
    }

    #[test]
    fn median_of_even_and_odd_sets() {
        let cfg = ScoringConfig::default();
        let odd = [3.0, 1.0, 2.0].map(PsRatio::Finite);
        assert_eq!(compute_sector_median(odd, &cfg), 2.0);
        let even = [4.0, 1.0, 2.0, 3.0].map(PsRatio::Finite);
        assert_eq!(compute_sector_median(even, &cfg), 2.5);
    }

    #[test]
    fn median_excludes_outliers_and_unmeasurable() {
        let cfg = ScoringConfig::default();
        let ratios = vec![
            PsRatio::Finite(5.0),
            PsRatio::Finite(1000.0),
            PsRatio::Finite(5_000.0),
            PsRatio::Unmeasurable,
            PsRatio::Finite(-1.0),
        ];
        assert_eq!(compute_sector_median(ratios, &cfg), 5.0);
    }

    #[test]
    fn sector_median_is_shared_across_batch() {
        let rows = vec![
            record(1_000_000.0, 100.0, 700.0, 3_000.0),
            record(2_000_000.0, 200.0, 1_400.0, 6_000.0),
            record(5_000.0, 0.0, 0.0, 0.0),
        ];
        let out = calculate_metrics(rows, &ScoringConfig::default());
        let first = out[0].sector_median_ps;
        assert!(out.iter().all(|m| m.sector_median_ps == first));
        // fair value uses the broadcast median
        for m in &out {
            assert!((m.fair_value - m.annualized_revenue * first).abs() < 1e-6);
        }
    }

    #[test]
    fn extreme_amounts_saturate_instead_of_overflowing() {
        let cfg = ScoringConfig::default();
        let rows = vec![
            record(1_000_000.0, 0.0, 0.0, 1e308),
            record(1_000_000.0, 5e-324, 0.0, 0.0),
            record(f64::MAX, 1.0, 7.0, 30.0),
        ];
        let out = calculate_metrics(rows, &cfg);

        assert_eq!(out[0].annualized_revenue, f64::MAX);
        assert_eq!(out[1].ps_ratio, PsRatio::Finite(f64::MAX));
        for m in &out {
            assert!(m.annualized_revenue.is_finite());
            assert!(m.ps_ratio.finite().map_or(true, f64::is_finite));
            assert!(m.fair_value.is_finite());
            assert!(m.upside_potential.is_finite());
        }

        let json = serde_json::to_value(&out[0]).unwrap();
        assert!(json["annualized_revenue"].is_number());
        assert!(json["fair_value"].is_number());
        assert!(json["upside_potential"].is_number());
    }

    #[test]
    fn saturate_clamps_and_zeroes_nan() {
        assert_eq!(saturate(f64::INFINITY), f64::MAX);
        assert_eq!(saturate(f64::NEG_INFINITY), -f64::MAX);
        assert_eq!(saturate(f64::NAN), 0.0);
        assert_eq!(saturate(-3.5), -3.5);
    }

    #[test]
    fn upside_is_negative_for_overvalued_protocol() {
        // ps = 50 against a lone median of 50 -> fair value == mcap
        let cfg = ScoringConfig::default();
        assert_eq!(upside_potential(50.0, 100.0), -50.0);
        let out = calculate_metrics(vec![record(600_000.0, 0.0, 0.0, 1_000.0)], &cfg);
        assert!(out[0].upside_potential.abs() < 1e-9);
    }
}
