use std::time::Instant;

use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::{ProtocolRow, RevenueFields, RevenueRow};

/// Fetch the DefiLlama protocol list: name, symbol, TVL, market cap, category, chains.
pub async fn fetch_protocols(client: &reqwest::Client, url: &str) -> Result<Vec<ProtocolRow>> {
    let started = Instant::now();
    let resp: serde_json::Value = client.get(url).send().await?.error_for_status()?.json().await?;
    let rows = parse_protocol_table(&resp)?;
    debug!(rows = rows.len(), elapsed_ms = started.elapsed().as_millis() as u64, "Fetched protocol table");
    Ok(rows)
}

/// Fetch the DefiLlama fees overview: name, symbol, 24h / 7d / 30d totals.
pub async fn fetch_fees(client: &reqwest::Client, url: &str) -> Result<Vec<RevenueRow>> {
    let started = Instant::now();
    let resp: serde_json::Value = client.get(url).send().await?.error_for_status()?.json().await?;
    let rows = parse_fees_table(&resp)?;
    debug!(rows = rows.len(), elapsed_ms = started.elapsed().as_millis() as u64, "Fetched fees table");
    Ok(rows)
}

pub fn parse_protocol_table(v: &serde_json::Value) -> Result<Vec<ProtocolRow>> {
    let items = v
        .as_array()
        .ok_or_else(|| AppError::Upstream("protocols response was not an array".to_string()))?;
    items.iter().map(parse_protocol_row).collect()
}

pub fn parse_fees_table(v: &serde_json::Value) -> Result<Vec<RevenueRow>> {
    let items = v
        .get("protocols")
        .and_then(|p| p.as_array())
        .ok_or_else(|| AppError::Upstream("no protocols in fees response".to_string()))?;
    items.iter().map(parse_fees_row).collect()
}

fn parse_protocol_row(v: &serde_json::Value) -> Result<ProtocolRow> {
    let name = required_str(v, "protocols", "name")?;

    let category = v
        .get("category")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string());

    let chains = v
        .get("chains")
        .and_then(|c| c.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|c| c.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(ProtocolRow {
        name,
        symbol: optional_str(v, "symbol"),
        tvl: coerce_amount(v.get("tvl")),
        mcap: coerce_amount(v.get("mcap")),
        category,
        chains,
    })
}

fn parse_fees_row(v: &serde_json::Value) -> Result<RevenueRow> {
    Ok(RevenueRow {
        name: required_str(v, "fees", "name")?,
        symbol: optional_str(v, "symbol"),
        revenue: RevenueFields {
            total24h: coerce_amount(v.get("total24h")),
            total7d: coerce_amount(v.get("total7d")),
            total30d: coerce_amount(v.get("total30d")),
        },
    })
}

fn required_str(v: &serde_json::Value, table: &'static str, field: &'static str) -> Result<String> {
    v.get(field)
        .and_then(|s| s.as_str())
        .map(|s| s.to_string())
        .ok_or(AppError::MissingField { table, field })
}

fn optional_str(v: &serde_json::Value, field: &str) -> String {
    v.get(field)
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string()
}

/// Number or numeric string; anything else, non-finite or negative, becomes 0.
pub fn coerce_amount(v: Option<&serde_json::Value>) -> f64 {
    v.and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.trim().parse().ok())))
        .filter(|x: &f64| x.is_finite() && *x >= 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_protocols_with_coercion() {
        let v = json!([
            {"name": "Aave", "symbol": "AAVE", "tvl": 1.5e10, "mcap": "2000000", "category": "Lending", "chains": ["Ethereum", "Polygon"]},
            {"name": "Ghost", "tvl": "n/a", "mcap": null, "chains": null},
        ]);
        let rows = parse_protocol_table(&v).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].mcap, 2_000_000.0);
        assert_eq!(rows[0].primary_chain(), "Ethereum");
        assert_eq!(rows[0].category.as_deref(), Some("Lending"));

        assert_eq!(rows[1].symbol, "");
        assert_eq!(rows[1].tvl, 0.0);
        assert_eq!(rows[1].mcap, 0.0);
        assert!(rows[1].category.is_none());
        assert_eq!(rows[1].primary_chain(), "Unknown");
    }

    #[test]
    fn protocol_without_name_fails_fast() {
        let v = json!([{"symbol": "X", "tvl": 1.0}]);
        match parse_protocol_table(&v) {
            Err(AppError::MissingField { table, field }) => {
                assert_eq!(table, "protocols");
                assert_eq!(field, "name");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn parses_fees_overview() {
        let v = json!({
            "protocols": [
                {"name": "Uniswap", "symbol": "UNI", "total24h": 100, "total7d": 700.5, "total30d": "3000"},
                {"name": "Empty", "total24h": null},
            ]
        });
        let rows = parse_fees_table(&v).unwrap();
        assert_eq!(rows[0].revenue.total7d, 700.5);
        assert_eq!(rows[0].revenue.total30d, 3000.0);
        assert_eq!(rows[1].revenue, RevenueFields::default());
    }

    #[test]
    fn fees_without_protocols_key_is_upstream_error() {
        assert!(matches!(parse_fees_table(&json!({"data": []})), Err(AppError::Upstream(_))));
        assert!(matches!(parse_protocol_table(&json!({})), Err(AppError::Upstream(_))));
    }

    #[test]
    fn coerce_rejects_negative_and_garbage() {
        assert_eq!(coerce_amount(Some(&json!(-5.0))), 0.0);
        assert_eq!(coerce_amount(Some(&json!("abc"))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(" 12.5 "))), 12.5);
        assert_eq!(coerce_amount(Some(&json!([1]))), 0.0);
        assert_eq!(coerce_amount(None), 0.0);
    }
}
