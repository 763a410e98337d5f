use std::collections::HashMap;

use crate::types::{ProtocolRecord, ProtocolRow, RevenueFields, RevenueRow};

/// Lower-cased, whitespace-trimmed join key.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Revenue table indexed by normalized name and by normalized symbol.
/// On duplicate keys the first row in source order wins.
#[derive(Debug, Default)]
pub struct RevenueIndex {
    by_name: HashMap<String, RevenueFields>,
    by_symbol: HashMap<String, RevenueFields>,
}

impl RevenueIndex {
    pub fn build(revenue: &[RevenueRow]) -> Self {
        let mut index = Self::default();
        for row in revenue {
            let name = normalize_key(&row.name);
            if !name.is_empty() {
                index.by_name.entry(name).or_insert(row.revenue);
            }
            let symbol = normalize_key(&row.symbol);
            if !symbol.is_empty() {
                index.by_symbol.entry(symbol).or_insert(row.revenue);
            }
        }
        index
    }
}

/// Join strategy, tried in `MATCH_ORDER`; the first hit wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Name,
    Symbol,
}

pub const MATCH_ORDER: [MatchTier; 2] = [MatchTier::Name, MatchTier::Symbol];

impl MatchTier {
    pub fn lookup(self, row: &ProtocolRow, index: &RevenueIndex) -> Option<RevenueFields> {
        let (key, table) = match self {
            MatchTier::Name => (normalize_key(&row.name), &index.by_name),
            MatchTier::Symbol => (normalize_key(&row.symbol), &index.by_symbol),
        };
        if key.is_empty() {
            return None;
        }
        table.get(&key).copied()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub matched_by_name: usize,
    pub matched_by_symbol: usize,
    pub unmatched: usize,
}

/// Left-join the protocol table onto the revenue table.
///
/// Output has exactly one record per input protocol, in input order.
/// Protocols with no name or symbol match get zero revenue.
///
/// A name or symbol that normalizes to the empty string never matches, not
/// even another empty key: blank upstream symbols would otherwise pair
/// unrelated protocols.
pub fn reconcile(protocols: &[ProtocolRow], revenue: &[RevenueRow]) -> (Vec<ProtocolRecord>, ReconcileStats) {
    let index = RevenueIndex::build(revenue);
    let mut stats = ReconcileStats::default();

    let records = protocols
        .iter()
        .map(|row| {
            let hit = MATCH_ORDER
                .iter()
                .find_map(|tier| tier.lookup(row, &index).map(|fields| (*tier, fields)));

            let revenue = match hit {
                Some((MatchTier::Name, fields)) => {
                    stats.matched_by_name += 1;
                    fields
                }
                Some((MatchTier::Symbol, fields)) => {
                    stats.matched_by_symbol += 1;
                    fields
                }
                None => {
                    stats.unmatched += 1;
                    RevenueFields::default()
                }
            };

            ProtocolRecord {
                name: row.name.clone(),
                symbol: row.symbol.clone(),
                tvl: row.tvl,
                mcap: row.mcap,
                category: row.category.clone(),
                chains: row.chains.clone(),
                primary_chain: row.primary_chain(),
                revenue,
            }
        })
        .collect();

    (records, stats)
}
