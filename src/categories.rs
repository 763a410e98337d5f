/// Short descriptions of the DefiLlama category taxonomy, shown next to
/// category filter options.
pub const CATEGORY_DESCRIPTIONS: &[(&str, &str)] = &[
    ("Dexs", "Decentralized exchanges for peer-to-peer trading without intermediaries (e.g. Uniswap, Curve)"),
    ("Lending", "Protocols to lend and borrow crypto assets (e.g. Aave, Compound)"),
    ("Liquid Staking", "Staking that stays liquid through derivative tokens (e.g. Lido, Rocket Pool)"),
    ("CDP", "Collateralized debt positions: borrow stablecoins against crypto collateral (e.g. MakerDAO)"),
    ("Yield", "Yield aggregators optimizing farming strategies across DeFi (e.g. Yearn Finance)"),
    ("DEX Aggregator", "Routers that find the best price across multiple decentralized exchanges"),
    ("Derivatives", "Trading venues for crypto futures, options and perpetual contracts"),
    ("Bridge", "Infrastructure for moving assets between blockchains"),
    ("Launchpad", "Platforms for launching new projects and token sales"),
    ("Indexes", "Index protocols tracking baskets of crypto assets"),
    ("Synthetics", "Tokenized synthetic versions of other assets"),
    ("Options", "Crypto options trading protocols"),
    ("Prediction Market", "Markets for betting on future events"),
    ("Insurance", "Coverage against smart contract risk"),
    ("Privacy", "Protocols for private or anonymous transactions"),
    ("Leveraged Farming", "Yield farming with built-in leverage"),
    ("RWA", "Tokenized real-world assets such as real estate and bonds"),
    ("Restaking", "Reuse of staked assets for additional security and yield"),
];

pub fn describe(category: &str) -> Option<&'static str> {
    CATEGORY_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, desc)| *desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_categories() {
        assert!(describe("Dexs").is_some());
        assert!(describe("Dexes").is_none());
        assert!(describe("Lending").unwrap().contains("borrow"));
    }
}
