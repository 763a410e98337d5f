use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{fetch_fees, fetch_protocols};
use crate::synthetic::{sample_protocols, sample_revenue};
use crate::types::{DataSource, ProtocolRow, RevenueRow};

pub const SYNTHETIC_NOTICE: &str = "live data unavailable, using randomly generated sample data";

/// Both raw input tables for one pipeline run, with their provenance.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub protocols: Arc<Vec<ProtocolRow>>,
    pub revenue: Arc<Vec<RevenueRow>>,
    pub source: DataSource,
    /// User-facing messages about substituted data.
    pub notices: Vec<String>,
}

/// Loads the protocol and fees tables from DefiLlama. Never fails: a table
/// that cannot be fetched is replaced with synthetic data of the same shape.
pub struct DataProvider {
    client: reqwest::Client,
    protocols_url: String,
    fees_url: String,
    protocol_cache: TtlCache<String, Arc<Vec<ProtocolRow>>>,
    fee_cache: TtlCache<String, Arc<Vec<RevenueRow>>>,
}

impl DataProvider {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        let ttl = Duration::from_secs(cfg.cache_ttl_secs);
        Ok(Self {
            client,
            protocols_url: cfg.protocols_url.clone(),
            fees_url: cfg.fees_url.clone(),
            protocol_cache: TtlCache::new(ttl),
            fee_cache: TtlCache::new(ttl),
        })
    }

    /// Drop cached tables so the next load goes to the network.
    pub fn invalidate_cache(&self) {
        self.protocol_cache.clear();
        self.fee_cache.clear();
    }

    pub async fn load(&self) -> DatasetSnapshot {
        let (protocols, revenue) = tokio::join!(self.load_protocols(), self.load_fees());

        let mut notices = Vec::new();
        let protocols_live = protocols.is_some();
        let revenue_live = revenue.is_some();

        let protocols = protocols.unwrap_or_else(|| {
            notices.push(format!("protocol table: {SYNTHETIC_NOTICE}"));
            Arc::new(sample_protocols(&mut rand::thread_rng()))
        });
        let revenue = revenue.unwrap_or_else(|| {
            notices.push(format!("fees table: {SYNTHETIC_NOTICE}"));
            Arc::new(sample_revenue(&mut rand::thread_rng()))
        });

        DatasetSnapshot {
            protocols,
            revenue,
            source: DataSource::from_flags(protocols_live, revenue_live),
            notices,
        }
    }

    async fn load_protocols(&self) -> Option<Arc<Vec<ProtocolRow>>> {
        if let Some(rows) = self.protocol_cache.get_fresh(&self.protocols_url) {
            return Some(rows);
        }
        match fetch_protocols(&self.client, &self.protocols_url).await {
            Ok(rows) => {
                info!(rows = rows.len(), url = %self.protocols_url, "Protocol table loaded");
                let rows = Arc::new(rows);
                self.protocol_cache.insert(self.protocols_url.clone(), Arc::clone(&rows));
                Some(rows)
            }
            Err(e) => {
                warn!(url = %self.protocols_url, "Failed to fetch protocol data: {e}; substituting synthetic data");
                None
            }
        }
    }

    async fn load_fees(&self) -> Option<Arc<Vec<RevenueRow>>> {
        if let Some(rows) = self.fee_cache.get_fresh(&self.fees_url) {
            return Some(rows);
        }
        match fetch_fees(&self.client, &self.fees_url).await {
            Ok(rows) => {
                info!(rows = rows.len(), url = %self.fees_url, "Fees table loaded");
                let rows = Arc::new(rows);
                self.fee_cache.insert(self.fees_url.clone(), Arc::clone(&rows));
                Some(rows)
            }
            Err(e) => {
                warn!(url = %self.fees_url, "Failed to fetch fees data: {e}; substituting synthetic data");
                None
            }
        }
    }
}
