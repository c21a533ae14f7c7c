use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Chain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub chain: Chain,
    pub symbol: String,
    pub address: String,
    pub pair_address: String,
    pub price_usd: f64,
    pub volume_usd_24h: f64,
    pub liquidity_usd: f64,
    /// 0 until the holder lookup fills it; the listing API does not report holders.
    pub holders: u64,
    pub price_change_24h_pct: f64,
    pub pair_created_at: Option<DateTime<Utc>>,
    pub links: Vec<String>,
    pub description: String,
    pub icon: String,

    // Appended by enrichment before filtering
    pub renounced: bool,
    pub social_mentions: u32,
}

impl TokenRecord {
    /// Identifier used for alert deduplication.
    pub fn pair_id(&self) -> String {
        format!("{}:{}", self.chain, self.pair_address)
    }

    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.pair_created_at
            .map(|created| (now - created).num_seconds())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleTransaction {
    pub from_address: String,
    pub to_address: String,
    pub value_usd: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A record that passed the filter, with its score and whale transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredToken {
    pub record: TokenRecord,
    pub score: f64,
    pub whales: Vec<WhaleTransaction>,
}
