use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alpha_tracker::enrichment::{Enricher, HolderSource, OwnershipSource, SocialSource, WhaleSource};
use alpha_tracker::evaluator::{FilterConfig, ScoringConfig, TokenFilter, TokenScorer};
use alpha_tracker::listing::{Chain, ListingSource, TokenRecord, WhaleTransaction};
use alpha_tracker::monitoring::{AlertDispatcher, ChatSender};
use alpha_tracker::pipeline::Tracker;
use alpha_tracker::{Result, TrackerError};

/// Address whose holder lookup always fails.
pub const BROKEN_ADDRESS: &str = "0xbroken";
/// Address that reports one whale transfer.
pub const WHALE_ADDRESS: &str = "0xwhale";

pub fn record(symbol: &str, address: &str, volume: f64) -> TokenRecord {
    TokenRecord {
        chain: Chain::Eth,
        symbol: symbol.to_string(),
        address: address.to_string(),
        pair_address: format!("{}-pair", address),
        price_usd: 0.01,
        volume_usd_24h: volume,
        liquidity_usd: 50_000.0,
        holders: 0,
        price_change_24h_pct: 12.0,
        pair_created_at: None,
        links: Vec::new(),
        description: String::new(),
        icon: String::new(),
        renounced: false,
        social_mentions: 0,
    }
}

/// Serves the same records every call and counts the calls.
pub struct StaticListing {
    records: Vec<TokenRecord>,
    calls: AtomicUsize,
}

impl StaticListing {
    pub fn new(records: Vec<TokenRecord>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for StaticListing {
    async fn fetch_tokens(&self, chains: &[Chain]) -> Vec<TokenRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .iter()
            .filter(|r| chains.contains(&r.chain))
            .cloned()
            .collect()
    }
}

pub struct FakeExplorer;

#[async_trait]
impl HolderSource for FakeExplorer {
    async fn holder_count(&self, _chain: Chain, address: &str) -> Result<u64> {
        if address == BROKEN_ADDRESS {
            Err(TrackerError::Api {
                status: 500,
                message: "upstream error".to_string(),
            })
        } else {
            Ok(500)
        }
    }
}

#[async_trait]
impl OwnershipSource for FakeExplorer {
    async fn is_renounced(&self, _chain: Chain, _address: &str) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl SocialSource for FakeExplorer {
    async fn mention_count(&self, _chain: Chain, _symbol: &str) -> Result<u32> {
        Err(TrackerError::unconfigured("social bearer token"))
    }
}

#[async_trait]
impl WhaleSource for FakeExplorer {
    async fn whale_transactions(
        &self,
        _chain: Chain,
        address: &str,
        _price_usd: f64,
        threshold_usd: f64,
    ) -> Result<Vec<WhaleTransaction>> {
        if address != WHALE_ADDRESS {
            return Ok(Vec::new());
        }
        Ok(vec![WhaleTransaction {
            from_address: "0xfrom".to_string(),
            to_address: "0xto".to_string(),
            value_usd: threshold_usd * 2.0,
            timestamp: None,
        }])
    }
}

/// Social source that answers only after the request timeout.
pub struct SlowSocial {
    pub delay: Duration,
}

#[async_trait]
impl SocialSource for SlowSocial {
    async fn mention_count(&self, _chain: Chain, _symbol: &str) -> Result<u32> {
        tokio::time::sleep(self.delay).await;
        Err(TrackerError::Api {
            status: 504,
            message: "gateway timeout".to_string(),
        })
    }
}

/// Keeps every message it was asked to send.
#[derive(Default)]
pub struct RecordingSender {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn tracker(listing: Arc<StaticListing>, sender: Arc<RecordingSender>, threshold: f64) -> Tracker {
    tracker_with_social(listing, sender, threshold, Arc::new(FakeExplorer))
}

pub fn tracker_with_social(
    listing: Arc<StaticListing>,
    sender: Arc<RecordingSender>,
    threshold: f64,
    social: Arc<dyn SocialSource>,
) -> Tracker {
    let explorer = Arc::new(FakeExplorer);
    Tracker::new(
        listing,
        Enricher::new(explorer.clone(), explorer.clone(), social, explorer, 10_000.0),
        TokenFilter::new(FilterConfig::default()),
        TokenScorer::new(ScoringConfig::default(), threshold),
        AlertDispatcher::new(sender, threshold),
        Chain::TRACKED.to_vec(),
    )
}
