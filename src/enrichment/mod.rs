pub mod explorer;
pub mod social;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::listing::{Chain, TokenRecord, WhaleTransaction};

pub use explorer::ExplorerClient;
pub use social::SocialClient;

#[async_trait]
pub trait HolderSource: Send + Sync {
    async fn holder_count(&self, chain: Chain, address: &str) -> Result<u64>;
}

#[async_trait]
pub trait OwnershipSource: Send + Sync {
    async fn is_renounced(&self, chain: Chain, address: &str) -> Result<bool>;
}

#[async_trait]
pub trait SocialSource: Send + Sync {
    async fn mention_count(&self, chain: Chain, symbol: &str) -> Result<u32>;
}

#[async_trait]
pub trait WhaleSource: Send + Sync {
    /// Transfers of `address` worth more than `threshold_usd` at `price_usd`.
    async fn whale_transactions(
        &self,
        chain: Chain,
        address: &str,
        price_usd: f64,
        threshold_usd: f64,
    ) -> Result<Vec<WhaleTransaction>>;
}

/// Runs the enrichment lookups and turns every failure into the safe default.
///
/// Failures are logged and counted; a collaborator without credentials is
/// logged at debug level and not counted.
pub struct Enricher {
    holders: Arc<dyn HolderSource>,
    ownership: Arc<dyn OwnershipSource>,
    social: Arc<dyn SocialSource>,
    whales: Arc<dyn WhaleSource>,
    whale_threshold_usd: f64,
    failures: AtomicUsize,
}

impl Enricher {
    pub fn new(
        holders: Arc<dyn HolderSource>,
        ownership: Arc<dyn OwnershipSource>,
        social: Arc<dyn SocialSource>,
        whales: Arc<dyn WhaleSource>,
        whale_threshold_usd: f64,
    ) -> Self {
        Self {
            holders,
            ownership,
            social,
            whales,
            whale_threshold_usd,
            failures: AtomicUsize::new(0),
        }
    }

    /// Explorer-backed holder, ownership and whale lookups plus the social client.
    pub fn from_clients(explorer: Arc<ExplorerClient>, social: Arc<SocialClient>, whale_threshold_usd: f64) -> Self {
        Self::new(
            explorer.clone(),
            explorer.clone(),
            social,
            explorer,
            whale_threshold_usd,
        )
    }

    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn or_default<T: Default>(&self, lookup: &str, key: &str, result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) if e.is_unconfigured() => {
                debug!("{} lookup skipped for {}: {}", lookup, key, e);
                T::default()
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("{} lookup failed for {}: {}", lookup, key, e);
                T::default()
            }
        }
    }

    pub async fn holder_count(&self, chain: Chain, address: &str) -> u64 {
        let result = self.holders.holder_count(chain, address).await;
        self.or_default("Holder count", address, result)
    }

    pub async fn is_renounced(&self, chain: Chain, address: &str) -> bool {
        let result = self.ownership.is_renounced(chain, address).await;
        self.or_default("Renouncement", address, result)
    }

    pub async fn social_mentions(&self, chain: Chain, symbol: &str) -> u32 {
        let result = self.social.mention_count(chain, symbol).await;
        self.or_default("Social mentions", symbol, result)
    }

    pub async fn whale_transactions(&self, chain: Chain, address: &str, price_usd: f64) -> Vec<WhaleTransaction> {
        let result = self
            .whales
            .whale_transactions(chain, address, price_usd, self.whale_threshold_usd)
            .await;
        self.or_default("Whale transactions", address, result)
    }

    /// Fills the signals the filter and scorer read: holders (when the listing
    /// had none), renouncement (only when requested) and social mentions.
    pub async fn enrich_record(&self, record: &mut TokenRecord, check_renounced: bool) {
        let chain = record.chain;
        let address = record.address.clone();
        let symbol = record.symbol.clone();
        let needs_holders = record.holders == 0;

        let (holders, renounced, mentions) = futures::join!(
            async {
                if needs_holders {
                    Some(self.holder_count(chain, &address).await)
                } else {
                    None
                }
            },
            async {
                if check_renounced {
                    self.is_renounced(chain, &address).await
                } else {
                    false
                }
            },
            self.social_mentions(chain, &symbol),
        );

        if let Some(holders) = holders {
            record.holders = holders;
        }
        record.renounced = renounced;
        record.social_mentions = mentions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;

    struct Failing;

    #[async_trait]
    impl HolderSource for Failing {
        async fn holder_count(&self, _chain: Chain, _address: &str) -> Result<u64> {
            Err(TrackerError::rate_limited("Max rate limit reached"))
        }
    }

    #[async_trait]
    impl OwnershipSource for Failing {
        async fn is_renounced(&self, _chain: Chain, _address: &str) -> Result<bool> {
            Err(TrackerError::malformed("0x"))
        }
    }

    #[async_trait]
    impl SocialSource for Failing {
        async fn mention_count(&self, _chain: Chain, _symbol: &str) -> Result<u32> {
            Err(TrackerError::unconfigured("social bearer token"))
        }
    }

    #[async_trait]
    impl WhaleSource for Failing {
        async fn whale_transactions(&self, _: Chain, _: &str, _: f64, _: f64) -> Result<Vec<WhaleTransaction>> {
            Err(TrackerError::unauthorized("Invalid API Key"))
        }
    }

    struct Fixed;

    #[async_trait]
    impl HolderSource for Fixed {
        async fn holder_count(&self, _chain: Chain, _address: &str) -> Result<u64> {
            Ok(321)
        }
    }

    #[async_trait]
    impl OwnershipSource for Fixed {
        async fn is_renounced(&self, _chain: Chain, _address: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[async_trait]
    impl SocialSource for Fixed {
        async fn mention_count(&self, _chain: Chain, _symbol: &str) -> Result<u32> {
            Ok(17)
        }
    }

    #[async_trait]
    impl WhaleSource for Fixed {
        async fn whale_transactions(&self, _: Chain, address: &str, _: f64, threshold: f64) -> Result<Vec<WhaleTransaction>> {
            Ok(vec![WhaleTransaction {
                from_address: "0xwhale".to_string(),
                to_address: address.to_string(),
                value_usd: threshold + 1.0,
                timestamp: None,
            }])
        }
    }

    fn enricher<S>(source: S) -> Enricher
    where
        S: HolderSource + OwnershipSource + SocialSource + WhaleSource + 'static,
    {
        let source = Arc::new(source);
        Enricher::new(source.clone(), source.clone(), source.clone(), source, 10_000.0)
    }

    fn record(holders: u64) -> TokenRecord {
        TokenRecord {
            chain: Chain::Eth,
            symbol: "PEPE".to_string(),
            address: "0xtoken".to_string(),
            pair_address: "0xpair".to_string(),
            price_usd: 1.0,
            volume_usd_24h: 30_000.0,
            liquidity_usd: 30_000.0,
            holders,
            price_change_24h_pct: 0.0,
            pair_created_at: None,
            links: Vec::new(),
            description: String::new(),
            icon: String::new(),
            renounced: false,
            social_mentions: 0,
        }
    }

    #[tokio::test]
    async fn failures_degrade_to_defaults() {
        let enricher = enricher(Failing);
        let mut token = record(0);
        enricher.enrich_record(&mut token, true).await;

        assert_eq!(token.holders, 0);
        assert!(!token.renounced);
        assert_eq!(token.social_mentions, 0);
        assert!(enricher.whale_transactions(Chain::Eth, "0xtoken", 1.0).await.is_empty());

        // holders, ownership and whales count; the unconfigured social source does not
        assert_eq!(enricher.failure_count(), 3);
    }

    #[tokio::test]
    async fn fills_signals_from_sources() {
        let enricher = enricher(Fixed);
        let mut token = record(0);
        enricher.enrich_record(&mut token, true).await;

        assert_eq!(token.holders, 321);
        assert!(token.renounced);
        assert_eq!(token.social_mentions, 17);

        let whales = enricher.whale_transactions(Chain::Eth, "0xtoken", 1.0).await;
        assert_eq!(whales.len(), 1);
        assert_eq!(whales[0].value_usd, 10_001.0);
        assert_eq!(enricher.failure_count(), 0);
    }

    #[tokio::test]
    async fn keeps_listing_holders_and_skips_unrequested_checks() {
        let enricher = enricher(Fixed);
        let mut token = record(999);
        enricher.enrich_record(&mut token, false).await;

        assert_eq!(token.holders, 999);
        assert!(!token.renounced);
        assert_eq!(token.social_mentions, 17);
    }
}
