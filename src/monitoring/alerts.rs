use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::listing::{ScoredToken, WhaleTransaction};
use super::telegram::ChatSender;

/// Pair identifiers already alerted during this process lifetime.
#[derive(Debug, Clone, Default)]
pub struct AlertedSet {
    seen: HashSet<String>,
}

impl AlertedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pair_id: &str) -> bool {
        self.seen.contains(pair_id)
    }

    /// Returns false when the identifier was already present.
    pub fn insert(&mut self, pair_id: impl Into<String>) -> bool {
        self.seen.insert(pair_id.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

pub fn format_token_alert(token: &ScoredToken) -> String {
    let r = &token.record;
    format!(
        "🚀 New token alert\n\n\
        Symbol: {}\n\
        Chain: {}\n\
        Score: {:.2}\n\
        Price: ${}\n\
        Volume 24h: ${:.0}\n\
        Liquidity: ${:.0}\n\
        Holders: {}\n\
        Change 24h: {:.1}%\n\
        Address: {}",
        r.symbol,
        r.chain,
        token.score,
        r.price_usd,
        r.volume_usd_24h,
        r.liquidity_usd,
        r.holders,
        r.price_change_24h_pct,
        r.address
    )
}

pub fn format_whale_alert(token: &ScoredToken, whale: &WhaleTransaction) -> String {
    format!(
        "🐋 Whale alert for {} ({})\n\
        From: {} | To: {} | Value: ${:.2}",
        token.record.symbol,
        token.record.chain,
        whale.from_address,
        whale.to_address,
        whale.value_usd
    )
}

/// Sends fire-and-forget chat alerts. Send failures are logged, never retried.
pub struct AlertDispatcher {
    sender: Arc<dyn ChatSender>,
    score_threshold: f64,
}

impl AlertDispatcher {
    pub fn new(sender: Arc<dyn ChatSender>, score_threshold: f64) -> Self {
        Self {
            sender,
            score_threshold,
        }
    }

    async fn send(&self, text: &str) -> bool {
        match self.sender.send_message(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send alert: {}", e);
                false
            }
        }
    }

    /// Alerts tokens above the score threshold that were not alerted before.
    /// A pair is recorded once its send was attempted, whatever the outcome.
    /// Returns the number of attempts.
    pub async fn dispatch_token_alerts(&self, alerted: &mut AlertedSet, tokens: &[ScoredToken]) -> usize {
        let mut attempts = 0;
        for token in tokens {
            if token.score <= self.score_threshold {
                continue;
            }
            let pair_id = token.record.pair_id();
            if alerted.contains(&pair_id) {
                continue;
            }

            info!("Alerting {} ({}) with score {:.2}", token.record.symbol, token.record.chain, token.score);
            self.send(&format_token_alert(token)).await;
            alerted.insert(pair_id);
            attempts += 1;
        }
        attempts
    }

    /// Whale transfers are sent every cycle; they are not deduplicated.
    pub async fn dispatch_whale_alerts(&self, tokens: &[ScoredToken]) -> usize {
        let mut attempts = 0;
        for token in tokens {
            for whale in &token.whales {
                self.send(&format_whale_alert(token, whale)).await;
                attempts += 1;
            }
        }
        attempts
    }
}
