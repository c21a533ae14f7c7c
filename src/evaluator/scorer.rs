use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::listing::{ScoredToken, TokenRecord};

/// Weights and normalizers of the linear score. The weights sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub volume_weight: f64,
    pub holder_weight: f64,
    pub social_weight: f64,
    pub volume_norm: f64,
    pub holder_norm: f64,
    pub social_norm: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            volume_weight: 0.4,
            holder_weight: 0.3,
            social_weight: 0.3,
            volume_norm: 1_000.0,
            holder_norm: 10.0,
            social_norm: 1.0,
        }
    }
}

impl ScoringConfig {
    pub fn weight_sum(&self) -> f64 {
        self.volume_weight + self.holder_weight + self.social_weight
    }
}

pub struct TokenScorer {
    config: ScoringConfig,
    alert_threshold: f64,
}

impl TokenScorer {
    pub fn new(config: ScoringConfig, alert_threshold: f64) -> Self {
        Self {
            config,
            alert_threshold,
        }
    }

    pub fn alert_threshold(&self) -> f64 {
        self.alert_threshold
    }

    /// Unbounded weighted sum; the alert threshold is tuned against this scale.
    pub fn calculate_score(&self, volume_usd_24h: f64, holders: u64, social_mentions: u32) -> f64 {
        let cfg = &self.config;
        cfg.volume_weight * (volume_usd_24h / cfg.volume_norm)
            + cfg.holder_weight * (holders as f64 / cfg.holder_norm)
            + cfg.social_weight * (social_mentions as f64 / cfg.social_norm)
    }

    pub fn score_token(&self, token: &TokenRecord) -> f64 {
        let score = self.calculate_score(token.volume_usd_24h, token.holders, token.social_mentions);
        debug!("{} ({}) scored {:.2}", token.symbol, token.chain, score);
        score
    }

    /// Attaches the score. Callers only hand over records that passed the filter.
    pub fn score(&self, record: TokenRecord) -> ScoredToken {
        let score = self.score_token(&record);
        ScoredToken {
            record,
            score,
            whales: Vec::new(),
        }
    }

    pub fn should_alert(&self, score: f64) -> bool {
        score > self.alert_threshold
    }
}
