use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::listing::TokenRecord;

/// Thresholds applied to every fetched record. The optional checks are
/// disabled while unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub volume_min: f64,
    pub liquidity_min: f64,
    pub holder_min: u64,
    pub price_change_min: Option<f64>,
    pub require_renounced: bool,
    pub social_mentions_min: Option<u32>,
    pub max_age_seconds: Option<u64>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            volume_min: 20_000.0,
            liquidity_min: 20_000.0,
            holder_min: 200,
            price_change_min: None,
            require_renounced: false,
            social_mentions_min: None,
            max_age_seconds: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenFilter {
    config: FilterConfig,
}

impl TokenFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Whether the renouncement lookup has to run before [`Self::passes`].
    pub fn requires_renounced(&self) -> bool {
        self.config.require_renounced
    }

    /// Checks that only use listing data: volume, liquidity, price change and age.
    pub fn passes_market(&self, token: &TokenRecord, now: DateTime<Utc>) -> bool {
        let cfg = &self.config;

        if token.volume_usd_24h <= cfg.volume_min {
            return false;
        }
        if token.liquidity_usd < cfg.liquidity_min {
            return false;
        }
        if let Some(min_change) = cfg.price_change_min {
            if token.price_change_24h_pct <= min_change {
                return false;
            }
        }
        if let Some(max_age) = cfg.max_age_seconds {
            let max_age = i64::try_from(max_age).unwrap_or(i64::MAX);
            match token.age_seconds(now) {
                Some(age) if age <= max_age => {}
                _ => return false,
            }
        }
        true
    }

    /// Full predicate, including the enrichment-backed checks.
    pub fn passes(&self, token: &TokenRecord, now: DateTime<Utc>) -> bool {
        let cfg = &self.config;

        let passed = self.passes_market(token, now)
            && token.holders >= cfg.holder_min
            && (!cfg.require_renounced || token.renounced)
            && cfg
                .social_mentions_min
                .map_or(true, |min| token.social_mentions >= min);

        if !passed {
            debug!("{} ({}) filtered out", token.symbol, token.chain);
        }
        passed
    }
}
