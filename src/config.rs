use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::evaluator::{FilterConfig, ScoringConfig};
use crate::listing::Chain;

/// Credential loaded from the environment. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExplorerKeys {
    pub etherscan: Option<Secret>,
    pub bscscan: Option<Secret>,
    pub arbiscan: Option<Secret>,
    pub basescan: Option<Secret>,
    pub solscan: Option<Secret>,
}

impl ExplorerKeys {
    pub fn for_chain(&self, chain: Chain) -> Option<&Secret> {
        match chain {
            Chain::Eth => self.etherscan.as_ref(),
            Chain::Bsc => self.bscscan.as_ref(),
            Chain::Arbi => self.arbiscan.as_ref(),
            Chain::Base => self.basescan.as_ref(),
            Chain::Sol => self.solscan.as_ref(),
            Chain::Unknown => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listing_api_url: String,
    pub social_api_url: String,
    pub chains: Vec<Chain>,
    pub filter: FilterConfig,
    pub scoring: ScoringConfig,
    pub alert_score_threshold: f64,
    pub whale_threshold_usd: f64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub snapshot_dir: PathBuf,

    // Secrets, never defaulted
    pub telegram_bot_token: Option<Secret>,
    pub telegram_chat_id: Option<String>,
    pub explorer_keys: ExplorerKeys,
    pub social_bearer_token: Option<Secret>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_api_url: "https://api.dexscreener.com".to_string(),
            social_api_url: "https://api.twitter.com".to_string(),
            chains: Chain::TRACKED.to_vec(),
            filter: FilterConfig::default(),
            scoring: ScoringConfig::default(),
            alert_score_threshold: 75.0,
            whale_threshold_usd: 10_000.0,
            poll_interval_secs: 60,
            request_timeout_secs: 10,
            snapshot_dir: PathBuf::from("./logs"),
            telegram_bot_token: None,
            telegram_chat_id: None,
            explorer_keys: ExplorerKeys::default(),
            social_bearer_token: None,
        }
    }
}

fn lookup_nonempty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup_nonempty(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        None => Ok(None),
    }
}

impl Config {
    /// Builds the configuration from defaults overridden by `lookup(VAR)`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(url) = lookup_nonempty(&lookup, "DEXSCREENER_API_URL") {
            config.listing_api_url = url;
        }
        if let Some(url) = lookup_nonempty(&lookup, "SOCIAL_API_URL") {
            config.social_api_url = url;
        }
        if let Some(chains) = lookup_nonempty(&lookup, "CHAINS") {
            config.chains = chains
                .split(',')
                .filter(|tag| !tag.trim().is_empty())
                .map(Chain::from_str)
                .collect::<std::result::Result<Vec<Chain>, _>>()
                .context("CHAINS must be a comma separated list of sol, eth, bsc, arbi, base")?;
        }

        let filter = &mut config.filter;
        if let Some(v) = parse_var(&lookup, "VOLUME_MIN")? {
            filter.volume_min = v;
        }
        if let Some(v) = parse_var(&lookup, "LIQUIDITY_MIN")? {
            filter.liquidity_min = v;
        }
        if let Some(v) = parse_var(&lookup, "HOLDER_MIN")? {
            filter.holder_min = v;
        }
        filter.price_change_min = parse_var(&lookup, "PRICE_CHANGE_MIN")?;
        filter.social_mentions_min = parse_var(&lookup, "SOCIAL_MENTIONS_MIN")?;
        filter.max_age_seconds = parse_var(&lookup, "MAX_AGE_SECONDS")?;
        if let Some(v) = parse_var(&lookup, "REQUIRE_RENOUNCED")? {
            filter.require_renounced = v;
        }

        let scoring = &mut config.scoring;
        for (key, field) in [
            ("SCORE_VOLUME_WEIGHT", &mut scoring.volume_weight),
            ("SCORE_HOLDER_WEIGHT", &mut scoring.holder_weight),
            ("SCORE_SOCIAL_WEIGHT", &mut scoring.social_weight),
            ("SCORE_VOLUME_NORM", &mut scoring.volume_norm),
            ("SCORE_HOLDER_NORM", &mut scoring.holder_norm),
            ("SCORE_SOCIAL_NORM", &mut scoring.social_norm),
        ] {
            if let Some(v) = parse_var(&lookup, key)? {
                *field = v;
            }
        }

        if let Some(v) = parse_var(&lookup, "ALERT_SCORE_THRESHOLD")? {
            config.alert_score_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "WHALE_THRESHOLD_USD")? {
            config.whale_threshold_usd = v;
        }
        if let Some(v) = parse_var(&lookup, "POLL_INTERVAL_SECONDS")? {
            config.poll_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECONDS")? {
            config.request_timeout_secs = v;
        }
        if let Some(dir) = lookup_nonempty(&lookup, "SNAPSHOT_DIR") {
            config.snapshot_dir = PathBuf::from(dir);
        }

        let secret = |key: &str| lookup_nonempty(&lookup, key).map(Secret::new);
        config.telegram_bot_token = secret("TELEGRAM_BOT_TOKEN");
        config.telegram_chat_id = lookup_nonempty(&lookup, "TELEGRAM_CHAT_ID");
        config.social_bearer_token = secret("SOCIAL_BEARER_TOKEN");
        config.explorer_keys = ExplorerKeys {
            etherscan: secret("ETHERSCAN_API_KEY"),
            bscscan: secret("BSCSCAN_API_KEY"),
            arbiscan: secret("ARBISCAN_API_KEY"),
            basescan: secret("BASESCAN_API_KEY"),
            solscan: secret("SOLSCAN_API_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("POLL_INTERVAL_SECONDS must be positive");
        }
        if self.request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECONDS must be positive");
        }
        if (self.scoring.weight_sum() - 1.0).abs() > 1e-6 {
            bail!(
                "score weights must sum to 1, got {:.4}",
                self.scoring.weight_sum()
            );
        }
        let s = &self.scoring;
        if s.volume_norm <= 0.0 || s.holder_norm <= 0.0 || s.social_norm <= 0.0 {
            bail!("score normalizers must be positive");
        }
        if self.chains.is_empty() {
            bail!("at least one chain must be tracked");
        }
        if self.chains.contains(&Chain::Unknown) {
            bail!("CHAINS cannot contain 'unknown': listings without a known chain are never tracked");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Shared client; every collaborator request gets the same timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(concat!("alpha-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client failed")
    }

    /// Which external collaborators have credentials.
    pub fn collaborator_status(&self) -> Vec<(&'static str, bool)> {
        vec![
            (
                "telegram",
                self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some(),
            ),
            ("etherscan", self.explorer_keys.etherscan.is_some()),
            ("bscscan", self.explorer_keys.bscscan.is_some()),
            ("arbiscan", self.explorer_keys.arbiscan.is_some()),
            ("basescan", self.explorer_keys.basescan.is_some()),
            ("solscan", self.explorer_keys.solscan.is_some()),
            ("social", self.social_bearer_token.is_some()),
        ]
    }
}

pub fn load_config() -> Result<Config> {
    info!("Loading configuration from environment...");
    Config::from_lookup(|key| env::var(key).ok())
}
