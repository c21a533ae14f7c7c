use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{json_body, Result, TrackerError};
use super::chain::resolve_chain;
use super::{Chain, TokenRecord};

/// Maximum number of token addresses accepted by one pairs request.
const PAIRS_BATCH_SIZE: usize = 30;

/// Produces the token records of one polling cycle.
///
/// Implementations are best-effort: failures are logged and the affected
/// chain or item is left out, they never abort the cycle.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_tokens(&self, chains: &[Chain]) -> Vec<TokenRecord>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileLink {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProfile {
    pub chain_id: Option<String>,
    pub token_address: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub links: Option<Vec<ProfileLink>>,
}

impl TokenProfile {
    pub fn link_urls(&self) -> Vec<String> {
        self.links
            .iter()
            .flatten()
            .filter_map(|link| link.url.clone())
            .collect()
    }

    pub fn chain(&self) -> Chain {
        resolve_chain(self.chain_id.as_deref(), &self.link_urls())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Window {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    pub chain_id: Option<String>,
    pub pair_address: Option<String>,
    pub base_token: Option<BaseToken>,
    pub price_usd: Option<String>,
    pub volume: Option<Window>,
    pub liquidity: Option<Liquidity>,
    pub price_change: Option<Window>,
    pub pair_created_at: Option<i64>,
}

impl DexPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }
}

/// Builds a [`TokenRecord`] from a pair and, when known, the profile that
/// announced it. Missing market figures reject the pair.
pub fn normalize_pair(pair: &DexPair, chain: Chain, profile: Option<&TokenProfile>) -> Result<TokenRecord> {
    let base = pair
        .base_token
        .as_ref()
        .ok_or_else(|| TrackerError::malformed("pair without baseToken"))?;

    let price_usd = pair
        .price_usd
        .as_deref()
        .ok_or_else(|| TrackerError::malformed(format!("{}: missing priceUsd", base.address)))?
        .parse::<f64>()
        .map_err(|e| TrackerError::malformed(format!("{}: bad priceUsd: {}", base.address, e)))?;

    let volume_usd_24h = pair
        .volume
        .as_ref()
        .and_then(|v| v.h24)
        .ok_or_else(|| TrackerError::malformed(format!("{}: missing volume.h24", base.address)))?;

    let liquidity_usd = pair
        .liquidity
        .as_ref()
        .and_then(|l| l.usd)
        .ok_or_else(|| TrackerError::malformed(format!("{}: missing liquidity.usd", base.address)))?;

    let price_change_24h_pct = pair
        .price_change
        .as_ref()
        .and_then(|p| p.h24)
        .ok_or_else(|| TrackerError::malformed(format!("{}: missing priceChange.h24", base.address)))?;

    let pair_created_at = pair
        .pair_created_at
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());

    let (links, description, icon) = match profile {
        Some(p) => (
            p.link_urls(),
            p.description.clone().unwrap_or_default(),
            p.icon.clone().unwrap_or_default(),
        ),
        None => (Vec::new(), String::new(), String::new()),
    };

    Ok(TokenRecord {
        chain,
        symbol: base.symbol.clone().unwrap_or_else(|| "N/A".to_string()),
        address: base.address.clone(),
        pair_address: pair.pair_address.clone().unwrap_or_else(|| base.address.clone()),
        price_usd,
        volume_usd_24h,
        liquidity_usd,
        holders: 0,
        price_change_24h_pct,
        pair_created_at,
        links,
        description,
        icon,
        renounced: false,
        social_mentions: 0,
    })
}

/// Keeps the deepest-liquidity pair for every base token address.
pub fn best_pairs(pairs: Vec<DexPair>) -> HashMap<String, DexPair> {
    let mut best: HashMap<String, DexPair> = HashMap::new();
    for pair in pairs {
        let key = match &pair.base_token {
            Some(base) => base.address.to_ascii_lowercase(),
            None => continue,
        };
        match best.get(&key) {
            Some(current) if current.liquidity_usd() >= pair.liquidity_usd() => {}
            _ => {
                best.insert(key, pair);
            }
        }
    }
    best
}

/// Deserializes each element on its own so a single malformed entry is
/// dropped instead of failing the whole payload.
fn parse_lenient<T: serde::de::DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Skipping malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_profiles(&self) -> Result<Vec<TokenProfile>> {
        let url = format!("{}/token-profiles/latest/v1", self.base_url);
        let items: Vec<serde_json::Value> = json_body(self.client.get(&url).send().await?).await?;
        Ok(parse_lenient(items, "token profile"))
    }

    pub async fn fetch_pairs(&self, chain: Chain, addresses: &[String]) -> Result<Vec<DexPair>> {
        let chain_id = chain
            .listing_id()
            .ok_or_else(|| TrackerError::config_error(format!("no listing id for chain {}", chain)))?;

        let url = format!("{}/tokens/v1/{}/{}", self.base_url, chain_id, addresses.join(","));
        let items: Vec<serde_json::Value> = json_body(self.client.get(&url).send().await?).await?;
        Ok(parse_lenient(items, "pair"))
    }

    async fn fetch_chain(&self, chain: Chain, profiles: &[TokenProfile]) -> Result<Vec<TokenRecord>> {
        let addresses: Vec<String> = profiles
            .iter()
            .filter_map(|p| p.token_address.clone())
            .collect();

        // A failed batch only loses its own addresses; the chain fails when every batch did.
        let mut pairs = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0;
        for batch in addresses.chunks(PAIRS_BATCH_SIZE) {
            match self.fetch_pairs(chain, batch).await {
                Ok(batch_pairs) => {
                    succeeded += 1;
                    pairs.extend(batch_pairs);
                }
                Err(e) => {
                    warn!("Pairs batch of {} addresses failed on {}: {}", batch.len(), chain, e);
                    last_error = Some(e);
                }
            }
        }
        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        let best = best_pairs(pairs);

        let mut records = Vec::new();
        for profile in profiles {
            let Some(address) = &profile.token_address else { continue };
            let Some(pair) = best.get(&address.to_ascii_lowercase()) else {
                debug!("No pair data for {} on {}", address, chain);
                continue;
            };
            match normalize_pair(pair, chain, Some(profile)) {
                Ok(record) => records.push(record),
                Err(e) => debug!("Skipping {} on {}: {}", address, chain, e),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl ListingSource for DexScreenerClient {
    async fn fetch_tokens(&self, chains: &[Chain]) -> Vec<TokenRecord> {
        let profiles = match self.fetch_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to fetch token profiles: {}", e);
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut by_chain: BTreeMap<Chain, Vec<TokenProfile>> = BTreeMap::new();
        for profile in profiles {
            let chain = profile.chain();
            if chain == Chain::Unknown || !chains.contains(&chain) {
                continue;
            }
            let Some(address) = &profile.token_address else { continue };
            if seen.insert((chain, address.to_ascii_lowercase())) {
                by_chain.entry(chain).or_default().push(profile);
            }
        }

        let results = join_all(by_chain.iter().map(|(chain, profiles)| async move {
            (*chain, self.fetch_chain(*chain, profiles).await)
        }))
        .await;

        let mut records = Vec::new();
        for (chain, result) in results {
            match result {
                Ok(chain_records) => {
                    debug!("Fetched {} tokens on {}", chain_records.len(), chain);
                    records.extend(chain_records);
                }
                Err(e) => warn!("Listing fetch failed for {}: {}", chain, e),
            }
        }

        info!("Fetched {} token records", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair_json(address: &str, liquidity: f64) -> serde_json::Value {
        json!({
            "chainId": "ethereum",
            "pairAddress": format!("{}-pair", address),
            "baseToken": { "address": address, "symbol": "PEPE" },
            "priceUsd": "0.0042",
            "volume": { "h24": 25000.0 },
            "liquidity": { "usd": liquidity },
            "priceChange": { "h24": 12.5 },
            "pairCreatedAt": 1_700_000_000_000i64
        })
    }

    #[test]
    fn normalizes_complete_pair() {
        let pair: DexPair = serde_json::from_value(pair_json("0xabc", 30000.0)).unwrap();
        let profile: TokenProfile = serde_json::from_value(json!({
            "chainId": "ethereum",
            "tokenAddress": "0xabc",
            "description": "frog",
            "links": [{ "type": "explorer", "url": "https://etherscan.io/token/0xabc" }, { "label": "site" }]
        }))
        .unwrap();

        let record = normalize_pair(&pair, Chain::Eth, Some(&profile)).unwrap();
        assert_eq!(record.symbol, "PEPE");
        assert_eq!(record.pair_address, "0xabc-pair");
        assert!((record.price_usd - 0.0042).abs() < 1e-12);
        assert_eq!(record.volume_usd_24h, 25000.0);
        assert_eq!(record.liquidity_usd, 30000.0);
        assert_eq!(record.price_change_24h_pct, 12.5);
        assert_eq!(record.pair_created_at.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.links, vec!["https://etherscan.io/token/0xabc".to_string()]);
        assert_eq!(record.description, "frog");
        assert_eq!(record.holders, 0);
    }

    #[test]
    fn missing_numeric_field_rejects_pair() {
        let mut value = pair_json("0xabc", 30000.0);
        value["liquidity"] = json!({});
        let pair: DexPair = serde_json::from_value(value).unwrap();
        assert!(matches!(
            normalize_pair(&pair, Chain::Eth, None),
            Err(TrackerError::MalformedResponse(_))
        ));

        let mut value = pair_json("0xabc", 30000.0);
        value["priceUsd"] = json!("not-a-number");
        let pair: DexPair = serde_json::from_value(value).unwrap();
        assert!(normalize_pair(&pair, Chain::Eth, None).is_err());
    }

    #[test]
    fn keeps_deepest_pair_per_token() {
        let pairs: Vec<DexPair> = vec![
            serde_json::from_value(pair_json("0xABC", 1000.0)).unwrap(),
            serde_json::from_value(pair_json("0xabc", 9000.0)).unwrap(),
            serde_json::from_value(pair_json("0xdef", 500.0)).unwrap(),
        ];
        let best = best_pairs(pairs);
        assert_eq!(best.len(), 2);
        assert_eq!(best["0xabc"].liquidity_usd(), 9000.0);
    }

    #[test]
    fn lenient_parse_drops_bad_items() {
        let items = vec![pair_json("0xabc", 1.0), json!({ "baseToken": 42 }), json!("junk")];
        let pairs: Vec<DexPair> = parse_lenient(items, "pair");
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn profile_chain_falls_back_to_links() {
        let profile: TokenProfile = serde_json::from_value(json!({
            "tokenAddress": "abc",
            "links": [{ "url": "https://solscan.io/token/abc" }]
        }))
        .unwrap();
        assert_eq!(profile.chain(), Chain::Sol);
    }

    type Route = fn(&str) -> (&'static str, String);

    /// Minimal HTTP/1.1 responder on an ephemeral port; returns its base URL.
    async fn spawn_listing_stub(route: Route) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request);
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = route(&path);
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    fn sol_mints() -> Vec<String> {
        let mut mints: Vec<String> = (0..PAIRS_BATCH_SIZE).map(|i| format!("Mint{:02}", i)).collect();
        // Lands alone in the second batch.
        mints.push("FAIL".to_string());
        mints
    }

    fn partial_outage(path: &str) -> (&'static str, String) {
        if path == "/token-profiles/latest/v1" {
            let mut profiles: Vec<serde_json::Value> = sol_mints()
                .into_iter()
                .map(|mint| json!({ "chainId": "solana", "tokenAddress": mint }))
                .collect();
            profiles.push(json!({ "chainId": "ethereum", "tokenAddress": "0xabc" }));
            return ("200 OK", serde_json::Value::Array(profiles).to_string());
        }
        if path.starts_with("/tokens/v1/ethereum/") {
            return ("500 Internal Server Error", "{}".to_string());
        }
        if let Some(list) = path.strip_prefix("/tokens/v1/solana/") {
            let mints: Vec<&str> = list.split(',').collect();
            if mints.contains(&"FAIL") {
                return ("500 Internal Server Error", "{}".to_string());
            }
            let pairs: Vec<serde_json::Value> = mints
                .iter()
                .map(|mint| {
                    json!({
                        "chainId": "solana",
                        "pairAddress": format!("{}-pair", mint),
                        "baseToken": { "address": mint, "symbol": "MEME" },
                        "priceUsd": "0.001",
                        "volume": { "h24": 50000.0 },
                        "liquidity": { "usd": 40000.0 },
                        "priceChange": { "h24": 3.0 }
                    })
                })
                .collect();
            return ("200 OK", serde_json::Value::Array(pairs).to_string());
        }
        ("404 Not Found", "{}".to_string())
    }

    #[tokio::test]
    async fn failed_chain_and_batch_do_not_drop_the_rest() {
        let base_url = spawn_listing_stub(partial_outage).await;
        let client = DexScreenerClient::new(Client::new(), base_url);

        let records = client.fetch_tokens(&[Chain::Sol, Chain::Eth]).await;

        // Ethereum and the second solana batch fail; the first batch survives.
        assert_eq!(records.len(), PAIRS_BATCH_SIZE);
        assert!(records.iter().all(|r| r.chain == Chain::Sol));
        assert!(records.iter().all(|r| r.address != "FAIL"));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        fn html(_path: &str) -> (&'static str, String) {
            ("200 OK", "<html>maintenance</html>".to_string())
        }
        let base_url = spawn_listing_stub(html).await;
        let client = DexScreenerClient::new(Client::new(), base_url);

        assert!(matches!(
            client.fetch_profiles().await,
            Err(TrackerError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_listing_yields_empty_cycle() {
        let client = DexScreenerClient::new(Client::new(), "http://127.0.0.1:1");
        let records = client.fetch_tokens(&Chain::TRACKED).await;
        assert!(records.is_empty());
    }
}
