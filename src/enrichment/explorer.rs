use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::{ExplorerKeys, Secret};
use crate::error::{json_body, Result, TrackerError};
use crate::listing::{Chain, WhaleTransaction};
use super::{HolderSource, OwnershipSource, WhaleSource};

const SOLSCAN_API: &str = "https://pro-api.solscan.io/v2.0";

/// `owner()` selector.
const OWNER_SELECTOR: &str = "0x8da5cb5b";

/// Transfers inspected per whale lookup.
const TRANSFER_PAGE_SIZE: &str = "100";

fn etherscan_api(chain: Chain) -> Option<&'static str> {
    match chain {
        Chain::Eth => Some("https://api.etherscan.io/api"),
        Chain::Bsc => Some("https://api.bscscan.com/api"),
        Chain::Arbi => Some("https://api.arbiscan.io/api"),
        Chain::Base => Some("https://api.basescan.org/api"),
        Chain::Sol | Chain::Unknown => None,
    }
}

/// Unwraps the `{status, message, result}` envelope of Etherscan-family APIs.
/// Proxy calls answer in JSON-RPC form and carry no `status`.
pub fn parse_etherscan(body: Value) -> Result<Value> {
    if let Some(error) = body.get("error") {
        return Err(TrackerError::malformed(format!("explorer rpc error: {}", error)));
    }

    let status = body.get("status").and_then(Value::as_str);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let result = body.get("result").cloned().unwrap_or(Value::Null);

    match status {
        Some("1") | None if !result.is_null() => Ok(result),
        Some("0") => {
            let detail = result.as_str().unwrap_or(message.as_str()).to_string();
            let lowered = detail.to_ascii_lowercase();
            if message.starts_with("No transactions found") || lowered.starts_with("no transactions found") {
                Ok(Value::Array(Vec::new()))
            } else if lowered.contains("rate limit") {
                Err(TrackerError::rate_limited(detail))
            } else if lowered.contains("invalid api key") || lowered.contains("missing/invalid api key") {
                Err(TrackerError::unauthorized(detail))
            } else {
                Err(TrackerError::Api { status: 200, message: detail })
            }
        }
        _ => Err(TrackerError::malformed(format!("unexpected explorer payload: {}", body))),
    }
}

pub fn parse_holder_count(result: &Value) -> Result<u64> {
    match result {
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| TrackerError::malformed(format!("holder count '{}': {}", s, e))),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| TrackerError::malformed(format!("holder count {}", n))),
        other => Err(TrackerError::malformed(format!("holder count {}", other))),
    }
}

/// An `owner()` word equal to the zero or dead address means ownership was given up.
pub fn parse_owner_renounced(result: &Value) -> Result<bool> {
    let word = result
        .as_str()
        .ok_or_else(|| TrackerError::malformed("owner() result is not a string"))?
        .trim_start_matches("0x")
        .to_ascii_lowercase();

    if word.len() < 40 || !word.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TrackerError::malformed(format!("owner() returned '{}'", word)));
    }

    let owner = &word[word.len() - 40..];
    let burned = owner.ends_with("dead") && owner[..36].chars().all(|c| c == '0');
    Ok(burned || owner.chars().all(|c| c == '0'))
}

fn scaled(raw: f64, decimals: u32) -> f64 {
    raw / 10f64.powi(decimals as i32)
}

pub fn parse_evm_transfers(result: &Value, price_usd: f64, threshold_usd: f64) -> Result<Vec<WhaleTransaction>> {
    let transfers = result
        .as_array()
        .ok_or_else(|| TrackerError::malformed("tokentx result is not a list"))?;

    let field = |t: &Value, key: &str| t.get(key).and_then(Value::as_str).map(str::to_string);

    let mut whales = Vec::new();
    for transfer in transfers {
        let (Some(from), Some(to), Some(value)) = (
            field(transfer, "from"),
            field(transfer, "to"),
            field(transfer, "value"),
        ) else {
            debug!("Skipping incomplete transfer: {}", transfer);
            continue;
        };
        let decimals = field(transfer, "tokenDecimal")
            .and_then(|d| d.parse::<u32>().ok())
            .unwrap_or(18);
        let Ok(raw) = value.parse::<f64>() else { continue };

        let value_usd = scaled(raw, decimals) * price_usd;
        if value_usd > threshold_usd {
            let timestamp = field(transfer, "timeStamp")
                .and_then(|t| t.parse::<i64>().ok())
                .and_then(|t| Utc.timestamp_opt(t, 0).single());
            whales.push(WhaleTransaction {
                from_address: from,
                to_address: to,
                value_usd,
                timestamp,
            });
        }
    }
    Ok(whales)
}

/// Unwraps the `{success, data}` envelope of the Solscan API.
pub fn parse_solscan(body: Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return body
            .get("data")
            .cloned()
            .ok_or_else(|| TrackerError::malformed("solscan response without data"));
    }
    let message = body
        .pointer("/errors/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown solscan error")
        .to_string();
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("limit") {
        Err(TrackerError::rate_limited(message))
    } else if lowered.contains("auth") || lowered.contains("api key") {
        Err(TrackerError::unauthorized(message))
    } else {
        Err(TrackerError::malformed(message))
    }
}

pub fn parse_solscan_holders(meta: &Value) -> Result<u64> {
    meta.get("holder")
        .and_then(Value::as_u64)
        .ok_or_else(|| TrackerError::malformed("token meta without holder"))
}

/// A mint without a mint authority can no longer be inflated.
pub fn parse_solscan_renounced(meta: &Value) -> Result<bool> {
    match meta.get("mint_authority") {
        Some(Value::Null) => Ok(true),
        Some(Value::String(authority)) => Ok(authority.is_empty()),
        Some(other) => Err(TrackerError::malformed(format!("mint_authority {}", other))),
        None => Err(TrackerError::malformed("token meta without mint_authority")),
    }
}

pub fn parse_solscan_transfers(data: &Value, price_usd: f64, threshold_usd: f64) -> Result<Vec<WhaleTransaction>> {
    let transfers = data
        .as_array()
        .ok_or_else(|| TrackerError::malformed("token transfers is not a list"))?;

    Ok(transfers
        .iter()
        .filter_map(|t| {
            let from = t.get("from_address")?.as_str()?.to_string();
            let to = t.get("to_address")?.as_str()?.to_string();
            let amount = t.get("amount")?.as_f64()?;
            let decimals = t.get("token_decimals").and_then(Value::as_u64).unwrap_or(0) as u32;
            let timestamp = t
                .get("block_time")
                .and_then(Value::as_i64)
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
            Some(WhaleTransaction {
                from_address: from,
                to_address: to,
                value_usd: scaled(amount, decimals) * price_usd,
                timestamp,
            })
        })
        .filter(|w| w.value_usd > threshold_usd)
        .collect())
}

/// Block-explorer collaborator: Etherscan-family APIs for EVM chains, Solscan for Solana.
pub struct ExplorerClient {
    client: Client,
    keys: ExplorerKeys,
}

impl ExplorerClient {
    pub fn new(client: Client, keys: ExplorerKeys) -> Self {
        Self { client, keys }
    }

    fn key(&self, chain: Chain) -> Result<&Secret> {
        self.keys
            .for_chain(chain)
            .ok_or_else(|| TrackerError::unconfigured(format!("{} explorer API key", chain)))
    }

    async fn etherscan(&self, chain: Chain, params: &[(&str, &str)]) -> Result<Value> {
        let base = etherscan_api(chain)
            .ok_or_else(|| TrackerError::unconfigured(format!("no EVM explorer for {}", chain)))?;
        let key = self.key(chain)?;

        let response = self
            .client
            .get(base)
            .query(params)
            .query(&[("apikey", key.expose())])
            .send()
            .await?;
        let body: Value = json_body(response).await?;
        parse_etherscan(body)
    }

    async fn solscan(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let key = self.key(Chain::Sol)?;
        let response = self
            .client
            .get(format!("{}{}", SOLSCAN_API, path))
            .header("token", key.expose())
            .query(params)
            .send()
            .await?;
        let body: Value = json_body(response).await?;
        parse_solscan(body)
    }
}

#[async_trait]
impl HolderSource for ExplorerClient {
    async fn holder_count(&self, chain: Chain, address: &str) -> Result<u64> {
        if chain == Chain::Sol {
            let meta = self.solscan("/token/meta", &[("address", address)]).await?;
            return parse_solscan_holders(&meta);
        }
        let result = self
            .etherscan(
                chain,
                &[("module", "token"), ("action", "tokenholdercount"), ("contractaddress", address)],
            )
            .await?;
        parse_holder_count(&result)
    }
}

#[async_trait]
impl OwnershipSource for ExplorerClient {
    async fn is_renounced(&self, chain: Chain, address: &str) -> Result<bool> {
        if chain == Chain::Sol {
            let meta = self.solscan("/token/meta", &[("address", address)]).await?;
            return parse_solscan_renounced(&meta);
        }
        let result = self
            .etherscan(
                chain,
                &[
                    ("module", "proxy"),
                    ("action", "eth_call"),
                    ("to", address),
                    ("data", OWNER_SELECTOR),
                    ("tag", "latest"),
                ],
            )
            .await?;
        parse_owner_renounced(&result)
    }
}

#[async_trait]
impl WhaleSource for ExplorerClient {
    async fn whale_transactions(
        &self,
        chain: Chain,
        address: &str,
        price_usd: f64,
        threshold_usd: f64,
    ) -> Result<Vec<WhaleTransaction>> {
        if chain == Chain::Sol {
            let data = self
                .solscan(
                    "/token/transfer",
                    &[
                        ("address", address),
                        ("page", "1"),
                        ("page_size", TRANSFER_PAGE_SIZE),
                        ("sort_by", "block_time"),
                        ("sort_order", "desc"),
                    ],
                )
                .await?;
            return parse_solscan_transfers(&data, price_usd, threshold_usd);
        }
        let result = self
            .etherscan(
                chain,
                &[
                    ("module", "account"),
                    ("action", "tokentx"),
                    ("contractaddress", address),
                    ("page", "1"),
                    ("offset", TRANSFER_PAGE_SIZE),
                    ("sort", "desc"),
                ],
            )
            .await?;
        parse_evm_transfers(&result, price_usd, threshold_usd)
    }
}
