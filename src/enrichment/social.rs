use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Secret;
use crate::error::{check_status, Result, TrackerError};
use crate::listing::Chain;
use super::SocialSource;

#[derive(Debug, Deserialize)]
struct CountsMeta {
    total_tweet_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CountsResponse {
    meta: Option<CountsMeta>,
}

pub fn parse_mention_count(body: &str) -> Result<u32> {
    let response: CountsResponse = serde_json::from_str(body)?;
    let total = response
        .meta
        .and_then(|m| m.total_tweet_count)
        .ok_or_else(|| TrackerError::malformed("counts response without meta.total_tweet_count"))?;
    Ok(u32::try_from(total).unwrap_or(u32::MAX))
}

/// Cashtag query for a token symbol.
pub fn mention_query(symbol: &str) -> String {
    format!("${}", symbol.trim().trim_start_matches('$'))
}

/// Counts recent posts mentioning a token's cashtag.
pub struct SocialClient {
    client: Client,
    base_url: String,
    bearer_token: Option<Secret>,
}

impl SocialClient {
    pub fn new(client: Client, base_url: impl Into<String>, bearer_token: Option<Secret>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }
}

#[async_trait]
impl SocialSource for SocialClient {
    async fn mention_count(&self, _chain: Chain, symbol: &str) -> Result<u32> {
        let token = self
            .bearer_token
            .as_ref()
            .ok_or_else(|| TrackerError::unconfigured("social bearer token"))?;

        let url = format!("{}/2/tweets/counts/recent", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .query(&[("query", mention_query(symbol))])
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        parse_mention_count(&body)
    }
}
