pub mod scheduler;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::enrichment::{Enricher, ExplorerClient, SocialClient};
use crate::evaluator::{TokenFilter, TokenScorer};
use crate::listing::{Chain, DexScreenerClient, ListingSource, ScoredToken, TokenRecord};
use crate::monitoring::{AlertDispatcher, AlertedSet, TelegramNotifier};

pub use scheduler::Scheduler;

/// Records enriched at the same time within one cycle.
const ENRICHMENT_CONCURRENCY: usize = 8;

/// Outcome of one fetch → enrich → filter → score → alert cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub fetched: usize,
    pub market_qualified: usize,
    /// Filter survivors, best score first.
    pub tokens: Vec<ScoredToken>,
    pub alerts_sent: usize,
    pub whale_alerts_sent: usize,
    pub enrichment_failures: usize,
}

impl CycleReport {
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            fetched: 0,
            market_qualified: 0,
            tokens: Vec::new(),
            alerts_sent: 0,
            whale_alerts_sent: 0,
            enrichment_failures: 0,
        }
    }

    /// The "no data" state.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Process-lifetime state of the tracker, owned by whoever drives the cycles.
#[derive(Debug)]
pub struct TrackerContext {
    pub alerted: AlertedSet,
    cooldown: Duration,
    last_run: Option<Instant>,
    latest: Option<CycleReport>,
}

impl TrackerContext {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            alerted: AlertedSet::new(),
            cooldown,
            last_run: None,
            latest: None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }

    /// Report of the most recent cycle.
    pub fn latest(&self) -> Option<&CycleReport> {
        self.latest.as_ref()
    }
}

pub struct Tracker {
    listing: Arc<dyn ListingSource>,
    enricher: Enricher,
    filter: TokenFilter,
    scorer: TokenScorer,
    dispatcher: AlertDispatcher,
    chains: Vec<Chain>,
}

impl Tracker {
    pub fn new(
        listing: Arc<dyn ListingSource>,
        enricher: Enricher,
        filter: TokenFilter,
        scorer: TokenScorer,
        dispatcher: AlertDispatcher,
        chains: Vec<Chain>,
    ) -> Self {
        Self {
            listing,
            enricher,
            filter,
            scorer,
            dispatcher,
            chains,
        }
    }

    /// Wires the HTTP collaborators described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config.http_client()?;

        let listing = Arc::new(DexScreenerClient::new(client.clone(), &config.listing_api_url));
        let explorer = Arc::new(ExplorerClient::new(client.clone(), config.explorer_keys.clone()));
        let social = Arc::new(SocialClient::new(
            client.clone(),
            &config.social_api_url,
            config.social_bearer_token.clone(),
        ));
        let telegram = Arc::new(TelegramNotifier::new(
            client,
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
        ));

        Ok(Self::new(
            listing,
            Enricher::from_clients(explorer, social, config.whale_threshold_usd),
            TokenFilter::new(config.filter.clone()),
            TokenScorer::new(config.scoring.clone(), config.alert_score_threshold),
            AlertDispatcher::new(telegram, config.alert_score_threshold),
            config.chains.clone(),
        ))
    }

    /// Runs a cycle unless the previous one started less than the cooldown ago.
    /// For on-demand triggers; the [`Scheduler`] is gated by its own ticker.
    pub async fn run_if_due(&self, ctx: &mut TrackerContext) -> Option<CycleReport> {
        if !ctx.is_due(Instant::now()) {
            info!("Cycle skipped: cooldown has not elapsed");
            return None;
        }
        Some(self.run_cycle(ctx).await)
    }

    pub async fn run_cycle(&self, ctx: &mut TrackerContext) -> CycleReport {
        let started_at = Utc::now();
        ctx.last_run = Some(Instant::now());
        let failures_before = self.enricher.failure_count();

        info!("Starting tracking cycle for chains {:?}", self.chains);
        let records = self.listing.fetch_tokens(&self.chains).await;

        let mut report = CycleReport::empty(started_at);
        report.fetched = records.len();

        let qualified: Vec<TokenRecord> = records
            .into_iter()
            .filter(|record| self.filter.passes_market(record, started_at))
            .collect();
        report.market_qualified = qualified.len();

        let check_renounced = self.filter.requires_renounced();
        let enriched: Vec<TokenRecord> = stream::iter(qualified)
            .map(move |mut record| async move {
                self.enricher.enrich_record(&mut record, check_renounced).await;
                record
            })
            .buffered(ENRICHMENT_CONCURRENCY)
            .collect()
            .await;

        let scored: Vec<ScoredToken> = enriched
            .into_iter()
            .filter(|record| self.filter.passes(record, started_at))
            .map(|record| self.scorer.score(record))
            .collect();

        let mut tokens: Vec<ScoredToken> = stream::iter(scored)
            .map(move |mut token| async move {
                token.whales = self
                    .enricher
                    .whale_transactions(token.record.chain, &token.record.address, token.record.price_usd)
                    .await;
                token
            })
            .buffered(ENRICHMENT_CONCURRENCY)
            .collect()
            .await;
        tokens.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        report.alerts_sent = self
            .dispatcher
            .dispatch_token_alerts(&mut ctx.alerted, &tokens)
            .await;
        report.whale_alerts_sent = self.dispatcher.dispatch_whale_alerts(&tokens).await;
        report.tokens = tokens;
        report.enrichment_failures = self.enricher.failure_count() - failures_before;

        if report.is_empty() {
            warn!("No data: {} fetched, none passed the filters", report.fetched);
        } else {
            info!(
                "Cycle done: {} fetched, {} qualified, {} alerts, {} whale alerts, {} enrichment failures",
                report.fetched,
                report.tokens.len(),
                report.alerts_sent,
                report.whale_alerts_sent,
                report.enrichment_failures
            );
        }

        ctx.latest = Some(report.clone());
        report
    }
}
