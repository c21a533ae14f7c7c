use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::listing::{Chain, TokenRecord};
use super::{FilterConfig, TokenFilter, TokenScorer};

/// Gain over the entry price that counts as a hit.
pub const TARGET_GAIN: f64 = 1.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub symbol: String,
    pub volume_usd: f64,
    pub liquidity_usd: f64,
    pub holders: u64,
    pub price_usd: f64,
    pub price_after_24h: f64,
}

impl HistoricalRecord {
    fn to_token(&self) -> TokenRecord {
        TokenRecord {
            chain: Chain::Unknown,
            symbol: self.symbol.clone(),
            address: String::new(),
            pair_address: self.symbol.clone(),
            price_usd: self.price_usd,
            volume_usd_24h: self.volume_usd,
            liquidity_usd: self.liquidity_usd,
            holders: self.holders,
            price_change_24h_pct: 0.0,
            pair_created_at: None,
            links: Vec::new(),
            description: String::new(),
            icon: String::new(),
            renounced: false,
            social_mentions: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub score: f64,
    pub price_usd: f64,
    pub price_after_24h: f64,
    pub would_alert: bool,
}

impl BacktestResult {
    pub fn is_hit(&self) -> bool {
        self.would_alert && self.price_after_24h > self.price_usd * TARGET_GAIN
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub results: Vec<BacktestResult>,
    /// Every historical record, filtered out or not.
    pub evaluated: usize,
    pub alerted: usize,
    pub hits: usize,
    /// hits / evaluated
    pub hit_rate: f64,
    /// hits / alerted
    pub precision: f64,
}

/// Replays filter and scorer over recorded tokens whose later price is known.
pub struct BacktestRunner {
    filter: TokenFilter,
    scorer: TokenScorer,
}

impl BacktestRunner {
    /// Historical records carry no enrichment or listing age, so only the
    /// volume, liquidity and holder thresholds apply.
    pub fn new(filter: &FilterConfig, scorer: TokenScorer) -> Self {
        let filter = TokenFilter::new(FilterConfig {
            price_change_min: None,
            require_renounced: false,
            social_mentions_min: None,
            max_age_seconds: None,
            ..filter.clone()
        });
        Self { filter, scorer }
    }

    pub fn run(&self, history: &[HistoricalRecord]) -> BacktestReport {
        let now = chrono::Utc::now();
        let results: Vec<BacktestResult> = history
            .iter()
            .filter_map(|record| {
                let token = record.to_token();
                if !self.filter.passes(&token, now) {
                    return None;
                }
                let score = self.scorer.score_token(&token);
                Some(BacktestResult {
                    symbol: record.symbol.clone(),
                    score,
                    price_usd: record.price_usd,
                    price_after_24h: record.price_after_24h,
                    would_alert: self.scorer.should_alert(score),
                })
            })
            .collect();

        let evaluated = history.len();
        let alerted = results.iter().filter(|r| r.would_alert).count();
        let hits = results.iter().filter(|r| r.is_hit()).count();

        let report = BacktestReport {
            hit_rate: hits as f64 / evaluated.max(1) as f64,
            precision: hits as f64 / alerted.max(1) as f64,
            results,
            evaluated,
            alerted,
            hits,
        };
        info!(
            "Backtest: {} evaluated, {} scored, {} alerted, {} hits",
            report.evaluated,
            report.results.len(),
            report.alerted,
            report.hits
        );
        report
    }
}

pub fn load_history(path: &Path) -> Result<Vec<HistoricalRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Built-in replay set.
pub fn sample_history() -> Vec<HistoricalRecord> {
    let record = |symbol: &str, volume_usd: f64, liquidity_usd: f64, holders: u64, price_usd: f64, price_after_24h: f64| HistoricalRecord {
        symbol: symbol.to_string(),
        volume_usd,
        liquidity_usd,
        holders,
        price_usd,
        price_after_24h,
    };
    vec![
        record("TEST1", 25_000.0, 30_000.0, 300, 1.0, 1.5),
        record("TEST2", 15_000.0, 25_000.0, 250, 0.5, 0.6),
        record("TEST3", 40_000.0, 50_000.0, 500, 2.0, 3.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::ScoringConfig;
    use std::io::Write;

    fn runner(threshold: f64) -> BacktestRunner {
        BacktestRunner::new(
            &FilterConfig::default(),
            TokenScorer::new(ScoringConfig::default(), threshold),
        )
    }

    #[test]
    fn sample_history_excludes_low_volume() {
        let report = runner(75.0).run(&sample_history());
        let symbols: Vec<&str> = report.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TEST1", "TEST3"]);
        assert!((report.results[0].score - 19.0).abs() < 1e-9);
        assert!((report.results[1].score - 31.0).abs() < 1e-9);

        // Neither score clears 75.
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.alerted, 0);
        assert_eq!(report.hit_rate, 0.0);
        assert_eq!(report.precision, 0.0);
    }

    #[test]
    fn hit_rate_divides_by_all_records() {
        let report = runner(10.0).run(&sample_history());
        assert_eq!(report.alerted, 2);
        assert_eq!(report.hits, 2);
        assert!((report.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.precision - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gain_must_exceed_thirty_percent() {
        let mut history = sample_history();
        history[0].price_after_24h = 1.3;
        let report = runner(10.0).run(&history);
        assert_eq!(report.hits, 1);
    }

    #[test]
    fn empty_history_does_not_divide_by_zero() {
        let report = runner(75.0).run(&[]);
        assert_eq!(report.evaluated, 0);
        assert_eq!(report.hit_rate, 0.0);
        assert_eq!(report.precision, 0.0);
    }

    #[test]
    fn loads_history_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"symbol":"X","volume_usd":1.0,"liquidity_usd":2.0,"holders":3,"price_usd":4.0,"price_after_24h":5.0}}]"#
        )
        .unwrap();
        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].holders, 3);
    }
}
