use tabled::{
    settings::{object::Columns, Style, Width},
    Table, Tabled,
};

use crate::evaluator::{BacktestReport, BacktestResult};
use crate::listing::{Chain, ScoredToken};
use crate::pipeline::CycleReport;

const DESCRIPTION_WIDTH: usize = 24;

#[derive(Tabled)]
struct TokenRow {
    #[tabled(rename = "Chain")]
    chain: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Volume 24h (USD)")]
    volume: String,
    #[tabled(rename = "Liquidity (USD)")]
    liquidity: String,
    #[tabled(rename = "Holders")]
    holders: u64,
}

impl From<&ScoredToken> for TokenRow {
    fn from(token: &ScoredToken) -> Self {
        let r = &token.record;
        Self {
            chain: r.chain.to_string(),
            symbol: r.symbol.clone(),
            address: r.address.clone(),
            description: r.description.clone(),
            score: format!("{:.2}", token.score),
            volume: format!("{:.0}", r.volume_usd_24h),
            liquidity: format!("{:.0}", r.liquidity_usd),
            holders: r.holders,
        }
    }
}

#[derive(Tabled)]
struct WhaleRow {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Value (USD)")]
    value: String,
}

#[derive(Tabled)]
struct BacktestRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Price")]
    price_usd: f64,
    #[tabled(rename = "Price after 24h")]
    price_after_24h: f64,
    #[tabled(rename = "Would alert")]
    would_alert: bool,
}

impl From<&BacktestResult> for BacktestRow {
    fn from(result: &BacktestResult) -> Self {
        Self {
            symbol: result.symbol.clone(),
            score: format!("{:.2}", result.score),
            price_usd: result.price_usd,
            price_after_24h: result.price_after_24h,
            would_alert: result.would_alert,
        }
    }
}

/// Console table of a cycle, optionally restricted to one chain.
pub fn render_tokens(report: &CycleReport, chain: Option<Chain>) -> String {
    let tokens: Vec<&ScoredToken> = report
        .tokens
        .iter()
        .filter(|t| chain.map_or(true, |c| t.record.chain == c))
        .collect();

    if tokens.is_empty() {
        return "No data: no token passed the filters in the last cycle.\n".to_string();
    }

    let mut table = Table::new(tokens.iter().map(|t| TokenRow::from(*t)));
    table
        .with(Style::modern())
        .modify(Columns::single(3), Width::truncate(DESCRIPTION_WIDTH).suffix("..."));
    let mut out = format!("{}\n", table);

    let whales: Vec<WhaleRow> = tokens
        .iter()
        .flat_map(|t| {
            t.whales.iter().map(move |w| WhaleRow {
                token: format!("{} ({})", t.record.symbol, t.record.chain),
                from: w.from_address.clone(),
                to: w.to_address.clone(),
                value: format!("{:.2}", w.value_usd),
            })
        })
        .collect();
    if !whales.is_empty() {
        let mut table = Table::new(whales);
        table.with(Style::modern());
        out.push_str(&format!("\n🐋 Whale Alerts\n{}\n", table));
    }
    out
}

pub fn render_backtest(report: &BacktestReport) -> String {
    let mut table = Table::new(report.results.iter().map(BacktestRow::from));
    table.with(Style::modern());

    format!(
        "{}\n\nRecords evaluated: {}\nBacktest Hit Rate (>30% gain): {:.2}%\nPrecision among alerted: {:.2}%\n",
        table,
        report.evaluated,
        report.hit_rate * 100.0,
        report.precision * 100.0
    )
}
