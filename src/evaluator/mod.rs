pub mod backtest;
pub mod filter;
pub mod scorer;

pub use backtest::{BacktestReport, BacktestResult, BacktestRunner, HistoricalRecord};
pub use filter::{FilterConfig, TokenFilter};
pub use scorer::{ScoringConfig, TokenScorer};
