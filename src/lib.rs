pub mod config;
pub mod enrichment;
pub mod error;
pub mod evaluator;
pub mod listing;
pub mod monitoring;
pub mod pipeline;

pub use error::{Result, TrackerError};
