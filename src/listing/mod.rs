pub mod chain;
pub mod fetcher;
pub mod token;

pub use chain::{infer_chain_from_links, Chain};
pub use fetcher::{DexScreenerClient, ListingSource};
pub use token::{ScoredToken, TokenRecord, WhaleTransaction};
