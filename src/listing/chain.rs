use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Sol,
    Eth,
    Bsc,
    Arbi,
    Base,
    Unknown,
}

/// Explorer host fragments, checked in this order for every link.
const EXPLORER_MARKERS: [(&str, Chain); 5] = [
    ("solscan", Chain::Sol),
    ("etherscan", Chain::Eth),
    ("bscscan", Chain::Bsc),
    ("arbiscan", Chain::Arbi),
    ("basescan", Chain::Base),
];

impl Chain {
    pub const TRACKED: [Chain; 5] = [Chain::Sol, Chain::Eth, Chain::Bsc, Chain::Arbi, Chain::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Sol => "sol",
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
            Chain::Arbi => "arbi",
            Chain::Base => "base",
            Chain::Unknown => "unknown",
        }
    }

    /// Chain id used by the DexScreener API.
    pub fn listing_id(&self) -> Option<&'static str> {
        match self {
            Chain::Sol => Some("solana"),
            Chain::Eth => Some("ethereum"),
            Chain::Bsc => Some("bsc"),
            Chain::Arbi => Some("arbitrum"),
            Chain::Base => Some("base"),
            Chain::Unknown => None,
        }
    }

    pub fn from_listing_id(id: &str) -> Option<Chain> {
        match id.to_ascii_lowercase().as_str() {
            "solana" => Some(Chain::Sol),
            "ethereum" => Some(Chain::Eth),
            "bsc" => Some(Chain::Bsc),
            "arbitrum" => Some(Chain::Arbi),
            "base" => Some(Chain::Base),
            _ => None,
        }
    }

    pub fn is_evm(&self) -> bool {
        matches!(self, Chain::Eth | Chain::Bsc | Chain::Arbi | Chain::Base)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sol" | "solana" => Ok(Chain::Sol),
            "eth" | "ethereum" => Ok(Chain::Eth),
            "bsc" => Ok(Chain::Bsc),
            "arbi" | "arbitrum" => Ok(Chain::Arbi),
            "base" => Ok(Chain::Base),
            "unknown" => Ok(Chain::Unknown),
            other => Err(TrackerError::config_error(format!("unknown chain '{}'", other))),
        }
    }
}

/// Infers the chain from explorer links. The first link containing a known
/// explorer host decides; no match yields [`Chain::Unknown`].
pub fn infer_chain_from_links<S: AsRef<str>>(links: &[S]) -> Chain {
    for link in links {
        let link = link.as_ref();
        if let Some((_, chain)) = EXPLORER_MARKERS
            .iter()
            .find(|(marker, _)| link.contains(marker))
        {
            return *chain;
        }
    }
    Chain::Unknown
}

/// Resolves a listing's chain: a recognised chain id wins, links are the fallback.
pub fn resolve_chain<S: AsRef<str>>(chain_id: Option<&str>, links: &[S]) -> Chain {
    chain_id
        .and_then(Chain::from_listing_id)
        .unwrap_or_else(|| infer_chain_from_links(links))
}
