pub mod sources;
pub mod cache;
pub mod fallback;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PriceSourceConfig {
    pub rpc_url: String,
    pub contract: String,
    pub network: String,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default)]
    pub verify_code: bool,
}

fn default_label() -> String {
    "Chainlink Oracle".to_string()
}

fn default_decimals() -> u32 {
    8
}

/// One answer from one oracle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub price: Price,
    /// When the oracle itself last updated the answer.
    pub updated_at: Timestamp,
}

/// Which tier of the fallback chain produced a price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceTier {
    Primary,
    /// 1-based position among the secondary sources.
    Fallback(usize),
    Cached,
    Synthetic,
}

impl SourceTier {
    pub fn label(&self) -> String {
        match self {
            SourceTier::Primary => "primary".to_string(),
            SourceTier::Fallback(n) => format!("fallback-{}", n),
            SourceTier::Cached => "cached".to_string(),
            SourceTier::Synthetic => "synthetic".to_string(),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SourceTier::Primary | SourceTier::Fallback(_))
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "primary" => Some(SourceTier::Primary),
            "cached" => Some(SourceTier::Cached),
            "synthetic" => Some(SourceTier::Synthetic),
            other => other
                .strip_prefix("fallback-")
                .and_then(|n| n.parse().ok())
                .map(SourceTier::Fallback),
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Output of `FallbackChain::resolve`: a price plus where it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPrice {
    pub price: Price,
    pub tier: SourceTier,
    pub source_label: String,
    pub network_label: String,
    /// Wall time spent on the answering fetch; zero for cached and synthetic.
    pub latency: Duration,
}
