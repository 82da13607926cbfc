//! JSON frames pushed to subscribers.

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::events::price::PriceUpdate;

pub const SOURCE_CHAIN: &str = "price-feed";
pub const PRICE_UPDATE_TYPE: &str = "price_update";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    PriceUpdate(PriceUpdateFrame),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdateFrame {
    pub id: String,
    pub data: PriceData,
    /// Epoch milliseconds.
    pub timestamp: u64,
    #[serde(rename = "sourceChain")]
    pub source_chain: String,
    /// Milliseconds; 0 for cached, synthetic and replayed updates.
    pub latency: u64,
}

/// `network` names the chain the answering oracle lives on and stays the
/// same when a cached copy of that answer is served; `tier` says which
/// fallback step produced the price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub token: String,
    pub price: f64,
    pub source: String,
    pub network: String,
    pub tier: String,
}

impl From<&PriceUpdate> for PriceUpdateFrame {
    fn from(update: &PriceUpdate) -> Self {
        PriceUpdateFrame {
            id: update.id.to_string(),
            data: PriceData {
                token: update.token.clone(),
                price: update.price.to_display(),
                source: update.source_label.clone(),
                network: update.network_label.clone(),
                tier: update.tier.label(),
            },
            timestamp: update.timestamp.as_millis(),
            source_chain: SOURCE_CHAIN.to_string(),
            latency: update.latency_millis(),
        }
    }
}

pub fn encode(update: &PriceUpdate) -> Result<String> {
    let message = WireMessage::PriceUpdate(PriceUpdateFrame::from(update));
    Ok(serde_json::to_string(&message)?)
}

/// Parse a subscriber frame, rejecting message types this relay does not emit.
pub fn decode(text: &str) -> Result<WireMessage> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or_default();

    if kind != PRICE_UPDATE_TYPE {
        return Err(Error::UnsupportedMessageType(kind.to_string()));
    }

    Ok(serde_json::from_value(value)?)
}
