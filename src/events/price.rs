use std::time::Duration;
use crate::price_infra::{ResolvedPrice, SourceTier};
use crate::types::ids::UpdateId;
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// One poll cycle's outcome, published to every subscriber.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceUpdate {
    pub id: UpdateId,
    pub token: String,
    pub price: Price,
    pub tier: SourceTier,
    pub source_label: String,
    pub network_label: String,
    pub timestamp: Timestamp,
    pub latency: Duration,
}

impl PriceUpdate {
    pub fn from_resolved(token: &str, resolved: ResolvedPrice, timestamp: Timestamp) -> Self {
        debug_assert!(resolved.price.is_positive());
        PriceUpdate {
            id: UpdateId::new(),
            token: token.to_string(),
            price: resolved.price,
            tier: resolved.tier,
            source_label: resolved.source_label,
            network_label: resolved.network_label,
            timestamp,
            latency: resolved.latency,
        }
    }

    /// Copy sent to a subscriber that joins after the update was published.
    ///
    /// Keeps the id so consumers keyed on it never count the update twice.
    pub fn as_replay(&self) -> Self {
        PriceUpdate {
            latency: Duration::ZERO,
            ..self.clone()
        }
    }

    pub fn latency_millis(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}
