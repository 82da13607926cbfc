use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};
use crate::error::FetchError;
use crate::observability::metrics::{FETCH_LATENCY, SOURCE_FAILURES};
use crate::price_infra::cache::FreshnessCache;
use crate::price_infra::sources::PriceSource;
use crate::price_infra::{ResolvedPrice, SourceTier};
use crate::types::price::Price;

pub const SYNTHETIC_NETWORK: &str = "Synthetic";

/// A `PriceSource` plus the labels subscribers see when it answers.
pub struct SourceSlot {
    source: Box<dyn PriceSource>,
    source_label: String,
    network_label: String,
}

impl SourceSlot {
    pub fn new(
        source_label: impl Into<String>,
        network_label: impl Into<String>,
        source: Box<dyn PriceSource>,
    ) -> Self {
        SourceSlot {
            source,
            source_label: source_label.into(),
            network_label: network_label.into(),
        }
    }
}

/// Degraded-mode value used when no live or cached price exists.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticConfig {
    pub baseline: Price,
    /// Maximum absolute deviation from the baseline.
    pub jitter: Price,
    pub source_label: &'static str,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            baseline: Price::from_f64(2500.0),
            jitter: Price::from_f64(50.0),
            source_label: "Chainlink Oracle",
        }
    }
}

/// Ordered primary + secondary sources with cache and synthetic backstops.
///
/// `resolve` is total: once every live source has failed it answers from
/// the cache, and failing that synthesizes a value.
pub struct FallbackChain {
    slots: Vec<SourceSlot>,
    source_timeout: Duration,
    synthetic: SyntheticConfig,
    rng: Mutex<fastrand::Rng>,
}

impl FallbackChain {
    pub fn new(primary: SourceSlot, source_timeout: Duration) -> Self {
        FallbackChain {
            slots: vec![primary],
            source_timeout,
            synthetic: SyntheticConfig::default(),
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_fallback(mut self, slot: SourceSlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn with_synthetic(mut self, synthetic: SyntheticConfig) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        FallbackChain {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
            ..self
        }
    }

    pub fn source_count(&self) -> usize {
        self.slots.len()
    }

    pub fn primary_labels(&self) -> (&str, &str) {
        let primary = &self.slots[0];
        (&primary.source_label, &primary.network_label)
    }

    pub async fn resolve(&self, cache: &FreshnessCache) -> ResolvedPrice {
        for (index, slot) in self.slots.iter().enumerate() {
            let tier = if index == 0 {
                SourceTier::Primary
            } else {
                SourceTier::Fallback(index)
            };

            let started = Instant::now();
            let outcome = match timeout(self.source_timeout, slot.source.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.source_timeout.as_millis() as u64)),
            };
            let latency = started.elapsed();

            match outcome {
                Ok(reading) if reading.price.is_positive() => {
                    FETCH_LATENCY.observe(latency.as_secs_f64());
                    debug!(
                        tier = %tier,
                        network = %slot.network_label,
                        price = %reading.price,
                        latency_ms = latency.as_millis() as u64,
                        "Source answered"
                    );
                    return ResolvedPrice {
                        price: reading.price,
                        tier,
                        source_label: slot.source_label.clone(),
                        network_label: slot.network_label.clone(),
                        latency,
                    };
                }
                Ok(reading) => {
                    SOURCE_FAILURES.with_label_values(&[tier.label().as_str()]).inc();
                    warn!(tier = %tier, network = %slot.network_label, "Source returned non-positive price {}", reading.price);
                }
                Err(e) => {
                    SOURCE_FAILURES.with_label_values(&[tier.label().as_str()]).inc();
                    warn!(tier = %tier, network = %slot.network_label, "Source unavailable: {}", e);
                }
            }
        }

        if let Some(hit) = cache.get(Instant::now()) {
            warn!(age_ms = hit.age.as_millis() as u64, "All sources unavailable, serving cached price");
            return ResolvedPrice {
                price: hit.price,
                tier: SourceTier::Cached,
                source_label: hit.source_label,
                network_label: hit.network_label,
                latency: Duration::ZERO,
            };
        }

        let baseline = cache.last_price().unwrap_or(self.synthetic.baseline);
        let price = self.synthesize(baseline);
        warn!(baseline = %baseline, price = %price, "All sources unavailable and cache is cold, serving synthetic price");

        ResolvedPrice {
            price,
            tier: SourceTier::Synthetic,
            source_label: self.synthetic.source_label.to_string(),
            network_label: SYNTHETIC_NETWORK.to_string(),
            latency: Duration::ZERO,
        }
    }

    fn synthesize(&self, baseline: Price) -> Price {
        let unit = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.f64() * 2.0 - 1.0
        };
        let offset = Price::from_f64(unit * self.synthetic.jitter.to_f64());
        (baseline + offset).max(Price::MIN_DISPLAY)
    }
}
