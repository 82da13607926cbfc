//! Single-slot cache of the last live price.

use std::time::Duration;
use tokio::time::Instant;
use crate::types::price::Price;

#[derive(Clone, Debug, PartialEq)]
struct CacheEntry {
    price: Price,
    captured_at: Instant,
    source_label: String,
    network_label: String,
}

/// A still-valid cached price.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheHit {
    pub price: Price,
    pub age: Duration,
    pub source_label: String,
    pub network_label: String,
}

/// Holds the last successfully fetched price for `ttl`.
///
/// Writes replace the whole entry, so a clone taken at any point is a
/// consistent snapshot.
#[derive(Clone, Debug)]
pub struct FreshnessCache {
    entry: Option<CacheEntry>,
    ttl: Duration,
}

impl FreshnessCache {
    pub fn new(ttl: Duration) -> Self {
        FreshnessCache { entry: None, ttl }
    }

    /// Overwrite the slot with a fresh live price.
    pub fn put(
        &mut self,
        price: Price,
        at: Instant,
        source_label: impl Into<String>,
        network_label: impl Into<String>,
    ) {
        self.entry = Some(CacheEntry {
            price,
            captured_at: at,
            source_label: source_label.into(),
            network_label: network_label.into(),
        });
    }

    /// Valid iff `now - captured_at < ttl`.
    pub fn get(&self, now: Instant) -> Option<CacheHit> {
        let entry = self.entry.as_ref()?;
        let age = now.saturating_duration_since(entry.captured_at);
        if age >= self.ttl {
            return None;
        }
        Some(CacheHit {
            price: entry.price,
            age,
            source_label: entry.source_label.clone(),
            network_label: entry.network_label.clone(),
        })
    }

    /// Last price ever stored, regardless of age.
    pub fn last_price(&self) -> Option<Price> {
        self.entry.as_ref().map(|e| e.price)
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_misses() {
        let cache = FreshnessCache::new(Duration::from_secs(30));
        assert!(cache.is_empty());
        assert!(cache.get(Instant::now()).is_none());
        assert!(cache.last_price().is_none());
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = FreshnessCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        cache.put(Price::from_f64(2501.10), t0, "Chainlink Oracle", "Ethereum Sepolia");

        let hit = cache.get(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(hit.price, Price::from_f64(2501.10));
        assert_eq!(hit.age, Duration::from_secs(5));
        assert_eq!(hit.network_label, "Ethereum Sepolia");
    }

    #[test]
    fn test_expires_at_ttl_boundary() {
        let mut cache = FreshnessCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        cache.put(Price::from_f64(2500.0), t0, "a", "b");

        assert!(cache.get(t0 + Duration::from_millis(29_999)).is_some());
        assert!(cache.get(t0 + Duration::from_secs(30)).is_none());
        // Stale entries still seed the synthetic baseline
        assert_eq!(cache.last_price(), Some(Price::from_f64(2500.0)));
    }

    #[test]
    fn test_put_overwrites() {
        let mut cache = FreshnessCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        cache.put(Price::from_f64(1.0), t0, "a", "b");
        cache.put(Price::from_f64(2.0), t0 + Duration::from_secs(1), "c", "d");

        let hit = cache.get(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(hit.price, Price::from_f64(2.0));
        assert_eq!(hit.source_label, "c");
    }
}
