use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);  // Milliseconds since epoch

impl Timestamp {
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn wall_clock() -> Self {
        Timestamp(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }
}

/// Wall clock that never runs backwards.
///
/// Readings are `max(wall_clock, last_reading)`, so a clock step backwards
/// freezes time instead of reordering updates.
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            last: AtomicU64::new(0),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.observe(Timestamp::wall_clock())
    }

    /// Fold an externally supplied wall-clock reading into the clock.
    pub fn observe(&self, wall_clock: Timestamp) -> Timestamp {
        let previous = self.last.fetch_max(wall_clock.0, Ordering::SeqCst);
        Timestamp(previous.max(wall_clock.0))
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
