use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(i64);  // Fixed-point with 8 decimal places

impl Price {
    pub const DECIMALS: u32 = 8;
    const MULTIPLIER: i64 = 100_000_000;  // 10^8

    /// Smallest price the relay will ever emit (one cent).
    pub const MIN_DISPLAY: Price = Price(1_000_000);

    pub fn from_raw(value: i64) -> Self {
        Price(value)
    }

    pub fn raw_value(&self) -> i64 {
        self.0
    }

    pub fn from_f64(value: f64) -> Self {
        Price((value * Self::MULTIPLIER as f64).round() as i64)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    /// Rescale an aggregator answer reported with `decimals` places.
    ///
    /// Returns `None` when the rescaled value does not fit in an i64.
    pub fn from_scaled(answer: i128, decimals: u32) -> Option<Self> {
        let scaled = if decimals >= Self::DECIMALS {
            let divisor = 10i128.checked_pow(decimals - Self::DECIMALS)?;
            answer / divisor
        } else {
            let factor = 10i128.checked_pow(Self::DECIMALS - decimals)?;
            answer.checked_mul(factor)?
        };
        i64::try_from(scaled).ok().map(Price)
    }

    /// Value rounded to cents, the precision subscribers see.
    pub fn to_display(&self) -> f64 {
        let cents_unit = Self::MULTIPLIER / 100;
        let half = cents_unit / 2;
        let cents = if self.0 >= 0 {
            self.0.saturating_add(half) / cents_unit
        } else {
            self.0.saturating_sub(half) / cents_unit
        };
        cents as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, other: Price) -> Price {
        Price(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_display())
    }
}
