use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Tolerance under which two OHLCV fields count as unchanged.
pub const BAR_CHANGE_EPSILON: f64 = 1e-4;

/// Domain entity - one OHLCV candle, timestamped in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// Finite prices, finite non-negative volume and a positive timestamp.
    pub fn is_valid(&self) -> bool {
        self.time > 0
            && [self.open, self.high, self.low, self.close].iter().all(|v| v.is_finite())
            && self.volume.is_finite()
            && self.volume >= 0.0
    }

    /// True when any OHLCV field moved by more than the tolerance.
    pub fn differs_from(&self, other: &Bar) -> bool {
        let pairs = [
            (self.open, other.open),
            (self.high, other.high),
            (self.low, other.low),
            (self.close, other.close),
            (self.volume, other.volume),
        ];
        pairs.iter().any(|(a, b)| (a - b).abs() > BAR_CHANGE_EPSILON)
    }
}
