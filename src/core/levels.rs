use serde::{Deserialize, Serialize};

use crate::models::CandleSeries;

/// Bars on each side a swing high/low must dominate.
pub const SWING_WINDOW: usize = 5;
pub const MAX_LEVELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotPoints {
    /// Classic floor-trader pivots from one completed bar.
    pub fn classic(high: f64, low: f64, close: f64) -> Self {
        let pivot = (high + low + close) / 3.0;
        let range = high - low;
        Self {
            pivot,
            r1: 2.0 * pivot - low,
            r2: pivot + range,
            r3: high + 2.0 * (pivot - low),
            s1: 2.0 * pivot - high,
            s2: pivot - range,
            s3: low - 2.0 * (high - pivot),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    /// Nearest support levels below price, highest first.
    pub support: Vec<f64>,
    /// Nearest resistance levels above price, lowest first.
    pub resistance: Vec<f64>,
}

impl KeyLevels {
    /// True when price is within `tolerance` (fraction of price) of any support level.
    pub fn near_support(&self, price: f64, tolerance: f64) -> bool {
        price > 0.0 && self.support.iter().any(|s| (price - s).abs() / price < tolerance)
    }

    pub fn near_resistance(&self, price: f64, tolerance: f64) -> bool {
        price > 0.0 && self.resistance.iter().any(|r| (price - r).abs() / price < tolerance)
    }
}

/// Swing highs/lows that strictly dominate `SWING_WINDOW` bars on both sides.
pub fn find_key_levels(series: &CandleSeries, current_price: f64) -> KeyLevels {
    let bars = series.as_slice();
    let n = bars.len();
    if n < 2 * SWING_WINDOW + 1 {
        return KeyLevels::default();
    }

    let mut support = Vec::new();
    let mut resistance = Vec::new();

    for i in SWING_WINDOW..n - SWING_WINDOW {
        let current = &bars[i];
        let neighbours = bars[i - SWING_WINDOW..i]
            .iter()
            .chain(bars[i + 1..=i + SWING_WINDOW].iter());

        let (mut is_high, mut is_low) = (true, true);
        for other in neighbours {
            is_high &= other.high < current.high;
            is_low &= other.low > current.low;
        }

        if is_high && current.high >= current_price {
            resistance.push(current.high);
        }
        if is_low && current.low <= current_price {
            support.push(current.low);
        }
    }

    support.sort_by(|a, b| b.total_cmp(a));
    support.dedup();
    support.truncate(MAX_LEVELS);
    resistance.sort_by(|a, b| a.total_cmp(b));
    resistance.dedup();
    resistance.truncate(MAX_LEVELS);

    KeyLevels {
        support,
        resistance,
    }
}

/// Pivots from the most recent bar, or all-equal levels at `fallback` for an empty series.
pub fn pivot_points(series: &CandleSeries, fallback: f64) -> PivotPoints {
    match series.last() {
        Some(bar) => PivotPoints::classic(bar.high, bar.low, bar.close),
        None => PivotPoints::classic(fallback, fallback, fallback),
    }
}
