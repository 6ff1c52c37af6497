use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One price observation (OHLCV bar).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// A bar where only the close is known (flat-price feeds).
    pub fn from_close(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

}

/// Ordered price history, oldest first, strictly increasing by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// Sorts by timestamp and drops duplicate timestamps (first one wins).
    pub fn normalized(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self { candles }
    }

    /// Builds a series from closing prices only, one bar per `interval`,
    /// with the last bar stamped at `last_ts`.
    pub fn from_closes(closes: &[f64], last_ts: DateTime<Utc>, interval: Duration) -> Self {
        let n = closes.len() as i32;
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::from_close(last_ts - interval * (n - 1 - i as i32), c))
            .collect();
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn tail(&self, n: usize) -> CandleSeries {
        let start = self.candles.len().saturating_sub(n);
        CandleSeries::new(self.candles[start..].to_vec())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.candles
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }
}

impl std::ops::Index<usize> for CandleSeries {
    type Output = Candle;
    fn index(&self, index: usize) -> &Self::Output {
        &self.candles[index]
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;
    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{base_time, make_candles};

    #[test]
    fn series_accessors() {
        let s = make_candles(&[
            (1.10, 1.12, 1.09, 1.11),
            (1.11, 1.13, 1.10, 1.12),
            (1.12, 1.14, 1.11, 1.13),
        ]);
        assert_eq!(s.len(), 3);
        assert!(s.is_strictly_increasing());
        assert_eq!(s.closes(), vec![1.11, 1.12, 1.13]);
        assert_eq!(s.tail(2).len(), 2);
        assert!((s.tail(2)[0].open - 1.11).abs() < 1e-12);
        assert_eq!(s.last_close(), Some(1.13));
    }

    #[test]
    fn from_closes_stamps_backwards_from_last() {
        let last = base_time();
        let s = CandleSeries::from_closes(&[1.0, 2.0, 3.0], last, Duration::minutes(1));
        assert_eq!(s.len(), 3);
        assert_eq!(s[2].timestamp, last);
        assert_eq!(s[0].timestamp, last - Duration::minutes(2));
        assert!(s.is_strictly_increasing());
        assert_eq!(s[1].high, 2.0);
    }

    #[test]
    fn normalized_sorts_and_dedups() {
        let t = base_time();
        let s = CandleSeries::normalized(vec![
            Candle::from_close(t + Duration::minutes(2), 3.0),
            Candle::from_close(t, 1.0),
            Candle::from_close(t + Duration::minutes(2), 9.0),
            Candle::from_close(t + Duration::minutes(1), 2.0),
        ]);
        assert_eq!(s.closes(), vec![1.0, 2.0, 3.0]);
        assert!(s.is_strictly_increasing());
    }
}
