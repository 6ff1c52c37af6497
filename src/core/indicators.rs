//! Pure technical indicator functions.
//!
//! Every function takes plain price slices (oldest first) and returns the
//! value at the latest bar. When the history is shorter than the indicator's
//! period the function returns a neutral default instead of failing.

use serde::{Deserialize, Serialize};

use crate::models::{BandPosition, StochSignal, Trend, VolumeProfile, VolumeTrend};

/// Fraction of the band width within which price counts as touching a band.
const BAND_TOUCH_TOLERANCE: f64 = 0.02;
const VOLUME_PROFILE_PERIOD: usize = 20;
const VOLUME_TREND_RECENT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: Trend,
}

impl Macd {
    pub fn neutral() -> Self {
        Self {
            line: 0.0,
            signal: 0.0,
            histogram: 0.0,
            trend: Trend::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
    pub signal: StochSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Band width as a percentage of the middle band.
    pub bandwidth: f64,
    pub position: BandPosition,
}

pub fn sma(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return prices.last().copied().unwrap_or(0.0);
    }
    let window = &prices[prices.len() - period..];
    window.iter().sum::<f64>() / period as f64
}

/// Population standard deviation of the last `period` values.
pub fn std_dev(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.0;
    }
    let window = &prices[prices.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / period as f64;
    variance.sqrt()
}

/// EMA value at every bar, seeded with the first price.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    let Some(&first) = prices.first() else {
        return out;
    };
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = first;
    out.push(ema);
    for &price in &prices[1..] {
        ema = price * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

/// Latest EMA; falls back to the latest price when history is shorter than `period`.
pub fn ema(prices: &[f64], period: usize) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    if prices.len() < period {
        return prices[prices.len() - 1];
    }
    ema_series(prices, period).last().copied().unwrap_or(0.0)
}

/// Wilder RSI. Returns 50 with fewer than `period + 1` prices and for a
/// perfectly flat window.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    for &change in &changes[period..] {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

fn stochastic_k_at(highs: &[f64], lows: &[f64], closes: &[f64], index: usize, period: usize) -> f64 {
    let start = (index + 1).saturating_sub(period);
    let highest = highs[start..=index].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = lows[start..=index].iter().copied().fold(f64::INFINITY, f64::min);
    let range = highest - lowest;
    if range <= 0.0 {
        return 50.0;
    }
    (closes[index] - lowest) / range * 100.0
}

pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Stochastic {
    let n = closes.len();
    if k_period == 0 || d_period == 0 || n < k_period || highs.len() != n || lows.len() != n {
        return Stochastic {
            k: 50.0,
            d: 50.0,
            signal: StochSignal::Neutral,
        };
    }

    let k = stochastic_k_at(highs, lows, closes, n - 1, k_period);

    let first = (k_period - 1).max(n.saturating_sub(d_period));
    let k_values: Vec<f64> = (first..n)
        .map(|i| stochastic_k_at(highs, lows, closes, i, k_period))
        .collect();
    let d = k_values.iter().sum::<f64>() / k_values.len() as f64;

    let signal = if k < 20.0 && d < 20.0 && k > d {
        StochSignal::Buy
    } else if k > 80.0 && d > 80.0 && k < d {
        StochSignal::Sell
    } else {
        StochSignal::Neutral
    };

    Stochastic { k, d, signal }
}

/// Williams %R in [-100, 0]; -50 when undefined.
pub fn williams_r(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = closes.len();
    if period == 0 || n < period || highs.len() != n || lows.len() != n {
        return -50.0;
    }
    let highest = highs[n - period..].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = lows[n - period..].iter().copied().fold(f64::INFINITY, f64::min);
    let range = highest - lowest;
    if range <= 0.0 {
        return -50.0;
    }
    (highest - closes[n - 1]) / range * -100.0
}

/// MACD line, EMA-smoothed signal line and histogram.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    if fast == 0 || slow <= fast || prices.len() < slow + signal_period {
        return Macd::neutral();
    }

    let fast_series = ema_series(prices, fast);
    let slow_series = ema_series(prices, slow);
    let line_series: Vec<f64> = (slow..prices.len())
        .map(|i| fast_series[i] - slow_series[i])
        .collect();

    let line = fast_series[prices.len() - 1] - slow_series[prices.len() - 1];
    let signal = ema(&line_series, signal_period);
    let histogram = line - signal;

    let trend = if line > signal && histogram > 0.0 {
        Trend::Bullish
    } else if line < signal && histogram < 0.0 {
        Trend::Bearish
    } else {
        Trend::Neutral
    };

    Macd {
        line,
        signal,
        histogram,
        trend,
    }
}

pub fn bollinger(prices: &[f64], current_price: f64, period: usize, multiplier: f64) -> Bollinger {
    if period == 0 || prices.len() < period {
        let middle = prices.last().copied().unwrap_or(current_price);
        return Bollinger {
            upper: middle,
            middle,
            lower: middle,
            bandwidth: 0.0,
            position: BandPosition::Middle,
        };
    }

    let middle = sma(prices, period);
    let deviation = std_dev(prices, period) * multiplier;
    let upper = middle + deviation;
    let lower = middle - deviation;
    let bandwidth = if middle != 0.0 {
        (upper - lower) / middle * 100.0
    } else {
        0.0
    };

    let width = upper - lower;
    let tolerance = width * BAND_TOUCH_TOLERANCE;
    let position = if width <= 0.0 {
        BandPosition::Middle
    } else if current_price >= upper - tolerance {
        BandPosition::Upper
    } else if current_price <= lower + tolerance {
        BandPosition::Lower
    } else {
        BandPosition::Middle
    };

    Bollinger {
        upper,
        middle,
        lower,
        bandwidth,
        position,
    }
}

/// Simple average of the true range over the last `period` bars.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> f64 {
    let n = closes.len();
    if period == 0 || n < period + 1 || highs.len() != n || lows.len() != n {
        return 0.0;
    }
    let true_ranges: Vec<f64> = (1..n)
        .map(|i| {
            (highs[i] - lows[i])
                .max((highs[i] - closes[i - 1]).abs())
                .max((lows[i] - closes[i - 1]).abs())
        })
        .collect();
    sma(&true_ranges, period)
}

pub fn obv(closes: &[f64], volumes: &[f64]) -> f64 {
    closes
        .windows(2)
        .zip(volumes.iter().skip(1))
        .fold(0.0, |acc, (w, &vol)| {
            if w[1] > w[0] {
                acc + vol
            } else if w[1] < w[0] {
                acc - vol
            } else {
                acc
            }
        })
}

/// Latest volume against its 20-bar average.
pub fn volume_profile(volumes: &[f64]) -> VolumeProfile {
    if volumes.len() < VOLUME_PROFILE_PERIOD {
        return VolumeProfile::Normal;
    }
    let average = sma(volumes, VOLUME_PROFILE_PERIOD);
    if average <= 0.0 {
        return VolumeProfile::Normal;
    }
    let ratio = volumes[volumes.len() - 1] / average;
    if ratio >= 1.5 {
        VolumeProfile::High
    } else if ratio <= 0.5 {
        VolumeProfile::Low
    } else {
        VolumeProfile::Normal
    }
}

/// Last five bars of volume against the whole window.
pub fn volume_trend(volumes: &[f64]) -> VolumeTrend {
    if volumes.len() < VOLUME_TREND_RECENT {
        return VolumeTrend::Stable;
    }
    let total = volumes.iter().sum::<f64>() / volumes.len() as f64;
    if total <= 0.0 {
        return VolumeTrend::Stable;
    }
    let recent = sma(volumes, VOLUME_TREND_RECENT);
    if recent > total * 1.1 {
        VolumeTrend::Increasing
    } else if recent < total * 0.9 {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Stable
    }
}

/// Percentage rate of change over `lookback` bars.
pub fn momentum(closes: &[f64], lookback: usize) -> f64 {
    let n = closes.len();
    if lookback == 0 || n <= lookback {
        return 0.0;
    }
    let base = closes[n - 1 - lookback];
    if base == 0.0 {
        return 0.0;
    }
    (closes[n - 1] - base) / base * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.1 + i as f64 * 0.0001).collect()
    }

    #[test]
    fn constant_series_averages_equal_constant() {
        let prices = vec![1.1; 250];
        for period in [12, 20, 26, 50, 200] {
            assert!((ema(&prices, period) - 1.1).abs() < 1e-12);
            assert!((sma(&prices, period) - 1.1).abs() < 1e-12);
        }
    }

    #[test]
    fn sma_basic_and_fallback() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((sma(&data, 3) - 4.0).abs() < 1e-12);
        assert_eq!(sma(&data[..2], 5), 2.0);
        assert_eq!(sma(&[], 5), 0.0);
    }

    #[test]
    fn ema_falls_back_to_latest_price() {
        assert_eq!(ema(&[1.0, 2.0, 3.0], 12), 3.0);
        assert_eq!(ema(&[], 12), 0.0);
    }

    #[test]
    fn ema_seeded_with_first_price() {
        // k = 2/3 for period 2
        let e = ema(&[1.0, 4.0], 2);
        assert!((e - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rsi_insufficient_data_is_neutral() {
        assert_eq!(rsi(&rising(14), 14), 50.0);
        assert_eq!(rsi(&[], 14), 50.0);
    }

    #[test]
    fn rsi_flat_is_neutral() {
        assert_eq!(rsi(&vec![1.1; 100], 14), 50.0);
    }

    #[test]
    fn rsi_extremes() {
        assert_eq!(rsi(&rising(60), 14), 100.0);
        let falling: Vec<f64> = rising(60).into_iter().rev().collect();
        assert!(rsi(&falling, 14).abs() < 1e-9);
    }

    #[test]
    fn rsi_stays_in_bounds() {
        let prices: Vec<f64> = (0..300)
            .map(|i| 1.1 + ((i as f64) * 0.37).sin() * 0.002 + (i % 7) as f64 * 0.0001)
            .collect();
        for end in 15..prices.len() {
            let v = rsi(&prices[..end], 14);
            assert!((0.0..=100.0).contains(&v), "rsi {} out of range", v);
        }
    }

    #[test]
    fn rsi_balanced_moves_near_fifty() {
        let prices: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 1.1 } else { 1.101 })
            .collect();
        let v = rsi(&prices, 14);
        assert!((v - 50.0).abs() < 5.0, "rsi {}", v);
    }

    #[test]
    fn macd_needs_slow_plus_signal_bars() {
        assert_eq!(macd(&rising(34), 12, 26, 9), Macd::neutral());
        let m = macd(&rising(35), 12, 26, 9);
        assert!(m.line > 0.0);
    }

    #[test]
    fn macd_rising_series_is_bullish() {
        let m = macd(&rising(120), 12, 26, 9);
        assert!(m.line > 0.0);
        assert!(m.line > m.signal);
        assert!(m.histogram > 0.0);
        assert_eq!(m.trend, Trend::Bullish);
    }

    #[test]
    fn macd_falling_series_is_bearish() {
        let falling: Vec<f64> = rising(120).into_iter().rev().collect();
        let m = macd(&falling, 12, 26, 9);
        assert!(m.histogram < 0.0);
        assert_eq!(m.trend, Trend::Bearish);
    }

    #[test]
    fn bollinger_bands_are_ordered() {
        let prices: Vec<f64> = (0..60).map(|i| 1.1 + ((i as f64) * 0.5).cos() * 0.001).collect();
        let last = *prices.last().unwrap();
        let b = bollinger(&prices, last, 20, 2.0);
        assert!(b.lower <= b.middle && b.middle <= b.upper);
        assert!(b.bandwidth > 0.0);

        let short = bollinger(&prices[..5], last, 20, 2.0);
        assert!(short.lower <= short.middle && short.middle <= short.upper);
        assert_eq!(short.position, BandPosition::Middle);
    }

    #[test]
    fn bollinger_flat_series_sits_in_middle() {
        let b = bollinger(&vec![1.1; 40], 1.1, 20, 2.0);
        assert_eq!(b.position, BandPosition::Middle);
        assert_eq!(b.bandwidth, 0.0);
    }

    #[test]
    fn bollinger_touches() {
        let prices: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { 1.2 }).collect();
        // middle 1.1, std 0.1, bands 0.9 / 1.3
        let up = bollinger(&prices, 1.3, 20, 2.0);
        assert_eq!(up.position, BandPosition::Upper);
        let down = bollinger(&prices, 0.9, 20, 2.0);
        assert_eq!(down.position, BandPosition::Lower);
        let mid = bollinger(&prices, 1.1, 20, 2.0);
        assert_eq!(mid.position, BandPosition::Middle);
    }

    #[test]
    fn bollinger_touch_tolerance_follows_band_width() {
        let prices: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { 1.2 }).collect();
        // width 0.4, so a touch means within 0.008 of a band
        let position = |price| bollinger(&prices, price, 20, 2.0).position;
        assert_eq!(position(1.28), BandPosition::Middle);
        assert_eq!(position(1.293), BandPosition::Upper);
        assert_eq!(position(0.907), BandPosition::Lower);
        assert_eq!(position(0.91), BandPosition::Middle);
    }

    #[test]
    fn bollinger_forex_scale_midband_is_middle() {
        let prices: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 1.099 } else { 1.101 }).collect();
        let b = bollinger(&prices, 1.1, 20, 2.0);
        assert!((b.upper - 1.102).abs() < 1e-9);
        assert_eq!(b.position, BandPosition::Middle);
        assert_eq!(bollinger(&prices, 1.10197, 20, 2.0).position, BandPosition::Upper);
    }

    #[test]
    fn stochastic_bounds_and_flat_default() {
        let closes = rising(40);
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.0002).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 0.0002).collect();
        let s = stochastic(&highs, &lows, &closes, 14, 3);
        assert!((0.0..=100.0).contains(&s.k));
        assert!(s.k > 80.0);

        let flat = vec![1.1; 40];
        let f = stochastic(&flat, &flat, &flat, 14, 3);
        assert_eq!(f.k, 50.0);
        assert_eq!(f.signal, StochSignal::Neutral);
    }

    #[test]
    fn stochastic_insufficient_data() {
        let s = stochastic(&[1.0; 5], &[1.0; 5], &[1.0; 5], 14, 3);
        assert_eq!((s.k, s.d), (50.0, 50.0));
    }

    #[test]
    fn williams_r_range() {
        let closes = rising(30);
        let highs: Vec<f64> = closes.iter().map(|c| c + 0.0002).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 0.0002).collect();
        let w = williams_r(&highs, &lows, &closes, 14);
        assert!((-100.0..=0.0).contains(&w));
        assert!(w > -20.0);
        assert_eq!(williams_r(&[1.0], &[1.0], &[1.0], 14), -50.0);
    }

    #[test]
    fn atr_constant_range() {
        let closes = vec![1.1; 30];
        let highs = vec![1.1010; 30];
        let lows = vec![1.0990; 30];
        assert!((atr(&highs, &lows, &closes, 14) - 0.0020).abs() < 1e-9);
        assert_eq!(atr(&highs[..10], &lows[..10], &closes[..10], 14), 0.0);
    }

    #[test]
    fn obv_accumulates_by_direction() {
        let closes = [1.0, 1.1, 1.05, 1.05, 1.2];
        let volumes = [10.0, 20.0, 5.0, 7.0, 3.0];
        assert!((obv(&closes, &volumes) - (20.0 - 5.0 + 3.0)).abs() < 1e-12);
    }

    #[test]
    fn volume_classifications() {
        let mut volumes = vec![100.0; 30];
        assert_eq!(volume_profile(&volumes), VolumeProfile::Normal);
        assert_eq!(volume_trend(&volumes), VolumeTrend::Stable);
        volumes[29] = 400.0;
        assert_eq!(volume_profile(&volumes), VolumeProfile::High);
        assert_eq!(volume_trend(&volumes), VolumeTrend::Increasing);
        volumes[29] = 10.0;
        assert_eq!(volume_profile(&volumes), VolumeProfile::Low);
        assert_eq!(volume_profile(&[0.0; 30]), VolumeProfile::Normal);
    }

    #[test]
    fn momentum_rate_of_change() {
        let closes = [100.0, 101.0, 102.0, 110.0];
        assert!((momentum(&closes, 3) - 10.0).abs() < 1e-12);
        assert_eq!(momentum(&closes, 4), 0.0);
    }
}
