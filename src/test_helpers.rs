use chrono::{DateTime, Duration, Utc};

use crate::models::{
    Candle, CandleSeries, Direction, RiskLevel, SignalQuality, Timeframe, Volatility,
};
use crate::strategies::signals::SignalCandidate;

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

/// n identical bars at `price`.
pub fn flat_series(n: usize, price: f64) -> CandleSeries {
    make_candles(&vec![(price, price, price, price); n])
}

/// Two steps with the trend, one step against it, with step size growing
/// exponentially and volume rising bar by bar.
fn zigzag_series(n: usize, start: f64, direction: Direction) -> CandleSeries {
    let base = base_time();
    let (step_with, step_against, pad) = (0.0003, 0.0004, 0.0001);
    let sign = direction.sign();

    let mut prev = start;
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let growth = (2.2 * i as f64 / n as f64).exp();
            let change = if i % 3 < 2 {
                sign * step_with * growth
            } else {
                -sign * step_against * growth
            };
            let open = prev;
            let close = prev + change;
            prev = close;
            Candle {
                timestamp: base + Duration::minutes(i as i64),
                open,
                high: open.max(close) + pad,
                low: open.min(close) - pad,
                close,
                volume: 100.0 + i as f64,
            }
        })
        .collect();

    CandleSeries::new(candles)
}

/// Accelerating uptrend with pullbacks: RSI near 60, every EMA stacked bullish.
pub fn rising_series(n: usize, start: f64) -> CandleSeries {
    zigzag_series(n, start, Direction::Call)
}

pub fn falling_series(n: usize, start: f64) -> CandleSeries {
    zigzag_series(n, start, Direction::Put)
}

pub fn make_candidate(
    symbol: &str,
    confidence: f64,
    risk_level: RiskLevel,
    expected_win_rate: f64,
) -> SignalCandidate {
    SignalCandidate {
        symbol: symbol.to_string(),
        direction: Direction::Call,
        confidence,
        strength: 70.0,
        quality: SignalQuality::Good,
        timeframe: Timeframe::M3,
        reasons: vec![
            "EMA 12/26/50 aligned up".to_string(),
            "MACD bullish crossover".to_string(),
            "Price rising".to_string(),
        ],
        risk_level,
        expected_win_rate,
        entry_price: 1.1,
        target_price: 1.1015,
        stop_loss: 1.0995,
        volatility: Volatility::Medium,
        score: 70.0,
    }
}
