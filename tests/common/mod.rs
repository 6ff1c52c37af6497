#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

use fx_signal_bot::bot::SignalBot;
use fx_signal_bot::config::Config;
use fx_signal_bot::core::clock::ManualClock;
use fx_signal_bot::feed::ReplayFeed;
use fx_signal_bot::models::{
    Candle, CandleSeries, Direction, RiskLevel, SignalQuality, Timeframe, Volatility,
};
use fx_signal_bot::notify::{Notifier, Recommendation};
use fx_signal_bot::strategies::scorer::{ScoringMode, SignalScorer};
use fx_signal_bot::strategies::signals::SignalCandidate;
use fx_signal_bot::trading::risk_manager::{RiskManager, SharedRiskManager};
use fx_signal_bot::trading::settings::RiskSettings;
use fx_signal_bot::trading::store::MemoryStore;

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(base_time()))
}

/// n identical one-minute bars at `price`.
pub fn flat_series(n: usize, price: f64) -> CandleSeries {
    let candles: Vec<Candle> = (0..n)
        .map(|i| Candle {
            timestamp: base_time() + Duration::minutes(i as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 100.0,
        })
        .collect();
    CandleSeries::new(candles)
}

/// Accelerating uptrend: two steps up, one smaller step back, volume rising.
pub fn rising_series(n: usize, start: f64) -> CandleSeries {
    let mut prev = start;
    let candles: Vec<Candle> = (0..n)
        .map(|i| {
            let growth = (2.2 * i as f64 / n as f64).exp();
            let change = if i % 3 < 2 {
                0.0003 * growth
            } else {
                -0.0004 * growth
            };
            let open = prev;
            let close = prev + change;
            prev = close;
            Candle {
                timestamp: base_time() + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 0.0001,
                low: open.min(close) - 0.0001,
                close,
                volume: 100.0 + i as f64,
            }
        })
        .collect();
    CandleSeries::new(candles)
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
        reasons: vec!["EMA 12/26/50 aligned up".to_string()],
        risk_level,
        expected_win_rate,
        entry_price: 1.1,
        target_price: 1.1015,
        stop_loss: 1.0995,
        volatility: Volatility::Medium,
        score: 70.0,
    }
}

/// Keeps every recommendation it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Recommendation>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recommendation: &Recommendation) -> Result<()> {
        self.sent.lock().unwrap().push(recommendation.clone());
        Ok(())
    }
}

pub fn manager(clock: Arc<ManualClock>, settings: RiskSettings) -> SharedRiskManager {
    RiskManager::new(settings, clock, Arc::new(MemoryStore::new()))
        .unwrap()
        .shared()
}

pub fn test_config(symbols: &[&str]) -> Config {
    Config {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..Config::default()
    }
}

pub struct Harness {
    pub bot: SignalBot,
    pub clock: Arc<ManualClock>,
    pub feed: Arc<ReplayFeed>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(symbols: &[&str], feed: ReplayFeed, mode: ScoringMode) -> Harness {
    let clock = manual_clock();
    let feed = Arc::new(feed);
    let notifier = Arc::new(RecordingNotifier::default());
    let bot = SignalBot::new(
        test_config(symbols),
        feed.clone(),
        SignalScorer::new(mode),
        manager(clock.clone(), RiskSettings::default()),
        notifier.clone(),
    );
    Harness {
        bot,
        clock,
        feed,
        notifier,
    }
}
