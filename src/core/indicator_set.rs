use serde::{Deserialize, Serialize};

use crate::core::indicators::{self, Bollinger, Macd, Stochastic};
use crate::core::levels::{self, KeyLevels, PivotPoints};
use crate::models::{
    CandleSeries, OverallTrend, StochSignal, Trend, Volatility, VolumeProfile, VolumeTrend,
};

pub const RSI_PERIOD: usize = 14;
pub const STOCH_K_PERIOD: usize = 14;
pub const STOCH_D_PERIOD: usize = 3;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;
pub const WILLIAMS_PERIOD: usize = 14;
pub const MOMENTUM_LOOKBACK: usize = 10;

/// Histogram size (basis points of price) that counts as a real MACD push.
pub const MACD_STRONG_BP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emas {
    pub ema12: f64,
    pub ema26: f64,
    pub ema50: f64,
    pub ema200: f64,
}

impl Emas {
    pub fn bullish_stack(&self) -> bool {
        self.ema12 > self.ema26 && self.ema26 > self.ema50
    }

    pub fn bearish_stack(&self) -> bool {
        self.ema12 < self.ema26 && self.ema26 < self.ema50
    }

    pub fn fully_bullish(&self) -> bool {
        self.bullish_stack() && self.ema50 > self.ema200
    }

    pub fn fully_bearish(&self) -> bool {
        self.bearish_stack() && self.ema50 < self.ema200
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smas {
    pub sma20: f64,
    pub sma50: f64,
    pub sma200: f64,
}

/// Everything the scorer knows about one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub price: f64,
    pub bars: usize,
    pub rsi: f64,
    pub stochastic: Stochastic,
    pub williams_r: f64,
    pub macd: Macd,
    pub ema: Emas,
    pub sma: Smas,
    pub bollinger: Bollinger,
    pub atr: f64,
    pub obv: f64,
    pub volume_profile: VolumeProfile,
    pub volume_trend: VolumeTrend,
    /// 10-bar rate of change in percent, now and one bar earlier.
    pub momentum: f64,
    pub prev_momentum: f64,
    pub levels: KeyLevels,
    pub pivots: PivotPoints,
    pub overall_trend: OverallTrend,
    pub volatility: Volatility,
    pub strength: f64,
}

impl IndicatorSet {
    /// MACD histogram in basis points of price.
    pub fn macd_histogram_bp(&self) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        self.macd.histogram / self.price * 10_000.0
    }

    /// ATR as a percentage of price.
    pub fn atr_pct(&self) -> f64 {
        if self.price <= 0.0 {
            return 0.0;
        }
        self.atr / self.price * 100.0
    }

    pub fn momentum_accelerating(&self) -> bool {
        self.momentum.abs() > self.prev_momentum.abs() && self.momentum * self.prev_momentum >= 0.0
    }
}

pub fn compute_indicators(series: &CandleSeries, current_price: f64) -> IndicatorSet {
    let closes = series.closes();
    let highs = series.highs();
    let lows = series.lows();
    let volumes = series.volumes();

    let rsi = indicators::rsi(&closes, RSI_PERIOD);
    let stochastic =
        indicators::stochastic(&highs, &lows, &closes, STOCH_K_PERIOD, STOCH_D_PERIOD);
    let williams_r = indicators::williams_r(&highs, &lows, &closes, WILLIAMS_PERIOD);
    let macd = indicators::macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let ema = Emas {
        ema12: indicators::ema(&closes, 12),
        ema26: indicators::ema(&closes, 26),
        ema50: indicators::ema(&closes, 50),
        ema200: indicators::ema(&closes, 200),
    };
    let sma = Smas {
        sma20: indicators::sma(&closes, 20),
        sma50: indicators::sma(&closes, 50),
        sma200: indicators::sma(&closes, 200),
    };
    let bollinger =
        indicators::bollinger(&closes, current_price, BOLLINGER_PERIOD, BOLLINGER_MULTIPLIER);
    let atr = indicators::atr(&highs, &lows, &closes, ATR_PERIOD);
    let obv = indicators::obv(&closes, &volumes);
    let momentum = indicators::momentum(&closes, MOMENTUM_LOOKBACK);
    let prev_momentum = match closes.split_last() {
        Some((_, earlier)) => indicators::momentum(earlier, MOMENTUM_LOOKBACK),
        None => 0.0,
    };

    let overall_trend = overall_trend(&ema, &sma, &macd, rsi);
    let macd_bp = if current_price > 0.0 {
        macd.histogram / current_price * 10_000.0
    } else {
        0.0
    };
    let strength = trend_strength(&ema, macd_bp, rsi, &stochastic);
    let atr_pct = if current_price > 0.0 {
        atr / current_price * 100.0
    } else {
        0.0
    };

    IndicatorSet {
        price: current_price,
        bars: series.len(),
        rsi,
        stochastic,
        williams_r,
        macd,
        ema,
        sma,
        bollinger,
        atr,
        obv,
        volume_profile: indicators::volume_profile(&volumes),
        volume_trend: indicators::volume_trend(&volumes),
        momentum,
        prev_momentum,
        levels: levels::find_key_levels(series, current_price),
        pivots: levels::pivot_points(series, current_price),
        overall_trend,
        volatility: classify_volatility(atr_pct, bollinger.bandwidth),
        strength,
    }
}

/// Net vote of EMA stack, SMA cross, MACD trend and RSI side.
pub fn overall_trend(ema: &Emas, sma: &Smas, macd: &Macd, rsi: f64) -> OverallTrend {
    let mut bullish = 0.0;
    let mut bearish = 0.0;

    if ema.bullish_stack() {
        bullish += 2.0;
    } else if ema.bearish_stack() {
        bearish += 2.0;
    }

    if sma.sma20 > sma.sma50 {
        bullish += 0.5;
    } else if sma.sma20 < sma.sma50 {
        bearish += 0.5;
    }

    match macd.trend {
        Trend::Bullish => bullish += 1.0,
        Trend::Bearish => bearish += 1.0,
        Trend::Neutral => {}
    }

    if rsi > 50.0 {
        bullish += 1.0;
    } else if rsi < 50.0 {
        bearish += 1.0;
    }

    let diff = bullish - bearish;
    if diff >= 3.0 {
        OverallTrend::StrongBullish
    } else if diff >= 1.0 {
        OverallTrend::Bullish
    } else if diff <= -3.0 {
        OverallTrend::StrongBearish
    } else if diff <= -1.0 {
        OverallTrend::Bearish
    } else {
        OverallTrend::Neutral
    }
}

/// Five-level class from ATR (% of price) and Bollinger bandwidth.
pub fn classify_volatility(atr_pct: f64, bandwidth: f64) -> Volatility {
    let score = atr_pct + bandwidth / 2.0;
    if score < 0.5 {
        Volatility::VeryLow
    } else if score < 1.0 {
        Volatility::Low
    } else if score < 2.0 {
        Volatility::Medium
    } else if score < 3.5 {
        Volatility::High
    } else {
        Volatility::VeryHigh
    }
}

/// 0-100 strength of the prevailing move.
pub fn trend_strength(ema: &Emas, macd_histogram_bp: f64, rsi: f64, stochastic: &Stochastic) -> f64 {
    let mut strength = 0.0;

    if ema.fully_bullish() || ema.fully_bearish() {
        strength += 30.0;
    } else if ema.bullish_stack() || ema.bearish_stack() {
        strength += 15.0;
    }

    if macd_histogram_bp.abs() >= MACD_STRONG_BP {
        strength += 25.0;
    }

    if !(30.0..=70.0).contains(&rsi) {
        strength += 20.0;
    } else if (40.0..=60.0).contains(&rsi) {
        strength += 10.0;
    }

    if stochastic.signal != StochSignal::Neutral {
        strength += 15.0;
    }

    f64::min(100.0, strength)
}
