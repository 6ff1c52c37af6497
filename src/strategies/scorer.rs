use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::indicator_set::{compute_indicators, IndicatorSet};
use crate::models::{
    CandleSeries, Direction, RiskLevel, SignalQuality, Timeframe, Volatility, VolumeProfile,
};
use crate::strategies::rules::{evaluate_rules, ScoringRule, SCORING_RULES};
use crate::strategies::signals::SignalCandidate;

pub const MAX_CONFIDENCE: f64 = 95.0;
/// Scale the precise path maps its rule score onto.
pub const COMPOSITE_SCALE: f64 = 120.0;
const TARGET_ATR_MULTIPLE: f64 = 1.5;
const STOP_ATR_MULTIPLE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Rule score is the confidence.
    Simplified,
    /// Rule score, trend strength and market conditions blended into a composite.
    Precise,
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplified" | "simple" => Ok(ScoringMode::Simplified),
            "precise" => Ok(ScoringMode::Precise),
            other => Err(format!("unknown scoring mode '{}'", other)),
        }
    }
}

/// Thresholds a winning side must clear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerParams {
    pub min_bars: usize,
    pub min_score: f64,
    pub min_reasons: usize,
    pub min_strength: f64,
    pub min_confidence: f64,
}

impl ScoringMode {
    pub fn params(self) -> ScorerParams {
        match self {
            ScoringMode::Simplified => ScorerParams {
                min_bars: 100,
                min_score: 60.0,
                min_reasons: 3,
                min_strength: 20.0,
                min_confidence: 60.0,
            },
            ScoringMode::Precise => ScorerParams {
                min_bars: 200,
                min_score: 60.0,
                min_reasons: 3,
                min_strength: 40.0,
                min_confidence: 75.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalScorer {
    mode: ScoringMode,
    params: ScorerParams,
    rules: &'static [ScoringRule],
}

impl SignalScorer {
    pub fn new(mode: ScoringMode) -> Self {
        Self {
            mode,
            params: mode.params(),
            rules: SCORING_RULES,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.params.min_confidence = min_confidence;
        self
    }

    pub fn mode(&self) -> ScoringMode {
        self.mode
    }

    pub fn params(&self) -> &ScorerParams {
        &self.params
    }

    pub fn min_bars(&self) -> usize {
        self.params.min_bars
    }

    /// Computes indicators for `series` and scores them.
    pub fn evaluate_series(
        &self,
        series: &CandleSeries,
        current_price: f64,
        symbol: &str,
    ) -> Option<SignalCandidate> {
        if series.len() < self.params.min_bars {
            return None;
        }
        let set = compute_indicators(series, current_price);
        self.score(&set, current_price, symbol)
    }

    pub fn score(
        &self,
        set: &IndicatorSet,
        current_price: f64,
        symbol: &str,
    ) -> Option<SignalCandidate> {
        if set.bars < self.params.min_bars || current_price <= 0.0 {
            return None;
        }

        let tally = evaluate_rules(self.rules, set);
        let direction = tally.leader()?;
        let side = tally.side(direction);

        if side.score < self.params.min_score
            || side.reasons.len() < self.params.min_reasons
            || set.strength < self.params.min_strength
        {
            return None;
        }

        let confidence = match self.mode {
            ScoringMode::Simplified => side.score.min(MAX_CONFIDENCE),
            ScoringMode::Precise => composite_confidence(side.score, set),
        };
        if confidence < self.params.min_confidence {
            return None;
        }

        let strength = signal_strength(set.strength, side.reasons.len());
        let quality = signal_quality(confidence, strength, set.volatility);
        let risk_level = risk_level(set.volatility, confidence, strength);
        let expected_win_rate = expected_win_rate(confidence, strength, quality, set, direction);
        let sign = direction.sign();

        Some(SignalCandidate {
            symbol: symbol.to_string(),
            direction,
            confidence,
            strength,
            quality,
            timeframe: optimal_timeframe(set, side.score),
            reasons: side.reasons.clone(),
            risk_level,
            expected_win_rate,
            entry_price: current_price,
            target_price: current_price + sign * set.atr * TARGET_ATR_MULTIPLE,
            stop_loss: current_price - sign * set.atr * STOP_ATR_MULTIPLE,
            volatility: set.volatility,
            score: side.score,
        })
    }
}

impl Default for SignalScorer {
    fn default() -> Self {
        Self::new(ScoringMode::Precise)
    }
}

/// Rule score on a 120-point scale blended with trend strength and market conditions.
pub fn composite_confidence(score: f64, set: &IndicatorSet) -> f64 {
    let mut confidence = 50.0
        + score.min(COMPOSITE_SCALE) / COMPOSITE_SCALE * 30.0
        + set.strength / 100.0 * 15.0;

    if set.volatility.is_calm() {
        confidence += 10.0;
    } else if set.volatility == Volatility::VeryHigh {
        confidence -= 15.0;
    }
    if set.volume_profile == VolumeProfile::High {
        confidence += 5.0;
    }

    confidence.round().clamp(0.0, MAX_CONFIDENCE)
}

pub fn signal_strength(indicator_strength: f64, reasons: usize) -> f64 {
    let confirmations = reasons.min(6) as f64 / 6.0;
    (indicator_strength * 0.6 + confirmations * 40.0).min(100.0)
}

pub fn signal_quality(confidence: f64, strength: f64, volatility: Volatility) -> SignalQuality {
    let blended = confidence * 0.6 + strength * 0.4;
    let quality = if blended >= 85.0 {
        SignalQuality::Excellent
    } else if blended >= 75.0 {
        SignalQuality::Good
    } else if blended >= 65.0 {
        SignalQuality::Fair
    } else {
        SignalQuality::Poor
    };

    if volatility == Volatility::VeryHigh && quality == SignalQuality::Excellent {
        SignalQuality::Good
    } else {
        quality
    }
}

pub fn risk_level(volatility: Volatility, confidence: f64, strength: f64) -> RiskLevel {
    let mut risk = match volatility {
        Volatility::VeryHigh => 40.0,
        Volatility::High => 30.0,
        Volatility::Medium => 15.0,
        Volatility::Low => 5.0,
        Volatility::VeryLow => 0.0,
    };

    if confidence < 70.0 {
        risk += 30.0;
    } else if confidence < 80.0 {
        risk += 15.0;
    }

    if strength < 50.0 {
        risk += 20.0;
    } else if strength < 70.0 {
        risk += 10.0;
    }

    if risk >= 60.0 {
        RiskLevel::VeryHigh
    } else if risk >= 40.0 {
        RiskLevel::High
    } else if risk >= 25.0 {
        RiskLevel::Medium
    } else if risk >= 10.0 {
        RiskLevel::Low
    } else {
        RiskLevel::VeryLow
    }
}

pub fn expected_win_rate(
    confidence: f64,
    strength: f64,
    quality: SignalQuality,
    set: &IndicatorSet,
    direction: Direction,
) -> f64 {
    let mut rate = 50.0 + (confidence - 50.0) * 0.6 + (strength - 50.0) * 0.3;

    match quality {
        SignalQuality::Excellent => rate += 10.0,
        SignalQuality::Good => rate += 5.0,
        _ => {}
    }

    if set.volatility.is_calm() {
        rate += 5.0;
    } else if set.volatility == Volatility::VeryHigh {
        rate -= 10.0;
    }

    if set.overall_trend.is_strong() && set.overall_trend.favors(direction) {
        rate += 8.0;
    }

    rate.round().clamp(60.0, 95.0)
}

/// Short expiries in fast markets, longer ones for calm strong trends.
pub fn optimal_timeframe(set: &IndicatorSet, score: f64) -> Timeframe {
    if set.volatility.is_elevated() {
        Timeframe::M1
    } else if set.volatility == Volatility::Medium {
        if score >= 80.0 {
            Timeframe::M3
        } else {
            Timeframe::M2
        }
    } else if set.overall_trend.is_strong() {
        Timeframe::M5
    } else {
        Timeframe::M3
    }
}
