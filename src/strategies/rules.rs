//! Declarative scoring rules.
//!
//! Each rule is written once from the CALL side and mirrored for PUT. Rules
//! are grouped in families; within a family the first matching rule for a
//! side wins, so graduated bands never stack. Matches across families all
//! accumulate.

use crate::core::indicator_set::IndicatorSet;
use crate::models::{BandPosition, Direction, StochSignal, VolumeProfile, VolumeTrend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    Rsi,
    Macd,
    EmaTrend,
    Bollinger,
    Stochastic,
    WilliamsR,
    Momentum,
    Volume,
    Levels,
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// RSI below the level for CALL, above `100 - level` for PUT.
    RsiBeyond(f64),
    /// MACD trend agrees and the histogram is at least `min_bp` basis points of price.
    MacdCross { min_bp: f64 },
    /// Line and histogram on the direction's side of zero.
    MacdSide,
    /// Price and EMA 12/26/50/200 stacked in order.
    EmaFullStack,
    /// EMA 12/26/50 stacked in order.
    EmaMediumStack,
    /// EMA12 on the direction's side of EMA26.
    EmaShortCross,
    /// Price touching the lower band (CALL) or the upper band (PUT).
    BandTouch,
    /// Narrow bands while the overall trend leans the same way.
    SqueezeWithTrend { max_bandwidth: f64 },
    StochCross,
    /// %K below the level for CALL, above `100 - level` for PUT.
    StochBeyond(f64),
    /// %R below the level for CALL, above `-100 - level` for PUT.
    WilliamsBeyond(f64),
    /// Rate of change past `min_pct` and still growing.
    MomentumAccelerating { min_pct: f64 },
    MomentumPast(f64),
    VolumeSpike,
    VolumeRising,
    /// Price within `tolerance` (fraction) of support (CALL) or resistance (PUT).
    NearLevel { tolerance: f64 },
    /// Stretched RSI, histogram already turning and price at the outer band.
    Reversal { rsi: f64 },
}

impl Condition {
    pub fn holds(&self, set: &IndicatorSet, direction: Direction) -> bool {
        let call = direction == Direction::Call;
        let sign = direction.sign();
        match *self {
            Condition::RsiBeyond(level) => {
                if call {
                    set.rsi < level
                } else {
                    set.rsi > 100.0 - level
                }
            }
            Condition::MacdCross { min_bp } => {
                set.macd.trend.to_direction() == Some(direction)
                    && set.macd_histogram_bp() * sign >= min_bp
            }
            Condition::MacdSide => set.macd.histogram * sign > 0.0 && set.macd.line * sign > 0.0,
            Condition::EmaFullStack => {
                let e = &set.ema;
                if call {
                    set.price > e.ema12 && e.fully_bullish()
                } else {
                    set.price < e.ema12 && e.fully_bearish()
                }
            }
            Condition::EmaMediumStack => {
                if call {
                    set.ema.bullish_stack()
                } else {
                    set.ema.bearish_stack()
                }
            }
            Condition::EmaShortCross => (set.ema.ema12 - set.ema.ema26) * sign > 0.0,
            Condition::BandTouch => {
                let wanted = if call {
                    BandPosition::Lower
                } else {
                    BandPosition::Upper
                };
                set.bollinger.position == wanted
            }
            Condition::SqueezeWithTrend { max_bandwidth } => {
                set.bollinger.bandwidth > 0.0
                    && set.bollinger.bandwidth < max_bandwidth
                    && set.overall_trend.favors(direction)
            }
            Condition::StochCross => {
                let wanted = if call { StochSignal::Buy } else { StochSignal::Sell };
                set.stochastic.signal == wanted
            }
            Condition::StochBeyond(level) => {
                if call {
                    set.stochastic.k < level
                } else {
                    set.stochastic.k > 100.0 - level
                }
            }
            Condition::WilliamsBeyond(level) => {
                if call {
                    set.williams_r < level
                } else {
                    set.williams_r > -100.0 - level
                }
            }
            Condition::MomentumAccelerating { min_pct } => {
                set.momentum * sign >= min_pct && set.momentum_accelerating()
            }
            Condition::MomentumPast(pct) => set.momentum * sign > pct,
            Condition::VolumeSpike => {
                set.momentum * sign > 0.0 && set.volume_profile == VolumeProfile::High
            }
            Condition::VolumeRising => {
                set.momentum * sign > 0.0 && set.volume_trend == VolumeTrend::Increasing
            }
            Condition::NearLevel { tolerance } => {
                if call {
                    set.levels.near_support(set.price, tolerance)
                } else {
                    set.levels.near_resistance(set.price, tolerance)
                }
            }
            Condition::Reversal { rsi } => {
                Condition::RsiBeyond(rsi).holds(set, direction)
                    && set.macd.histogram * sign > 0.0
                    && Condition::BandTouch.holds(set, direction)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringRule {
    pub family: RuleFamily,
    pub condition: Condition,
    pub weight: f64,
    pub call_reason: &'static str,
    pub put_reason: &'static str,
}

impl ScoringRule {
    pub fn reason(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::Call => self.call_reason,
            Direction::Put => self.put_reason,
        }
    }
}

const fn rule(
    family: RuleFamily,
    condition: Condition,
    weight: f64,
    call_reason: &'static str,
    put_reason: &'static str,
) -> ScoringRule {
    ScoringRule {
        family,
        condition,
        weight,
        call_reason,
        put_reason,
    }
}

pub const SQUEEZE_BANDWIDTH: f64 = 0.25;
pub const LEVEL_TOLERANCE: f64 = 0.002;

/// Ordered strongest-first inside each family.
#[rustfmt::skip]
pub const SCORING_RULES: &[ScoringRule] = &[
    rule(RuleFamily::Rsi, Condition::RsiBeyond(25.0), 30.0,
        "RSI deeply oversold (<25)", "RSI deeply overbought (>75)"),
    rule(RuleFamily::Rsi, Condition::RsiBeyond(35.0), 20.0,
        "RSI oversold (<35)", "RSI overbought (>65)"),
    rule(RuleFamily::Rsi, Condition::RsiBeyond(45.0), 10.0,
        "RSI below midline (<45)", "RSI above midline (>55)"),
    rule(RuleFamily::Macd, Condition::MacdCross { min_bp: 2.0 }, 25.0,
        "Strong MACD bullish crossover", "Strong MACD bearish crossover"),
    rule(RuleFamily::Macd, Condition::MacdCross { min_bp: 0.5 }, 15.0,
        "MACD bullish crossover", "MACD bearish crossover"),
    rule(RuleFamily::Macd, Condition::MacdSide, 8.0,
        "MACD above zero", "MACD below zero"),
    rule(RuleFamily::EmaTrend, Condition::EmaFullStack, 25.0,
        "Uptrend confirmed on all EMA horizons", "Downtrend confirmed on all EMA horizons"),
    rule(RuleFamily::EmaTrend, Condition::EmaMediumStack, 15.0,
        "EMA 12/26/50 aligned up", "EMA 12/26/50 aligned down"),
    rule(RuleFamily::EmaTrend, Condition::EmaShortCross, 8.0,
        "EMA12 above EMA26", "EMA12 below EMA26"),
    rule(RuleFamily::Bollinger, Condition::BandTouch, 20.0,
        "Price at lower Bollinger band", "Price at upper Bollinger band"),
    rule(RuleFamily::Bollinger, Condition::SqueezeWithTrend { max_bandwidth: SQUEEZE_BANDWIDTH }, 10.0,
        "Bollinger squeeze in bullish trend", "Bollinger squeeze in bearish trend"),
    rule(RuleFamily::Stochastic, Condition::StochCross, 15.0,
        "Stochastic bullish cross in oversold zone", "Stochastic bearish cross in overbought zone"),
    rule(RuleFamily::Stochastic, Condition::StochBeyond(20.0), 10.0,
        "Stochastic oversold", "Stochastic overbought"),
    rule(RuleFamily::WilliamsR, Condition::WilliamsBeyond(-80.0), 10.0,
        "Williams %R oversold", "Williams %R overbought"),
    rule(RuleFamily::Momentum, Condition::MomentumAccelerating { min_pct: 0.3 }, 15.0,
        "Accelerating upward momentum", "Accelerating downward momentum"),
    rule(RuleFamily::Momentum, Condition::MomentumPast(0.05), 10.0,
        "Price rising", "Price falling"),
    rule(RuleFamily::Volume, Condition::VolumeSpike, 10.0,
        "Volume spike behind the rise", "Volume spike behind the drop"),
    rule(RuleFamily::Volume, Condition::VolumeRising, 10.0,
        "Rising volume confirms the rise", "Rising volume confirms the drop"),
    rule(RuleFamily::Levels, Condition::NearLevel { tolerance: LEVEL_TOLERANCE }, 15.0,
        "Price bouncing off support", "Price rejecting resistance"),
    rule(RuleFamily::Reversal, Condition::Reversal { rsi: 35.0 }, 20.0,
        "Bullish reversal pattern", "Bearish reversal pattern"),
];

/// Accumulated score and reasons for one side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideScore {
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTally {
    pub call: SideScore,
    pub put: SideScore,
}

impl RuleTally {
    pub fn side(&self, direction: Direction) -> &SideScore {
        match direction {
            Direction::Call => &self.call,
            Direction::Put => &self.put,
        }
    }

    /// The side with the strictly higher score, if any.
    pub fn leader(&self) -> Option<Direction> {
        if self.call.score > self.put.score {
            Some(Direction::Call)
        } else if self.put.score > self.call.score {
            Some(Direction::Put)
        } else {
            None
        }
    }
}

pub fn evaluate_rules(rules: &[ScoringRule], set: &IndicatorSet) -> RuleTally {
    RuleTally {
        call: score_side(rules, set, Direction::Call),
        put: score_side(rules, set, Direction::Put),
    }
}

fn score_side(rules: &[ScoringRule], set: &IndicatorSet, direction: Direction) -> SideScore {
    let mut side = SideScore::default();
    let mut fired: Vec<RuleFamily> = Vec::new();

    for rule in rules {
        if fired.contains(&rule.family) || !rule.condition.holds(set, direction) {
            continue;
        }
        fired.push(rule.family);
        side.score += rule.weight;
        side.reasons.push(rule.reason(direction).to_string());
    }
    side
}
