use serde::{Deserialize, Serialize};

use crate::models::{Direction, RiskLevel, SignalQuality, Timeframe, Volatility};

/// A scored trade idea for one symbol, produced fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCandidate {
    pub symbol: String,
    pub direction: Direction,
    pub confidence: f64,
    pub strength: f64,
    pub quality: SignalQuality,
    pub timeframe: Timeframe,
    pub reasons: Vec<String>,
    pub risk_level: RiskLevel,
    pub expected_win_rate: f64,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub volatility: Volatility,
    /// Winning rule-table score before any recombination.
    pub score: f64,
}

impl SignalCandidate {
    pub fn timeframe_minutes(&self) -> u32 {
        self.timeframe.as_minutes()
    }

    /// Distance from entry to target over distance from entry to stop.
    pub fn reward_to_risk(&self) -> f64 {
        let risk = (self.entry_price - self.stop_loss).abs();
        if risk == 0.0 {
            return 0.0;
        }
        (self.target_price - self.entry_price).abs() / risk
    }
}
