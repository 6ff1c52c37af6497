use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary-option direction: CALL profits on a rise, PUT on a fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Call => "CALL",
            Direction::Put => "PUT",
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Call => Direction::Put,
            Direction::Put => Direction::Call,
        }
    }

    /// +1 for CALL, -1 for PUT.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Call => 1.0,
            Direction::Put => -1.0,
        }
    }
}

/// Three-state trend used by MACD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl Trend {
    pub fn to_direction(self) -> Option<Direction> {
        match self {
            Trend::Bullish => Some(Direction::Call),
            Trend::Bearish => Some(Direction::Put),
            Trend::Neutral => None,
        }
    }
}

/// Five-level consolidated trend of an indicator snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallTrend {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl fmt::Display for OverallTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallTrend::StrongBullish => write!(f, "STRONG_BULLISH"),
            OverallTrend::Bullish => write!(f, "BULLISH"),
            OverallTrend::Neutral => write!(f, "NEUTRAL"),
            OverallTrend::Bearish => write!(f, "BEARISH"),
            OverallTrend::StrongBearish => write!(f, "STRONG_BEARISH"),
        }
    }
}

impl OverallTrend {
    pub fn is_strong(self) -> bool {
        matches!(self, OverallTrend::StrongBullish | OverallTrend::StrongBearish)
    }

    /// True when the trend leans toward `direction` (plain or strong).
    pub fn favors(self, direction: Direction) -> bool {
        match direction {
            Direction::Call => matches!(self, OverallTrend::StrongBullish | OverallTrend::Bullish),
            Direction::Put => matches!(self, OverallTrend::StrongBearish | OverallTrend::Bearish),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Win => write!(f, "WIN"),
            TradeOutcome::Loss => write!(f, "LOSS"),
        }
    }
}
