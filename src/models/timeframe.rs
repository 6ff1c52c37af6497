use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Expiry horizon of a binary-option recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M2 => "2m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
        }
    }

    pub fn as_minutes(&self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M2 => 2,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.as_minutes() as u64 * 60)
    }

    pub fn from_minutes(minutes: u32) -> Option<Timeframe> {
        match minutes {
            1 => Some(Timeframe::M1),
            2 => Some(Timeframe::M2),
            3 => Some(Timeframe::M3),
            5 => Some(Timeframe::M5),
            _ => None,
        }
    }

    /// Expiries of two minutes or less carry extra risk.
    pub fn is_short(&self) -> bool {
        self.as_minutes() <= 2
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
