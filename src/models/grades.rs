use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Volatility {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volatility::VeryLow => write!(f, "VERY_LOW"),
            Volatility::Low => write!(f, "LOW"),
            Volatility::Medium => write!(f, "MEDIUM"),
            Volatility::High => write!(f, "HIGH"),
            Volatility::VeryHigh => write!(f, "VERY_HIGH"),
        }
    }
}

impl Volatility {
    pub fn is_calm(self) -> bool {
        matches!(self, Volatility::VeryLow | Volatility::Low)
    }

    pub fn is_elevated(self) -> bool {
        matches!(self, Volatility::High | Volatility::VeryHigh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::VeryLow => write!(f, "VERY_LOW"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::VeryHigh => write!(f, "VERY_HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalQuality::Poor => write!(f, "POOR"),
            SignalQuality::Fair => write!(f, "FAIR"),
            SignalQuality::Good => write!(f, "GOOD"),
            SignalQuality::Excellent => write!(f, "EXCELLENT"),
        }
    }
}

/// Where the current price sits relative to the Bollinger bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BandPosition {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StochSignal {
    Buy,
    Sell,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeProfile {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeTrend {
    Increasing,
    Stable,
    Decreasing,
}
