use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Direction, RiskLevel};
use crate::strategies::signals::SignalCandidate;
use crate::trading::risk_gate::RiskDecision;

/// Reasons beyond this many are dropped from the payload.
pub const MAX_REASONS: usize = 5;

/// Human-facing form of a raw feed symbol.
/// `frxEURUSD` -> `EUR/USD`, `OTC_EURUSD` or `EURUSD_otc` -> `EUR/USD (OTC)`.
pub fn display_symbol(symbol: &str) -> String {
    let otc = symbol.starts_with("OTC_") || symbol.to_ascii_lowercase().ends_with("_otc");

    let mut pair = symbol;
    for prefix in ["frx", "OTC_"] {
        pair = pair.strip_prefix(prefix).unwrap_or(pair);
    }
    if pair.len() > 4 && pair.to_ascii_lowercase().ends_with("_otc") {
        pair = &pair[..pair.len() - 4];
    }

    let pretty = if pair.len() == 6 && pair.is_ascii() {
        format!("{}/{}", &pair[..3], &pair[3..])
    } else {
        pair.to_string()
    };

    if otc {
        format!("{} (OTC)", pretty)
    } else {
        pretty
    }
}

/// JPY quotes carry three decimals, everything else five.
fn price_precision(symbol: &str) -> usize {
    if symbol.contains("JPY") {
        3
    } else {
        5
    }
}

/// What gets delivered to subscribers for one allowed signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub symbol: String,
    pub display_symbol: String,
    pub direction: Direction,
    pub price: f64,
    pub confidence: f64,
    pub timeframe_minutes: u32,
    pub reasons: Vec<String>,
    pub risk_level: RiskLevel,
    pub expected_win_rate: f64,
    pub recommended_amount: f64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn new(
        candidate: &SignalCandidate,
        decision: &RiskDecision,
        currency: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: candidate.symbol.clone(),
            display_symbol: display_symbol(&candidate.symbol),
            direction: candidate.direction,
            price: candidate.entry_price,
            confidence: candidate.confidence,
            timeframe_minutes: candidate.timeframe_minutes(),
            reasons: candidate.reasons.iter().take(MAX_REASONS).cloned().collect(),
            risk_level: candidate.risk_level,
            expected_win_rate: candidate.expected_win_rate,
            recommended_amount: decision.recommended_amount,
            currency: currency.to_string(),
            issued_at,
        }
    }

    /// Plain-text rendering for chat-style transports.
    pub fn message(&self) -> String {
        let arrow = match self.direction {
            Direction::Call => "UP",
            Direction::Put => "DOWN",
        };
        let mut lines = vec![
            format!("{} {} ({})", self.display_symbol, self.direction, arrow),
            format!(
                "Price: {:.*}",
                price_precision(&self.symbol),
                self.price
            ),
            format!("Confidence: {:.0}%", self.confidence),
            format!("Expiry: {} min", self.timeframe_minutes),
            format!("Risk: {}", self.risk_level),
            format!("Expected success: {:.0}%", self.expected_win_rate),
            format!(
                "Stake: {:.2} {}",
                self.recommended_amount, self.currency
            ),
        ];
        if !self.reasons.is_empty() {
            lines.push("Reasons:".to_string());
            lines.extend(self.reasons.iter().map(|r| format!("- {}", r)));
        }
        lines.join("\n")
    }
}

/// Delivery channel for recommendations. Delivery success is the
/// notifier's own business; errors are only logged by the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recommendation: &Recommendation) -> Result<()>;
}

/// Writes recommendations to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, rec: &Recommendation) -> Result<()> {
        info!(
            "SIGNAL {} {} @ {:.*} | conf {:.0}% | {}m | risk {} | stake {:.2} {}",
            rec.display_symbol,
            rec.direction,
            price_precision(&rec.symbol),
            rec.price,
            rec.confidence,
            rec.timeframe_minutes,
            rec.risk_level,
            rec.recommended_amount,
            rec.currency
        );
        for reason in &rec.reasons {
            info!("  - {}", reason);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{base_time, make_candidate};

    fn decision(amount: f64) -> RiskDecision {
        RiskDecision {
            allowed: true,
            rejection: None,
            reason: None,
            recommended_amount: amount,
            risk_score: 30.0,
            warnings: vec![],
            suggestions: vec![],
        }
    }

    #[test]
    fn display_symbol_formats() {
        assert_eq!(display_symbol("frxEURUSD"), "EUR/USD");
        assert_eq!(display_symbol("OTC_GBPUSD"), "GBP/USD (OTC)");
        assert_eq!(display_symbol("EURUSD_otc"), "EUR/USD (OTC)");
        assert_eq!(display_symbol("R_100"), "R_100");
    }

    #[test]
    fn recommendation_caps_reasons() {
        let mut candidate = make_candidate("frxUSDJPY", 88.0, RiskLevel::Low, 80.0);
        candidate.entry_price = 148.1234;
        candidate.reasons = (1..=7).map(|i| format!("reason {}", i)).collect();

        let rec = Recommendation::new(&candidate, &decision(14.0), "USD", base_time());
        assert_eq!(rec.display_symbol, "USD/JPY");
        assert_eq!(rec.reasons.len(), MAX_REASONS);
        assert_eq!(rec.timeframe_minutes, 3);

        let msg = rec.message();
        assert!(msg.starts_with("USD/JPY CALL (UP)"));
        assert!(msg.contains("Price: 148.123"));
        assert!(msg.contains("Stake: 14.00 USD"));
        assert!(!msg.contains("reason 6"));
    }
}
