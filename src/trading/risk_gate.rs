//! Stateless eligibility checks, position sizing and risk scoring.
//!
//! Everything here is a pure function of its arguments: the same candidate,
//! settings, daily state, suspensions and instant always produce the same
//! decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{RiskLevel, Volatility};
use crate::strategies::signals::SignalCandidate;
use crate::trading::daily_state::DailyRiskState;
use crate::trading::settings::RiskSettings;
use crate::trading::suspensions::{Blacklist, CooldownRegistry};

pub const MIN_AMOUNT: f64 = 5.0;
/// Largest stake as a fraction of balance.
pub const MAX_BALANCE_FRACTION: f64 = 0.05;

/// Which check turned a candidate away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    DailyTradeLimit,
    DailyLossLimit,
    ConsecutiveLosses,
    ProfitTargetReached,
    Cooldown,
    Blacklisted,
    OutsideTradingHours,
    LowConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskDecision {
    pub allowed: bool,
    pub rejection: Option<Rejection>,
    pub reason: Option<String>,
    pub recommended_amount: f64,
    pub risk_score: f64,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl RiskDecision {
    fn reject(rejection: Rejection, reason: String) -> Self {
        Self {
            allowed: false,
            rejection: Some(rejection),
            reason: Some(reason),
            recommended_amount: 0.0,
            risk_score: 0.0,
            warnings: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Candidate evaluation without a user-requested stake.
pub fn evaluate(
    candidate: &SignalCandidate,
    settings: &RiskSettings,
    state: &DailyRiskState,
    cooldowns: &CooldownRegistry,
    blacklist: &Blacklist,
    now: DateTime<Utc>,
) -> RiskDecision {
    evaluate_request(candidate, None, settings, state, cooldowns, blacklist, now)
}

/// Runs the checks in order and stops at the first failure; sizing and
/// scoring only happen once every check passes.
pub fn evaluate_request(
    candidate: &SignalCandidate,
    requested_amount: Option<f64>,
    settings: &RiskSettings,
    state: &DailyRiskState,
    cooldowns: &CooldownRegistry,
    blacklist: &Blacklist,
    now: DateTime<Utc>,
) -> RiskDecision {
    if let Some(rejected) = check_eligibility(candidate, settings, state, cooldowns, blacklist, now)
    {
        return rejected;
    }

    let recommended_amount = position_size(candidate, settings, state);
    let risk_score = risk_score(candidate, recommended_amount, settings, state);

    let mut warnings = Vec::new();
    if risk_score > 70.0 {
        warnings.push(format!(
            "High risk score ({:.0}/100), consider skipping this trade",
            risk_score
        ));
    } else if risk_score > 50.0 {
        warnings.push(format!(
            "Moderate risk score ({:.0}/100), trade carefully",
            risk_score
        ));
    }
    if state.consecutive_losses > 1 {
        warnings.push(format!(
            "{} consecutive losses, consider a pause",
            state.consecutive_losses
        ));
    }
    if candidate.confidence < 80.0 {
        warnings.push(format!(
            "Signal confidence {:.0}% is below 80%",
            candidate.confidence
        ));
    }
    if settings.avoid_high_volatility && candidate.volatility.is_elevated() {
        warnings.push(format!("Market volatility is {}", candidate.volatility));
    }

    let mut suggestions = Vec::new();
    if let Some(requested) = requested_amount {
        if recommended_amount < requested {
            suggestions.push(format!(
                "Reduce the stake to {:.2} {}",
                recommended_amount, settings.currency
            ));
        }
    }
    if candidate.timeframe.is_short() {
        suggestions.push("Consider a longer expiry (3-5 minutes) for steadier results".to_string());
    }
    if state.has_trades() && state.win_rate < 60.0 {
        suggestions.push(format!(
            "Review the strategy, today's win rate is {:.0}%",
            state.win_rate
        ));
    }
    if candidate.volatility.is_elevated() {
        suggestions.push("Wait for volatility to settle for better entries".to_string());
    }

    RiskDecision {
        allowed: true,
        rejection: None,
        reason: None,
        recommended_amount,
        risk_score,
        warnings,
        suggestions,
    }
}

fn check_eligibility(
    candidate: &SignalCandidate,
    settings: &RiskSettings,
    state: &DailyRiskState,
    cooldowns: &CooldownRegistry,
    blacklist: &Blacklist,
    now: DateTime<Utc>,
) -> Option<RiskDecision> {
    let balance = settings.account_balance;

    if state.trades_count >= settings.max_daily_trades {
        return Some(RiskDecision::reject(
            Rejection::DailyTradeLimit,
            format!("Daily trade limit reached ({})", settings.max_daily_trades),
        ));
    }

    if state.loss_pct(balance) >= settings.daily_loss_limit {
        return Some(RiskDecision::reject(
            Rejection::DailyLossLimit,
            format!("Daily loss limit reached ({}%)", settings.daily_loss_limit),
        ));
    }

    if state.consecutive_losses >= settings.max_consecutive_losses {
        return Some(RiskDecision::reject(
            Rejection::ConsecutiveLosses,
            format!(
                "{} consecutive losses, trading paused",
                state.consecutive_losses
            ),
        ));
    }

    if settings.stop_trading_on_target
        && state.net_profit_pct(balance) >= settings.daily_profit_target
    {
        return Some(RiskDecision::reject(
            Rejection::ProfitTargetReached,
            format!(
                "Daily profit target reached ({}%)",
                settings.daily_profit_target
            ),
        ));
    }

    if let Some(minutes) = cooldowns.remaining_minutes(&candidate.symbol, now) {
        return Some(RiskDecision::reject(
            Rejection::Cooldown,
            format!(
                "{} is cooling down after a loss, {} minute(s) left",
                candidate.symbol, minutes
            ),
        ));
    }

    if blacklist.contains(&candidate.symbol, now) {
        return Some(RiskDecision::reject(
            Rejection::Blacklisted,
            format!(
                "{} is temporarily blacklisted for poor performance",
                candidate.symbol
            ),
        ));
    }

    if settings.enforce_trading_hours {
        let hours = &settings.trading_hours;
        let inside = match hours.window() {
            Ok(window) => window.contains(now),
            Err(_) => false,
        };
        if !inside {
            return Some(RiskDecision::reject(
                Rejection::OutsideTradingHours,
                format!(
                    "Outside trading hours ({}-{} {})",
                    hours.start, hours.end, hours.timezone
                ),
            ));
        }
    }

    if candidate.confidence < settings.min_signal_confidence {
        return Some(RiskDecision::reject(
            Rejection::LowConfidence,
            format!(
                "Signal confidence {:.0}% is below the minimum {:.0}%",
                candidate.confidence, settings.min_signal_confidence
            ),
        ));
    }

    None
}

/// Stake multiplier for the candidate's risk level; the extreme levels share
/// the multiplier of their neighbour.
pub fn risk_level_multiplier(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::VeryLow | RiskLevel::Low => 1.1,
        RiskLevel::Medium => 1.0,
        RiskLevel::High | RiskLevel::VeryHigh => 0.7,
    }
}

pub fn position_size(
    candidate: &SignalCandidate,
    settings: &RiskSettings,
    state: &DailyRiskState,
) -> f64 {
    let balance = settings.account_balance;
    let mut amount = balance * settings.max_risk_per_trade / 100.0;

    if settings.dynamic_position_sizing && state.has_trades() {
        if state.win_rate > 70.0 {
            amount *= 1.2;
        } else if state.win_rate < 50.0 {
            amount *= 0.8;
        }
    }

    amount *= risk_level_multiplier(candidate.risk_level);
    amount *= candidate.confidence / 100.0;
    amount *= candidate.expected_win_rate / 100.0;

    MIN_AMOUNT.max((balance * MAX_BALANCE_FRACTION).min(amount.round()))
}

fn risk_level_penalty(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::VeryLow | RiskLevel::Low => 10.0,
        RiskLevel::Medium => 25.0,
        RiskLevel::High | RiskLevel::VeryHigh => 40.0,
    }
}

fn volatility_penalty(volatility: Volatility) -> f64 {
    match volatility {
        Volatility::VeryLow | Volatility::Low => 5.0,
        Volatility::Medium => 15.0,
        Volatility::High | Volatility::VeryHigh => 30.0,
    }
}

/// 0-100 score of how risky taking this trade would be.
pub fn risk_score(
    candidate: &SignalCandidate,
    amount: f64,
    settings: &RiskSettings,
    state: &DailyRiskState,
) -> f64 {
    let balance = settings.account_balance;
    let mut score = if balance > 0.0 {
        amount / balance * 100.0 * 10.0
    } else {
        0.0
    };

    score += risk_level_penalty(candidate.risk_level);
    score += volatility_penalty(candidate.volatility);
    score += (100.0 - candidate.confidence) * 0.3;
    if candidate.timeframe.is_short() {
        score += 15.0;
    }
    score += state.consecutive_losses as f64 * 10.0;

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Timeframe, TradeOutcome};
    use crate::test_helpers::{base_time, make_candidate};
    use crate::trading::settings::TradingHours;
    use chrono::Duration;

    fn fresh_state() -> DailyRiskState {
        DailyRiskState::new(base_time().date_naive())
    }

    fn static_settings() -> RiskSettings {
        RiskSettings {
            dynamic_position_sizing: false,
            ..RiskSettings::default()
        }
    }

    fn run(
        candidate: &SignalCandidate,
        settings: &RiskSettings,
        state: &DailyRiskState,
    ) -> RiskDecision {
        evaluate(
            candidate,
            settings,
            state,
            &CooldownRegistry::default(),
            &Blacklist::default(),
            base_time(),
        )
    }

    #[test]
    fn sizing_example() {
        let c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        let d = run(&c, &static_settings(), &fresh_state());
        assert!(d.allowed);
        assert_eq!(d.recommended_amount, 14.0);
    }

    #[test]
    fn sizing_is_clipped() {
        let settings = RiskSettings {
            max_risk_per_trade: 50.0,
            ..static_settings()
        };
        let c = make_candidate("frxEURUSD", 95.0, RiskLevel::Low, 95.0);
        assert_eq!(position_size(&c, &settings, &fresh_state()), 50.0);

        let settings = RiskSettings {
            max_risk_per_trade: 0.1,
            ..static_settings()
        };
        let c = make_candidate("frxEURUSD", 60.0, RiskLevel::High, 60.0);
        assert_eq!(position_size(&c, &settings, &fresh_state()), MIN_AMOUNT);
    }

    #[test]
    fn dynamic_sizing_follows_win_rate() {
        let settings = RiskSettings::default();
        let c = make_candidate("frxEURUSD", 100.0, RiskLevel::Medium, 100.0);
        assert_eq!(position_size(&c, &settings, &fresh_state()), 20.0);

        let mut hot = fresh_state();
        for _ in 0..4 {
            hot.apply(TradeOutcome::Win, 10.0, 8.0, 1000.0, base_time());
        }
        assert_eq!(position_size(&c, &settings, &hot), 24.0);

        let mut cold = fresh_state();
        cold.apply(TradeOutcome::Loss, 10.0, 0.0, 1000.0, base_time());
        assert_eq!(position_size(&c, &settings, &cold), 16.0);
    }

    #[test]
    fn checks_run_in_order() {
        let settings = static_settings();
        let c = make_candidate("frxEURUSD", 50.0, RiskLevel::Medium, 70.0);
        let mut state = fresh_state();
        state.trades_count = 20;
        state.consecutive_losses = 5;
        let d = run(&c, &settings, &state);
        assert_eq!(d.rejection, Some(Rejection::DailyTradeLimit));
        assert_eq!(d.reason.as_deref(), Some("Daily trade limit reached (20)"));

        state.trades_count = 3;
        let d = run(&c, &settings, &state);
        assert_eq!(d.rejection, Some(Rejection::ConsecutiveLosses));

        state.consecutive_losses = 0;
        let d = run(&c, &settings, &state);
        assert_eq!(d.rejection, Some(Rejection::LowConfidence));
    }

    #[test]
    fn loss_limit_blocks_any_candidate() {
        let settings = static_settings();
        let mut state = fresh_state();
        for _ in 0..2 {
            state.apply(TradeOutcome::Loss, 50.0, 0.0, 1000.0, base_time());
        }
        for conf in [76.0, 85.0, 95.0] {
            let c = make_candidate("frxEURUSD", conf, RiskLevel::VeryLow, 95.0);
            let d = run(&c, &settings, &state);
            assert!(!d.allowed);
            assert_eq!(d.rejection, Some(Rejection::DailyLossLimit));
        }
    }

    #[test]
    fn profit_target_only_when_enabled() {
        let mut settings = static_settings();
        let mut state = fresh_state();
        state.apply(TradeOutcome::Win, 40.0, 60.0, 1000.0, base_time());
        let c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        assert_eq!(
            run(&c, &settings, &state).rejection,
            Some(Rejection::ProfitTargetReached)
        );
        settings.stop_trading_on_target = false;
        assert!(run(&c, &settings, &state).allowed);
    }

    #[test]
    fn cooldown_and_blacklist_block_symbol() {
        let settings = static_settings();
        let state = fresh_state();
        let c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        let t = base_time();

        let mut cooldowns = CooldownRegistry::default();
        cooldowns.start("frxEURUSD", t - Duration::minutes(2), 5);
        let d = evaluate(&c, &settings, &state, &cooldowns, &Blacklist::default(), t);
        assert_eq!(d.rejection, Some(Rejection::Cooldown));
        assert!(d.reason.unwrap().contains("3 minute(s) left"));

        let mut blacklist = Blacklist::default();
        blacklist.insert("frxEURUSD", t, Duration::minutes(60));
        let d = evaluate(&c, &settings, &state, &CooldownRegistry::default(), &blacklist, t);
        assert_eq!(d.rejection, Some(Rejection::Blacklisted));

        let other = make_candidate("frxGBPUSD", 90.0, RiskLevel::Medium, 80.0);
        assert!(evaluate(&other, &settings, &state, &cooldowns, &blacklist, t).allowed);
    }

    #[test]
    fn trading_hours_enforced_only_when_enabled() {
        let mut settings = static_settings();
        settings.trading_hours = TradingHours {
            start: "13:00".into(),
            end: "17:00".into(),
            timezone: "UTC".into(),
        };
        let c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        // base time is 12:00 UTC
        assert!(run(&c, &settings, &fresh_state()).allowed);
        settings.enforce_trading_hours = true;
        assert_eq!(
            run(&c, &settings, &fresh_state()).rejection,
            Some(Rejection::OutsideTradingHours)
        );
    }

    #[test]
    fn risk_score_components() {
        let settings = static_settings();
        let mut c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        // 14 -> 14, MEDIUM 25, MEDIUM vol 15, deficit 3
        let d = run(&c, &settings, &fresh_state());
        assert!((d.risk_score - 57.0).abs() < 1e-9);
        assert!(d.warnings.iter().any(|w| w.starts_with("Moderate risk score")));

        c.timeframe = Timeframe::M1;
        c.volatility = Volatility::VeryHigh;
        c.risk_level = RiskLevel::VeryHigh;
        // stake 10 -> 10, VERY_HIGH 40, vol 30, deficit 3, short expiry 15
        let d = run(&c, &settings, &fresh_state());
        assert!((d.risk_score - 98.0).abs() < 1e-9);
        assert!(d.warnings.iter().any(|w| w.starts_with("High risk score")));
        assert!(d.warnings.iter().any(|w| w.contains("VERY_HIGH")));
        assert!(d.suggestions.iter().any(|s| s.contains("longer expiry")));
    }

    #[test]
    fn requested_amount_triggers_sizing_suggestion() {
        let settings = static_settings();
        let c = make_candidate("frxEURUSD", 90.0, RiskLevel::Medium, 80.0);
        let d = evaluate_request(
            &c,
            Some(25.0),
            &settings,
            &fresh_state(),
            &CooldownRegistry::default(),
            &Blacklist::default(),
            base_time(),
        );
        assert!(d.suggestions.iter().any(|s| s == "Reduce the stake to 14.00 USD"));
    }

    #[test]
    fn identical_inputs_identical_decisions() {
        let settings = RiskSettings::default();
        let mut state = fresh_state();
        state.apply(TradeOutcome::Loss, 10.0, 0.0, 1000.0, base_time());
        let c = make_candidate("frxEURUSD", 88.0, RiskLevel::Low, 77.0);
        assert_eq!(run(&c, &settings, &state), run(&c, &settings, &state));
    }
}
