use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::clock::Clock;
use crate::core::sessions::local_date;
use crate::models::TradeOutcome;
use crate::strategies::signals::SignalCandidate;
use crate::trading::daily_state::{DailyRiskState, TradeHistory, TradeRecord};
use crate::trading::risk_gate::{self, RiskDecision};
use crate::trading::settings::{RiskSettings, RiskSettingsPatch, SettingsError};
use crate::trading::store::{RiskSnapshot, StateStore};
use crate::trading::suspensions::{
    Blacklist, CooldownRegistry, BLACKLIST_MIN_TRADES, BLACKLIST_TTL_MINUTES, BLACKLIST_WIN_RATE,
};

/// Single-writer handle shared between the orchestrator and result reporting.
pub type SharedRiskManager = Arc<Mutex<RiskManager>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountRiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub current_risk_level: AccountRiskLevel,
    pub daily: DailyRiskState,
    pub settings: RiskSettings,
    pub blacklisted: Vec<String>,
    pub cooldowns: Vec<(String, DateTime<Utc>)>,
    pub recommendations: Vec<String>,
}

/// Owns the day's counters, the trade history window and both suspension lists.
pub struct RiskManager {
    settings: RiskSettings,
    state: DailyRiskState,
    history: TradeHistory,
    cooldowns: CooldownRegistry,
    blacklist: Blacklist,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
}

impl RiskManager {
    /// Fresh manager with `settings` and empty state for today.
    pub fn new(
        settings: RiskSettings,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let today = local_date(clock.now(), settings.timezone());
        Ok(Self {
            settings,
            state: DailyRiskState::new(today),
            history: TradeHistory::default(),
            cooldowns: CooldownRegistry::default(),
            blacklist: Blacklist::default(),
            clock,
            store,
        })
    }

    /// Restores settings and state from `store`. Anything unreadable or
    /// invalid is replaced by defaults; a snapshot from another day keeps
    /// its history and suspensions but not its counters.
    pub fn load(clock: Arc<dyn Clock>, store: Arc<dyn StateStore>) -> Self {
        let settings = match store.load_settings() {
            Ok(Some(saved)) => match saved.validate() {
                Ok(()) => saved,
                Err(e) => {
                    warn!("Stored risk settings rejected ({}), using defaults", e);
                    RiskSettings::default()
                }
            },
            Ok(None) => RiskSettings::default(),
            Err(e) => {
                warn!("Failed to load risk settings: {:#}", e);
                RiskSettings::default()
            }
        };

        let today = local_date(clock.now(), settings.timezone());
        let mut manager = Self {
            state: DailyRiskState::new(today),
            history: TradeHistory::default(),
            cooldowns: CooldownRegistry::default(),
            blacklist: Blacklist::default(),
            settings,
            clock,
            store,
        };

        match manager.store.load_snapshot() {
            Ok(Some(snapshot)) => {
                if snapshot.daily.date == today {
                    manager.state = snapshot.daily;
                } else {
                    info!(
                        "Discarding daily state from {} (today is {})",
                        snapshot.daily.date, today
                    );
                }
                manager.history = snapshot.history;
                manager.cooldowns = snapshot.cooldowns;
                manager.blacklist = snapshot.blacklist;
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to load daily risk state, starting fresh: {:#}", e),
        }

        manager
    }

    pub fn shared(self) -> SharedRiskManager {
        Arc::new(Mutex::new(self))
    }

    pub fn settings(&self) -> &RiskSettings {
        &self.settings
    }

    pub fn daily_state(&self) -> &DailyRiskState {
        &self.state
    }

    pub fn history(&self) -> &TradeHistory {
        &self.history
    }

    pub fn cooldowns(&self) -> &CooldownRegistry {
        &self.cooldowns
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Resets the counters when the settings' calendar day has changed.
    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = local_date(now, self.settings.timezone());
        if today != self.state.date {
            info!(
                "New trading day {}: resetting daily risk counters (previous day {} trades, net {:.2})",
                today, self.state.trades_count, self.state.net_profit
            );
            self.state = DailyRiskState::new(today);
        }
        self.cooldowns.purge_expired(now);
        self.blacklist.purge_expired(now);
    }

    pub fn evaluate(&mut self, candidate: &SignalCandidate) -> RiskDecision {
        self.evaluate_request(candidate, None)
    }

    pub fn evaluate_request(
        &mut self,
        candidate: &SignalCandidate,
        requested_amount: Option<f64>,
    ) -> RiskDecision {
        let now = self.clock.now();
        self.roll_day(now);
        risk_gate::evaluate_request(
            candidate,
            requested_amount,
            &self.settings,
            &self.state,
            &self.cooldowns,
            &self.blacklist,
            now,
        )
    }

    /// Folds a settled trade into the day, applies the post-loss cooldown and
    /// re-checks which symbols deserve a blacklist entry.
    pub fn record_result(&mut self, symbol: &str, outcome: TradeOutcome, amount: f64, profit: f64) {
        let now = self.clock.now();
        self.roll_day(now);

        self.state
            .apply(outcome, amount, profit, self.settings.account_balance, now);
        self.history.push(TradeRecord {
            symbol: symbol.to_string(),
            outcome,
            amount,
            profit,
            timestamp: now,
        });

        info!(
            "Recorded {} on {}: {} trades today, win rate {:.1}%, {} consecutive losses",
            outcome,
            symbol,
            self.state.trades_count,
            self.state.win_rate,
            self.state.consecutive_losses
        );

        if outcome == TradeOutcome::Loss && self.settings.cooldown_after_loss > 0 {
            self.cooldowns
                .start(symbol, now, self.settings.cooldown_after_loss);
            info!(
                "{} in cooldown for {} minutes",
                symbol, self.settings.cooldown_after_loss
            );
        }

        self.refresh_blacklist(now);
        self.persist();
    }

    fn refresh_blacklist(&mut self, now: DateTime<Utc>) {
        let ttl = Duration::minutes(BLACKLIST_TTL_MINUTES);
        for (symbol, perf) in self.history.performance() {
            if perf.total() >= BLACKLIST_MIN_TRADES
                && perf.win_rate() < BLACKLIST_WIN_RATE
                && self.blacklist.insert(&symbol, now, ttl)
            {
                info!(
                    "{} blacklisted for {} minutes (win rate {:.0}% over {} trades)",
                    symbol,
                    BLACKLIST_TTL_MINUTES,
                    perf.win_rate(),
                    perf.total()
                );
            }
        }
    }

    /// Validates and commits a partial settings update. On error the current
    /// settings stay in place.
    pub fn update_settings(
        &mut self,
        patch: &RiskSettingsPatch,
    ) -> Result<&RiskSettings, SettingsError> {
        let next = match self.settings.with_patch(patch) {
            Ok(next) => next,
            Err(e) => {
                warn!("Risk settings update rejected: {}", e);
                return Err(e);
            }
        };
        self.settings = next;
        if let Err(e) = self.store.save_settings(&self.settings) {
            warn!("Failed to save risk settings: {:#}", e);
        }
        Ok(&self.settings)
    }

    pub fn report(&mut self) -> RiskReport {
        let now = self.clock.now();
        self.roll_day(now);

        RiskReport {
            current_risk_level: self.current_risk_level(),
            daily: self.state.clone(),
            settings: self.settings.clone(),
            blacklisted: self.blacklist.active(now),
            cooldowns: self.cooldowns.active(now),
            recommendations: self.recommendations(now),
        }
    }

    fn current_risk_level(&self) -> AccountRiskLevel {
        let s = &self.state;
        let factors = [
            s.risk_exposure > 15.0,
            s.consecutive_losses >= 2,
            s.has_trades() && s.win_rate < 50.0,
            s.trades_count as f64 > self.settings.max_daily_trades as f64 * 0.8,
        ]
        .iter()
        .filter(|f| **f)
        .count();

        match factors {
            0 => AccountRiskLevel::Low,
            1 => AccountRiskLevel::Medium,
            2 => AccountRiskLevel::High,
            _ => AccountRiskLevel::Critical,
        }
    }

    fn recommendations(&self, now: DateTime<Utc>) -> Vec<String> {
        let s = &self.state;
        let mut out = Vec::new();
        if s.consecutive_losses >= 2 {
            out.push("Take a short break and review the strategy".to_string());
        }
        if s.has_trades() && s.win_rate < 60.0 {
            out.push("Trade smaller until the win rate recovers".to_string());
        }
        if s.risk_exposure > 10.0 {
            out.push("Avoid taking on more risk today".to_string());
        }
        if !self.blacklist.active(now).is_empty() {
            out.push("Focus on the better performing symbols".to_string());
        }
        out
    }

    fn persist(&self) {
        let snapshot = RiskSnapshot {
            daily: self.state.clone(),
            history: self.history.clone(),
            cooldowns: self.cooldowns.clone(),
            blacklist: self.blacklist.clone(),
        };
        match self.store.save_snapshot(&snapshot) {
            Ok(()) => debug!("Daily risk state saved"),
            Err(e) => warn!("Failed to save daily risk state: {:#}", e),
        }
    }
}
