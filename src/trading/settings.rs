use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::sessions::{TradingWindow, WindowError};

/// Smallest balance for which the [5, 5% of balance] stake clip is non-empty.
pub const MIN_ACCOUNT_BALANCE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("{field} must not be negative (got {value})")]
    NegativePercentage { field: &'static str, value: f64 },
    #[error("{field} must be within {min}..={max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid trading-hours time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
    #[error("trading hours end {end} must be after start {start}")]
    EmptyTradingWindow { start: String, end: String },
    #[error("account balance must be at least {min} (got {value})")]
    BalanceTooSmall { value: f64, min: f64 },
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

impl From<WindowError> for SettingsError {
    fn from(err: WindowError) -> Self {
        match err {
            WindowError::InvalidTime(t) => SettingsError::InvalidTime(t),
            WindowError::InvalidTimezone(tz) => SettingsError::InvalidTimezone(tz),
            WindowError::Empty { start, end } => SettingsError::EmptyTradingWindow { start, end },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradingHours {
    pub start: String,
    pub end: String,
    pub timezone: String,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            start: "00:00".to_string(),
            end: "23:59".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl TradingHours {
    pub fn window(&self) -> Result<TradingWindow, SettingsError> {
        Ok(TradingWindow::parse(&self.start, &self.end, &self.timezone)?)
    }
}

/// Account and risk policy the gate evaluates against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskSettings {
    /// Percent of balance risked per trade.
    pub max_risk_per_trade: f64,
    /// Percent of balance lost in a day before trading halts.
    pub daily_loss_limit: f64,
    pub max_consecutive_losses: u32,
    pub max_daily_trades: u32,
    /// Minutes a symbol sits out after a loss; 0 disables.
    pub cooldown_after_loss: u32,
    pub dynamic_position_sizing: bool,
    pub account_balance: f64,
    pub currency: String,
    pub stop_trading_on_target: bool,
    /// Percent of balance.
    pub daily_profit_target: f64,
    pub trading_hours: TradingHours,
    pub enforce_trading_hours: bool,
    pub avoid_high_volatility: bool,
    /// Reserved; no news source is wired in.
    pub avoid_news: bool,
    pub min_signal_confidence: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            max_risk_per_trade: 2.0,
            daily_loss_limit: 10.0,
            max_consecutive_losses: 3,
            max_daily_trades: 20,
            cooldown_after_loss: 5,
            dynamic_position_sizing: true,
            account_balance: 1000.0,
            currency: "USD".to_string(),
            stop_trading_on_target: true,
            daily_profit_target: 5.0,
            trading_hours: TradingHours::default(),
            enforce_trading_hours: false,
            avoid_high_volatility: true,
            avoid_news: true,
            min_signal_confidence: 75.0,
        }
    }
}

fn check_percentage(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value < 0.0 {
        return Err(SettingsError::NegativePercentage { field, value });
    }
    if !value.is_finite() || value > 100.0 {
        return Err(SettingsError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

impl RiskSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_percentage("maxRiskPerTrade", self.max_risk_per_trade)?;
        check_percentage("dailyLossLimit", self.daily_loss_limit)?;
        check_percentage("dailyProfitTarget", self.daily_profit_target)?;
        check_percentage("minSignalConfidence", self.min_signal_confidence)?;

        if !self.account_balance.is_finite() || self.account_balance < MIN_ACCOUNT_BALANCE {
            return Err(SettingsError::BalanceTooSmall {
                value: self.account_balance,
                min: MIN_ACCOUNT_BALANCE,
            });
        }
        if self.max_daily_trades == 0 {
            return Err(SettingsError::ZeroLimit("maxDailyTrades"));
        }
        if self.max_consecutive_losses == 0 {
            return Err(SettingsError::ZeroLimit("maxConsecutiveLosses"));
        }

        self.trading_hours.window()?;
        Ok(())
    }

    /// Timezone that defines the trading day; UTC if the configured name is unknown.
    pub fn timezone(&self) -> Tz {
        self.trading_hours
            .timezone
            .parse::<Tz>()
            .unwrap_or(chrono_tz::UTC)
    }

    /// Applies `patch` and validates the result without touching `self`.
    pub fn with_patch(&self, patch: &RiskSettingsPatch) -> Result<RiskSettings, SettingsError> {
        let next = patch.apply(self);
        next.validate()?;
        Ok(next)
    }
}

/// Partial settings update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskSettingsPatch {
    pub max_risk_per_trade: Option<f64>,
    pub daily_loss_limit: Option<f64>,
    pub max_consecutive_losses: Option<u32>,
    pub max_daily_trades: Option<u32>,
    pub cooldown_after_loss: Option<u32>,
    pub dynamic_position_sizing: Option<bool>,
    pub account_balance: Option<f64>,
    pub currency: Option<String>,
    pub stop_trading_on_target: Option<bool>,
    pub daily_profit_target: Option<f64>,
    pub trading_hours: Option<TradingHours>,
    pub enforce_trading_hours: Option<bool>,
    pub avoid_high_volatility: Option<bool>,
    pub avoid_news: Option<bool>,
    pub min_signal_confidence: Option<f64>,
}

impl RiskSettingsPatch {
    pub fn apply(&self, base: &RiskSettings) -> RiskSettings {
        let mut s = base.clone();
        if let Some(v) = self.max_risk_per_trade {
            s.max_risk_per_trade = v;
        }
        if let Some(v) = self.daily_loss_limit {
            s.daily_loss_limit = v;
        }
        if let Some(v) = self.max_consecutive_losses {
            s.max_consecutive_losses = v;
        }
        if let Some(v) = self.max_daily_trades {
            s.max_daily_trades = v;
        }
        if let Some(v) = self.cooldown_after_loss {
            s.cooldown_after_loss = v;
        }
        if let Some(v) = self.dynamic_position_sizing {
            s.dynamic_position_sizing = v;
        }
        if let Some(v) = self.account_balance {
            s.account_balance = v;
        }
        if let Some(v) = &self.currency {
            s.currency = v.clone();
        }
        if let Some(v) = self.stop_trading_on_target {
            s.stop_trading_on_target = v;
        }
        if let Some(v) = self.daily_profit_target {
            s.daily_profit_target = v;
        }
        if let Some(v) = &self.trading_hours {
            s.trading_hours = v.clone();
        }
        if let Some(v) = self.enforce_trading_hours {
            s.enforce_trading_hours = v;
        }
        if let Some(v) = self.avoid_high_volatility {
            s.avoid_high_volatility = v;
        }
        if let Some(v) = self.avoid_news {
            s.avoid_news = v;
        }
        if let Some(v) = self.min_signal_confidence {
            s.min_signal_confidence = v;
        }
        s
    }
}
