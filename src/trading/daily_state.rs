use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TradeOutcome;

/// Trades kept for per-symbol performance checks.
pub const HISTORY_WINDOW: usize = 50;

/// Counters for one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRiskState {
    pub date: NaiveDate,
    pub trades_count: u32,
    pub win_count: u32,
    pub loss_count: u32,
    pub total_profit: f64,
    pub total_loss: f64,
    pub net_profit: f64,
    pub win_rate: f64,
    pub consecutive_losses: u32,
    pub last_trade_time: Option<DateTime<Utc>>,
    pub risk_exposure: f64,
}

impl DailyRiskState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            trades_count: 0,
            win_count: 0,
            loss_count: 0,
            total_profit: 0.0,
            total_loss: 0.0,
            net_profit: 0.0,
            win_rate: 0.0,
            consecutive_losses: 0,
            last_trade_time: None,
            risk_exposure: 0.0,
        }
    }

    pub fn has_trades(&self) -> bool {
        self.trades_count > 0
    }

    /// Cumulative loss as a percentage of `balance`.
    pub fn loss_pct(&self, balance: f64) -> f64 {
        if balance <= 0.0 {
            return 0.0;
        }
        self.total_loss.abs() / balance * 100.0
    }

    pub fn net_profit_pct(&self, balance: f64) -> f64 {
        if balance <= 0.0 {
            return 0.0;
        }
        self.net_profit / balance * 100.0
    }

    /// Folds one settled trade into the counters. `amount` is the stake,
    /// `profit` the payout gained on a win.
    pub fn apply(
        &mut self,
        outcome: TradeOutcome,
        amount: f64,
        profit: f64,
        balance: f64,
        at: DateTime<Utc>,
    ) {
        self.trades_count += 1;
        match outcome {
            TradeOutcome::Win => {
                self.win_count += 1;
                self.total_profit += profit;
                self.consecutive_losses = 0;
            }
            TradeOutcome::Loss => {
                self.loss_count += 1;
                self.total_loss += amount;
                self.consecutive_losses += 1;
            }
        }

        self.net_profit = self.total_profit - self.total_loss;
        self.win_rate = self.win_count as f64 / self.trades_count as f64 * 100.0;
        self.last_trade_time = Some(at);
        self.risk_exposure = self.loss_pct(balance);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub symbol: String,
    pub outcome: TradeOutcome,
    pub amount: f64,
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-symbol tally inside the history window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SymbolPerformance {
    pub wins: u32,
    pub losses: u32,
}

impl SymbolPerformance {
    pub fn total(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.wins as f64 / self.total() as f64 * 100.0
    }
}

/// Rolling window of the most recent settled trades across all symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeHistory {
    trades: VecDeque<TradeRecord>,
}

impl TradeHistory {
    pub fn push(&mut self, record: TradeRecord) {
        self.trades.push_back(record);
        while self.trades.len() > HISTORY_WINDOW {
            self.trades.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter()
    }

    pub fn performance(&self) -> HashMap<String, SymbolPerformance> {
        let mut perf: HashMap<String, SymbolPerformance> = HashMap::new();
        for trade in &self.trades {
            let entry = perf.entry(trade.symbol.clone()).or_default();
            match trade.outcome {
                TradeOutcome::Win => entry.wins += 1,
                TradeOutcome::Loss => entry.losses += 1,
            }
        }
        perf
    }
}
