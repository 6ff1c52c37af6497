use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a poorly performing symbol stays blacklisted.
pub const BLACKLIST_TTL_MINUTES: i64 = 60;
pub const BLACKLIST_MIN_TRADES: u32 = 5;
pub const BLACKLIST_WIN_RATE: f64 = 30.0;

/// Symbol -> time its post-loss cooldown ends. Expired entries read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownRegistry {
    until: HashMap<String, DateTime<Utc>>,
}

impl CooldownRegistry {
    pub fn start(&mut self, symbol: &str, now: DateTime<Utc>, minutes: u32) {
        self.until
            .insert(symbol.to_string(), now + Duration::minutes(minutes as i64));
    }

    /// End of the active cooldown for `symbol`, if any.
    pub fn active_until(&self, symbol: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.until.get(symbol).copied().filter(|until| now < *until)
    }

    pub fn is_active(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.active_until(symbol, now).is_some()
    }

    /// Whole minutes left, rounded up.
    pub fn remaining_minutes(&self, symbol: &str, now: DateTime<Utc>) -> Option<i64> {
        self.active_until(symbol, now).map(|until| {
            let ms = (until - now).num_milliseconds();
            (ms + 59_999) / 60_000
        })
    }

    pub fn active(&self, now: DateTime<Utc>) -> Vec<(String, DateTime<Utc>)> {
        let mut out: Vec<_> = self
            .until
            .iter()
            .filter(|(_, until)| now < **until)
            .map(|(s, until)| (s.clone(), *until))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.until.retain(|_, until| now < *until);
    }
}

/// Temporarily banned symbols, each with an expiry fixed at insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blacklist {
    until: HashMap<String, DateTime<Utc>>,
}

impl Blacklist {
    /// Inserts `symbol` unless it is already actively listed. Returns true on insertion.
    pub fn insert(&mut self, symbol: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.contains(symbol, now) {
            return false;
        }
        self.until.insert(symbol.to_string(), now + ttl);
        true
    }

    pub fn contains(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.until.get(symbol).is_some_and(|until| now < *until)
    }

    pub fn active(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut out: Vec<String> = self
            .until
            .iter()
            .filter(|(_, until)| now < **until)
            .map(|(s, _)| s.clone())
            .collect();
        out.sort();
        out
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        self.until.retain(|_, until| now < *until);
    }
}
