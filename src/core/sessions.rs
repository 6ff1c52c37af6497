use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid time of day '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),
    #[error("trading window end {end} is not after start {start}")]
    Empty { start: String, end: String },
}

/// Parses "HH:MM" into minutes after midnight.
pub fn parse_hhmm(value: &str) -> Result<u32, WindowError> {
    let invalid = || WindowError::InvalidTime(value.to_string());
    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(hour * 60 + minute)
}

pub fn parse_timezone(name: &str) -> Result<Tz, WindowError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| WindowError::InvalidTimezone(name.to_string()))
}

/// Calendar date of `now` as seen in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Daily trading window in a named timezone, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingWindow {
    start_min: u32,
    end_min: u32,
    tz: Tz,
}

impl TradingWindow {
    pub fn parse(start: &str, end: &str, timezone: &str) -> Result<Self, WindowError> {
        let start_min = parse_hhmm(start)?;
        let end_min = parse_hhmm(end)?;
        let tz = parse_timezone(timezone)?;
        if end_min <= start_min {
            return Err(WindowError::Empty {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start_min,
            end_min,
            tz,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn contains(&self, utc_now: DateTime<Utc>) -> bool {
        let local = utc_now.with_timezone(&self.tz);
        let current = local.hour() * 60 + local.minute();
        current >= self.start_min && current <= self.end_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_hhmm("00:00"), Ok(0));
        assert_eq!(parse_hhmm("23:59"), Ok(1439));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("9").is_err());
        assert!(parse_hhmm("ab:cd").is_err());
    }

    #[test]
    fn window_is_inclusive() {
        let w = TradingWindow::parse("08:00", "16:30", "UTC").unwrap();
        assert!(w.contains(utc(8, 0)));
        assert!(w.contains(utc(16, 30)));
        assert!(!w.contains(utc(16, 31)));
        assert!(!w.contains(utc(7, 59)));
    }

    #[test]
    fn window_uses_its_timezone() {
        // New York is UTC-5 in January
        let w = TradingWindow::parse("09:30", "16:00", "America/New_York").unwrap();
        assert!(w.contains(utc(14, 30)));
        assert!(!w.contains(utc(9, 30)));
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(matches!(
            TradingWindow::parse("10:00", "09:00", "UTC"),
            Err(WindowError::Empty { .. })
        ));
        assert!(matches!(
            TradingWindow::parse("09:00", "10:00", "Mars/Olympus"),
            Err(WindowError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn local_date_crosses_midnight() {
        let tz = parse_timezone("Asia/Tokyo").unwrap();
        let d = local_date(utc(20, 0), tz);
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }
}
