//! Session clock: maps absolute instants onto a local trading calendar.
//!
//! Bars carry UTC instants, which always convert to exactly one local wall
//! time. Both the session VWAP partition and the `hour` feature read the
//! calendar through this type so they cannot disagree about which day a
//! bar belongs to.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Default session timezone.
pub const DEFAULT_SESSION_TZ: Tz = chrono_tz::America::Sao_Paulo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClock {
    tz: Tz,
}

impl SessionClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA timezone name, e.g. "America/New_York".
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse::<Tz>().ok().map(Self::new)
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of an instant.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }

    /// Local hour of day (0..=23) of an instant.
    pub fn local_hour(&self, ts: DateTime<Utc>) -> u32 {
        ts.with_timezone(&self.tz).hour()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sao_paulo_date_lags_utc_near_midnight() {
        // 2024-01-03 01:30Z is 2024-01-02 22:30 in Sao Paulo (UTC-3).
        let clock = SessionClock::default();
        let ts = Utc.with_ymd_and_hms(2024, 1, 3, 1, 30, 0).unwrap();
        assert_eq!(
            clock.local_date(ts),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(clock.local_hour(ts), 22);
    }

    #[test]
    fn new_york_hour_follows_dst() {
        let clock = SessionClock::from_name("America/New_York").unwrap();
        // EST (UTC-5) in January, EDT (UTC-4) in July.
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 14, 30, 0).unwrap();
        assert_eq!(clock.local_hour(winter), 9);
        assert_eq!(clock.local_hour(summer), 10);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert!(SessionClock::from_name("Mars/Olympus_Mons").is_none());
    }

    #[test]
    fn utc_clock_is_identity() {
        let clock = SessionClock::utc();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        assert_eq!(clock.local_hour(ts), 23);
        assert_eq!(
            clock.local_date(ts),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }
}
