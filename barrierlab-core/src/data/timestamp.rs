//! Timestamp parsing and local-time resolution for bar ingestion.
//!
//! Accepted inputs:
//! - RFC 3339 with an explicit offset: "2024-03-10T09:30:00-05:00"
//! - Integer epoch seconds, or milliseconds when |value| >= 10^11
//! - Naive wall times, interpreted in the source timezone:
//!   "2024-03-10 09:30:00", "2024-03-10T09:30", "2024.03.10 09:30", ...
//!
//! Naive wall times can fall into a DST transition:
//! - nonexistent (spring-forward gap): shifted forward minute by minute to
//!   the first valid instant, capped at two hours
//! - ambiguous (fall-back overlap): resolved by [`AmbiguousPolicy`]; the
//!   default drops the row

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NAIVE_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
];

/// Epoch values at or above this magnitude are milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Upper bound on the spring-forward shift, in minutes.
const MAX_SHIFT_MINUTES: u32 = 120;

/// How to resolve a wall time that occurs twice (DST fall-back).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousPolicy {
    /// Skip the row.
    #[default]
    Drop,
    /// Pick the earlier instant (typically the DST occurrence).
    PreferEarliest,
    /// Pick the later instant (typically the standard-time occurrence).
    PreferLatest,
}

/// Outcome of resolving a raw timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Instant(DateTime<Utc>),
    /// Ambiguous wall time under [`AmbiguousPolicy::Drop`].
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("unrecognized timestamp format")]
    Unparseable,
    #[error("wall time does not exist in the source timezone")]
    Nonexistent,
}

/// Convert a naive wall time in `tz` to UTC.
pub fn localize(
    naive: NaiveDateTime,
    tz: Tz,
    ambiguous: AmbiguousPolicy,
) -> Result<Resolved, TimestampError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(Resolved::Instant(dt.with_timezone(&Utc))),
        LocalResult::Ambiguous(a, b) => Ok(match ambiguous {
            AmbiguousPolicy::Drop => Resolved::Dropped,
            AmbiguousPolicy::PreferEarliest => Resolved::Instant(a.with_timezone(&Utc)),
            AmbiguousPolicy::PreferLatest => Resolved::Instant(b.with_timezone(&Utc)),
        }),
        LocalResult::None => {
            let mut t = naive;
            for _ in 0..MAX_SHIFT_MINUTES {
                t += chrono::Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&t) {
                    return Ok(Resolved::Instant(dt.with_timezone(&Utc)));
                }
            }
            Err(TimestampError::Nonexistent)
        }
    }
}

/// Parse a raw timestamp cell. Naive wall times are read in `source_tz`.
pub fn parse_timestamp(
    raw: &str,
    source_tz: Tz,
    ambiguous: AmbiguousPolicy,
) -> Result<Resolved, TimestampError> {
    let raw = raw.trim();

    if let Ok(epoch) = raw.parse::<i64>() {
        let dt = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(Resolved::Instant).ok_or(TimestampError::Unparseable);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Resolved::Instant(dt.with_timezone(&Utc)));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or(TimestampError::Unparseable)
        .and_then(|naive| localize(naive, source_tz, ambiguous))
}
