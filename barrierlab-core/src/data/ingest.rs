//! CSV → `Vec<Bar>`.
//!
//! Header names are matched case-insensitively after trimming. Extra columns
//! are ignored. The output is sorted ascending by timestamp.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use super::timestamp::{parse_timestamp, AmbiguousPolicy, Resolved, TimestampError};
use super::DataError;
use crate::domain::Bar;

pub const REQUIRED_COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Zone used to read naive wall-clock timestamps.
    pub source_tz: Tz,
    pub ambiguous: AmbiguousPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source_tz: Tz::UTC,
            ambiguous: AmbiguousPolicy::Drop,
        }
    }
}

/// Column positions of the required fields.
struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(DataError::MissingColumn(name))
        };
        Ok(Self {
            time: find("time")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize) -> &'r str {
    record.get(idx).map(str::trim).unwrap_or("")
}

fn number(record: &csv::StringRecord, idx: usize, column: &'static str, line: u64) -> Result<f64, DataError> {
    let raw = field(record, idx);
    raw.parse::<f64>().map_err(|_| DataError::BadNumber {
        line,
        column,
        value: raw.to_string(),
    })
}

/// Empty or NaN volume is treated as absent.
fn volume(record: &csv::StringRecord, idx: usize, line: u64) -> Result<Option<f64>, DataError> {
    let raw = field(record, idx);
    if raw.is_empty() {
        return Ok(None);
    }
    let v = number(record, idx, "volume", line)?;
    Ok(if v.is_nan() { None } else { Some(v) })
}

fn sanity_reason(bar: &Bar) -> Option<String> {
    if bar.is_sane() {
        return None;
    }
    if bar.is_void() {
        return Some("non-finite price".into());
    }
    if bar.high < bar.low {
        return Some(format!("high {} below low {}", bar.high, bar.low));
    }
    match bar.volume {
        Some(v) if !v.is_finite() || v < 0.0 => Some(format!("volume {v} is not a non-negative number")),
        _ => None,
    }
}

/// Read bars from any CSV source.
pub fn read_bars<R: io::Read>(reader: R, options: &IngestOptions) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let cols = Columns::locate(rdr.headers()?)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = record.position().map_or(i as u64 + 2, |p| p.line());

        let raw_time = field(&record, cols.time);
        let timestamp = match parse_timestamp(raw_time, options.source_tz, options.ambiguous) {
            Ok(Resolved::Instant(ts)) => ts,
            Ok(Resolved::Dropped) => {
                warn!(line, time = raw_time, tz = %options.source_tz, "ambiguous local time; row dropped");
                dropped += 1;
                continue;
            }
            Err(TimestampError::Unparseable) => {
                return Err(DataError::BadTimestamp {
                    line,
                    value: raw_time.to_string(),
                })
            }
            Err(TimestampError::Nonexistent) => {
                return Err(DataError::NonexistentTime {
                    line,
                    value: raw_time.to_string(),
                })
            }
        };

        let bar = Bar {
            timestamp,
            open: number(&record, cols.open, "open", line)?,
            high: number(&record, cols.high, "high", line)?,
            low: number(&record, cols.low, "low", line)?,
            close: number(&record, cols.close, "close", line)?,
            volume: volume(&record, cols.volume, line)?,
        };
        if let Some(reason) = sanity_reason(&bar) {
            return Err(DataError::InvalidBar { line, reason });
        }
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    if dropped > 0 {
        warn!(dropped, kept = bars.len(), "ambiguous timestamps removed during ingest");
    }
    debug!(bars = bars.len(), "bars ingested");
    Ok(bars)
}

/// Read bars from a CSV file on disk.
pub fn load_bars_csv(path: &Path, options: &IngestOptions) -> Result<Vec<Bar>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_bars(file, options)
}
