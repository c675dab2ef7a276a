//! Bar ingestion: CSV reading, timestamp resolution, sanity checks.

pub mod ingest;
pub mod timestamp;

use std::io;
use std::path::PathBuf;

pub use ingest::{load_bars_csv, read_bars, IngestOptions, REQUIRED_COLUMNS};
pub use timestamp::{localize, parse_timestamp, AmbiguousPolicy, Resolved, TimestampError};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: unparseable timestamp '{value}'")]
    BadTimestamp { line: u64, value: String },

    #[error("line {line}: local time '{value}' does not exist in the source timezone")]
    NonexistentTime { line: u64, value: String },

    #[error("line {line}: column '{column}' is not a number: '{value}'")]
    BadNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: invalid bar ({reason})")]
    InvalidBar { line: u64, reason: String },
}
