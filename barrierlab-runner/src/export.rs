//! CSV export of feature tables and labeled datasets.
//!
//! Timestamps are written as RFC 3339 UTC. Numbers use full precision so
//! exported tables re-import losslessly.

use anyhow::{ensure, Context, Result};

use barrierlab_core::domain::Bar;
use barrierlab_core::features::{FeatureFrame, FEATURE_NAMES};
use barrierlab_core::labels::BarrierOutcome;

use crate::dataset::LabeledFrame;

fn outcome_name(outcome: BarrierOutcome) -> &'static str {
    match outcome {
        BarrierOutcome::TakeProfit => "take_profit",
        BarrierOutcome::StopLoss => "stop_loss",
        BarrierOutcome::BothTouched => "both_touched",
        BarrierOutcome::NoTouch => "no_touch",
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Export one row per bar: `time` followed by the feature columns.
pub fn export_features_csv(bars: &[Bar], frame: &FeatureFrame) -> Result<String> {
    ensure!(
        bars.len() == frame.len(),
        "feature frame has {} rows for {} bars",
        frame.len(),
        bars.len()
    );
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["time"];
    header.extend(FEATURE_NAMES);
    wtr.write_record(&header)?;

    for (bar, row) in bars.iter().zip(&frame.rows) {
        let mut record = vec![bar.timestamp.to_rfc3339()];
        record.extend(row.values().iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

/// Export bars, features, auxiliary series, and labels.
///
/// Columns: time, open, high, low, close, volume, <features>, ema9, ema21,
/// atr, vwap, label, outcome, truncated. Unlabeled rows leave the last three
/// cells empty; missing volume is an empty cell.
pub fn export_labeled_csv(bars: &[Bar], labeled: &LabeledFrame) -> Result<String> {
    let frame = &labeled.frame;
    ensure!(
        bars.len() == frame.len() && bars.len() == labeled.labels.len(),
        "labeled frame is not aligned with {} bars",
        bars.len()
    );
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["time", "open", "high", "low", "close", "volume"];
    header.extend(FEATURE_NAMES);
    header.extend(["ema9", "ema21", "atr", "vwap", "label", "outcome", "truncated"]);
    wtr.write_record(&header)?;

    for (i, bar) in bars.iter().enumerate() {
        let mut record = vec![
            bar.timestamp.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.map(|v| v.to_string()).unwrap_or_default(),
        ];
        record.extend(frame.rows[i].values().iter().map(|v| v.to_string()));
        record.extend(
            [frame.aux.ema9[i], frame.aux.ema21[i], frame.aux.atr[i], frame.aux.vwap[i]]
                .iter()
                .map(|v| v.to_string()),
        );
        match &labeled.labels[i] {
            Some(l) => record.extend([
                l.value().to_string(),
                outcome_name(l.outcome).to_string(),
                l.truncated.to_string(),
            ]),
            None => record.extend([String::new(), String::new(), String::new()]),
        }
        wtr.write_record(&record)?;
    }

    finish(wtr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainConfig;
    use crate::dataset::label_bars;
    use crate::synthetic::generate_synthetic_bars;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        generate_synthetic_bars(n, start, Duration::minutes(5), "export")
    }

    #[test]
    fn features_csv_has_header_and_rows() {
        let bars = bars(30);
        let labeled = label_bars(&bars, &TrainConfig::default()).unwrap();
        let csv = export_features_csv(&bars, &labeled.frame).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "time,dist_ema21,dist_vwap,slope_e9,slope_e21,range_ratio,ret1,hour"
        );
        assert_eq!(lines.count(), 30);
    }

    #[test]
    fn labeled_csv_round_trips_through_reader() {
        let bars = bars(40);
        let labeled = label_bars(&bars, &TrainConfig::default()).unwrap();
        let csv = export_labeled_csv(&bars, &labeled).unwrap();

        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), 6 + FEATURE_NAMES.len() + 7);
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 40);

        let last = records.last().unwrap();
        let truncated = &last[headers.iter().position(|h| h == "truncated").unwrap()];
        assert_eq!(truncated, "true");
        let close: f64 = last[4].parse().unwrap();
        assert_eq!(close, bars[39].close);
    }

    #[test]
    fn misaligned_frame_is_rejected() {
        let bars = bars(30);
        let labeled = label_bars(&bars, &TrainConfig::default()).unwrap();
        assert!(export_features_csv(&bars[..10], &labeled.frame).is_err());
    }
}
