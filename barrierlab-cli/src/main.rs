//! BarrierLab CLI: feature tables, labels, training and scoring.
//!
//! Commands:
//! - `features`: assemble the feature table for a bar CSV
//! - `label`: features, auxiliary series and triple-barrier labels
//! - `train`: fit a calibrated model and write artifact + metadata
//! - `predict`: score one feature mapping against an artifact
//! - `health`: report whether an artifact is loaded
//!
//! Command results go to stdout (CSV or JSON); logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use barrierlab_core::data::load_bars_csv;
use barrierlab_core::domain::Bar;
use barrierlab_core::features::{assemble_features, FeatureMap};
use barrierlab_core::inference::{deserialize_features, PredictRequest, Predictor};
use barrierlab_core::labels::LabelSummary;
use barrierlab_runner::{
    export_features_csv, export_labeled_csv, generate_synthetic_bars, label_bars, run_training,
    TrainConfig,
};

#[derive(Parser)]
#[command(
    name = "barrierlab",
    about = "BarrierLab CLI: intraday features, triple-barrier labels and scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Config file plus per-run overrides, shared by the data commands.
#[derive(Args)]
struct ConfigArgs {
    /// Path to a TOML training config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the label horizon (bars).
    #[arg(long)]
    horizon: Option<usize>,

    /// Override the stop-loss multiplier (ATR units).
    #[arg(long)]
    k_sl: Option<f64>,

    /// Override the take-profit multiplier (ATR units).
    #[arg(long)]
    k_tp: Option<f64>,

    /// Override the session timezone (IANA name) used for VWAP resets and `hour`.
    #[arg(long)]
    session_tz: Option<String>,

    /// Override the timezone naive CSV timestamps are written in.
    #[arg(long)]
    source_tz: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the feature table for a bar CSV.
    Features {
        /// Input bar CSV (time, open, high, low, close, volume).
        #[arg(long)]
        csv: PathBuf,

        /// Output CSV. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Write features, auxiliary series and labels for a bar CSV.
    Label {
        /// Input bar CSV.
        #[arg(long)]
        csv: PathBuf,

        /// Output CSV. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Train a calibrated model and write the artifact and its metadata.
    Train {
        /// Input bar CSV.
        #[arg(long, conflicts_with = "synthetic")]
        csv: Option<PathBuf>,

        /// Train on this many synthetic bars instead of a CSV.
        #[arg(long)]
        synthetic: Option<usize>,

        /// Seed for synthetic bars.
        #[arg(long, default_value = "barrierlab")]
        seed: String,

        /// First synthetic bar time (RFC 3339).
        #[arg(long, default_value = "2024-01-02T00:00:00Z")]
        start: String,

        /// Synthetic bar spacing in minutes.
        #[arg(long, default_value_t = 5)]
        interval_minutes: i64,

        /// Artifact path. The metadata sidecar lands next to it.
        #[arg(long, default_value = "models/model_latest.json")]
        out: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Score a feature mapping.
    Predict {
        /// Model artifact. A missing file serves the neutral probability.
        #[arg(long, env = "BARRIERLAB_ARTIFACT")]
        artifact: PathBuf,

        /// Feature mapping as a JSON object. Read from stdin when omitted.
        #[arg(long)]
        features: Option<String>,

        /// Decision threshold in [0, 1].
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Report artifact status.
    Health {
        /// Model artifact.
        #[arg(long, env = "BARRIERLAB_ARTIFACT")]
        artifact: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Features { csv, out, config } => run_features(&csv, out.as_deref(), &config),
        Commands::Label { csv, out, config } => run_label(&csv, out.as_deref(), &config),
        Commands::Train {
            csv,
            synthetic,
            seed,
            start,
            interval_minutes,
            out,
            config,
        } => run_train(
            csv.as_deref(),
            synthetic,
            &seed,
            &start,
            interval_minutes,
            &out,
            &config,
        ),
        Commands::Predict {
            artifact,
            features,
            threshold,
        } => run_predict(&artifact, features, threshold),
        Commands::Health { artifact } => run_health(&artifact),
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barrierlab=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .init();
}

fn load_config(args: &ConfigArgs) -> Result<TrainConfig> {
    let mut config = match &args.config {
        Some(path) => TrainConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TrainConfig::default(),
    };
    if let Some(horizon) = args.horizon {
        config.labels.horizon = horizon;
    }
    if let Some(k_sl) = args.k_sl {
        config.labels.k_sl = k_sl;
    }
    if let Some(k_tp) = args.k_tp {
        config.labels.k_tp = k_tp;
    }
    if let Some(tz) = &args.session_tz {
        config.features.session_tz = tz.clone();
    }
    if let Some(tz) = &args.source_tz {
        config.ingest.source_tz = tz.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_bars(path: &Path, config: &TrainConfig) -> Result<Vec<Bar>> {
    let bars = load_bars_csv(path, &config.ingest_options()?)
        .with_context(|| format!("failed to read bars from {}", path.display()))?;
    info!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn run_features(csv: &Path, out: Option<&Path>, args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    let bars = load_bars(csv, &config)?;
    let frame = assemble_features(&bars, &config.feature_config()?)?;
    write_output(out, &export_features_csv(&bars, &frame)?)
}

fn run_label(csv: &Path, out: Option<&Path>, args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    let bars = load_bars(csv, &config)?;
    let labeled = label_bars(&bars, &config)?;
    let summary = LabelSummary::from_labels(&labeled.labels);
    info!(
        wins = summary.wins,
        losses = summary.losses,
        both_touched = summary.both_touched,
        no_touch = summary.no_touch,
        truncated = summary.truncated,
        invalid = summary.invalid,
        "labels computed"
    );
    write_output(out, &export_labeled_csv(&bars, &labeled)?)
}

fn run_train(
    csv: Option<&Path>,
    synthetic: Option<usize>,
    seed: &str,
    start: &str,
    interval_minutes: i64,
    out: &Path,
    args: &ConfigArgs,
) -> Result<()> {
    let config = load_config(args)?;

    let bars = match (csv, synthetic) {
        (Some(path), None) => load_bars(path, &config)?,
        (None, Some(n)) => {
            if interval_minutes <= 0 {
                bail!("--interval-minutes must be positive");
            }
            let start: DateTime<Utc> = DateTime::parse_from_rfc3339(start)
                .with_context(|| format!("invalid --start '{start}'"))?
                .with_timezone(&Utc);
            info!(bars = n, seed, "generating synthetic bars");
            generate_synthetic_bars(n, start, Duration::minutes(interval_minutes), seed)
        }
        (Some(_), Some(_)) => bail!("--csv and --synthetic are mutually exclusive"),
        (None, None) => bail!("one of --csv or --synthetic is required"),
    };

    let report = run_training(&bars, &config, out)
        .with_context(|| format!("training failed for {}", out.display()))?;

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}

fn run_predict(artifact: &Path, features: Option<String>, threshold: Option<f64>) -> Result<()> {
    let raw = match features {
        Some(json) => json,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read features from stdin")?;
            buf
        }
    };
    let features = parse_features(&raw)?;

    let predictor = Predictor::load_or_neutral(artifact)
        .with_context(|| format!("failed to load artifact {}", artifact.display()))?;
    let response = predictor.predict(&PredictRequest {
        features,
        threshold,
    });

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

/// Parse a JSON feature mapping. Non-numeric values count as missing.
fn parse_features(raw: &str) -> Result<FeatureMap> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("features must be valid JSON")?;
    deserialize_features(value).context("features must be a JSON object of name -> value")
}

fn run_health(artifact: &Path) -> Result<()> {
    let predictor = Predictor::load_or_neutral(artifact)
        .with_context(|| format!("failed to load artifact {}", artifact.display()))?;
    println!("{}", serde_json::to_string_pretty(&predictor.health())?);
    Ok(())
}
