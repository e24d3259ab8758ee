//! `exercise-hmm-fit` binary: fits a repetition model from pose frames.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin exercise-hmm-fit -- --input squats.jsonl
//! cargo run --bin exercise-hmm-fit -- --input squats.jsonl --output model.json --config cfg.json
//! ```
//!
//! The input holds one JSON pose frame per line, each with the fields
//! `left_shoulder`, `right_shoulder`, `left_hip`, `right_hip`, `left_knee`,
//! `right_knee`, `left_ankle`, `right_ankle`, each `{x, y, visibility}`.
//! Blank lines are ignored.

use clap::Parser;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use exercise_hmm::{fit_model, Corpus, FitError, FitResult, HmmConfig, PoseFrame};

/// Command-line arguments for the fitting binary.
#[derive(Parser, Debug)]
#[command(
    name = "exercise-hmm-fit",
    version,
    about = "Fit a two-state HMM repetition model from pose landmarks",
    long_about = None
)]
struct Args {
    /// JSON Lines file with one pose frame per line.
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Where to write the fitted model.
    #[arg(short, long, value_name = "FILE", default_value = "squat_hmm_model.json")]
    output: PathBuf,

    /// Optional JSON configuration file; defaults are used otherwise.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn read_frames(path: &Path) -> FitResult<Vec<PoseFrame>> {
    let file = std::fs::File::open(path).map_err(|e| FitError::io(path, e))?;
    let mut frames = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| FitError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(&line).map_err(|source| FitError::InvalidFrame {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        frames.push(frame);
    }
    Ok(frames)
}

fn run(args: &Args) -> FitResult<()> {
    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            HmmConfig::from_json(path)?
        }
        None => HmmConfig::default(),
    };
    config.validate()?;

    let frames = read_frames(&args.input)?;
    info!("Read {} frames from {}", frames.len(), args.input.display());

    let corpus = Corpus::from_frames(&frames, &config);
    let report = fit_model(&corpus, &config)?;
    report.model.save(&args.output)?;

    info!("Saved HMM model to {}", args.output.display());
    info!("Reps detected: {}", report.reps_detected());
    info!(
        "Mean log-likelihood: {:.2}, std: {:.2}",
        report.model.mean_log_likelihood, report.model.std_log_likelihood
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("Exercise HMM fitter v{}", exercise_hmm::VERSION);

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
