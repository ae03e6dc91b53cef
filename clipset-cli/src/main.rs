//! `clipset` — index a directory of recordings and run extraction epochs over it.
//!
//! Prints a JSON summary per epoch (items, failures, timing, signal levels).
//! Useful for checking a dataset root before pointing a training run at it.

mod logging;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clipset_core::{ClipDataset, EpochLoader};
use serde::Serialize;
use tracing::{info, warn};

use logging::init_logging;
use settings::{load_settings, save_settings, CliSettings};

const USAGE: &str = "Usage: clipset --root <dir> [--settings <file.json>] [--workers <n>] \
[--seed <u64>] [--shuffle] [--epochs <n>] [--log-dir <dir>] [--output <file.json>] \
[--write-settings <file.json>]";

#[derive(Debug, Default)]
struct Args {
    root: Option<PathBuf>,
    settings: Option<PathBuf>,
    workers: Option<usize>,
    seed: Option<u64>,
    shuffle: bool,
    epochs: Option<u64>,
    log_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    write_settings: Option<PathBuf>,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = raw.into_iter();

    fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
        it.next().ok_or_else(|| format!("missing value for {flag}"))
    }

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--root" => args.root = Some(PathBuf::from(value(&mut it, "--root")?)),
            "--settings" => args.settings = Some(PathBuf::from(value(&mut it, "--settings")?)),
            "--workers" => {
                args.workers = Some(
                    value(&mut it, "--workers")?
                        .parse()
                        .map_err(|_| "invalid value for --workers".to_string())?,
                )
            }
            "--seed" => {
                args.seed = Some(
                    value(&mut it, "--seed")?
                        .parse()
                        .map_err(|_| "invalid value for --seed".to_string())?,
                )
            }
            "--epochs" => {
                args.epochs = Some(
                    value(&mut it, "--epochs")?
                        .parse()
                        .map_err(|_| "invalid value for --epochs".to_string())?,
                )
            }
            "--shuffle" => args.shuffle = true,
            "--log-dir" => args.log_dir = Some(PathBuf::from(value(&mut it, "--log-dir")?)),
            "--output" => args.output = Some(PathBuf::from(value(&mut it, "--output")?)),
            "--write-settings" => {
                args.write_settings = Some(PathBuf::from(value(&mut it, "--write-settings")?))
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn apply_overrides(settings: &mut CliSettings, args: &Args) {
    if let Some(root) = &args.root {
        settings.dataset_root = Some(root.clone());
    }
    if let Some(workers) = args.workers {
        settings.loader.num_workers = workers;
    }
    if args.seed.is_some() {
        settings.loader.seed = args.seed;
    }
    if args.shuffle {
        settings.loader.shuffle = true;
    }
    if let Some(epochs) = args.epochs {
        settings.epochs = epochs;
    }
    if let Some(dir) = &args.log_dir {
        settings.log.directory = dir.clone();
    }
    settings.normalize();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EpochSummary {
    epoch: u64,
    items: usize,
    failed: usize,
    elapsed_ms: f64,
    mean_rms: f64,
    peak: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    dataset_root: String,
    files: usize,
    native_sample_rate: u32,
    target_rate: u32,
    target_samples: usize,
    workers: usize,
    epochs: Vec<EpochSummary>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("clipset failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1)).map_err(anyhow::Error::msg)?;

    let mut settings = match &args.settings {
        Some(path) => load_settings(path),
        None => CliSettings::default(),
    };
    apply_overrides(&mut settings, &args);

    init_logging(&settings.log)?;

    if let Some(path) = &args.write_settings {
        save_settings(path, &settings)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        info!(path = %path.display(), "effective settings saved");
    }

    let Some(root) = settings.dataset_root.clone() else {
        bail!("no dataset root given (use --root or datasetRoot in settings)\n{USAGE}");
    };

    let dataset = Arc::new(
        ClipDataset::open(&root, settings.target)
            .with_context(|| format!("opening dataset at {}", root.display()))?,
    );
    if dataset.native_sample_rate() != settings.target.target_rate {
        info!(
            native = dataset.native_sample_rate(),
            target = settings.target.target_rate,
            "files will be resampled to the target rate"
        );
    }

    let loader = EpochLoader::new(Arc::clone(&dataset), settings.loader.clone());
    let mut epochs = Vec::new();

    for epoch in 0..settings.epochs {
        let start = Instant::now();
        let mut items = 0usize;
        let mut failed = 0usize;
        let mut rms_sum = 0f64;
        let mut peak = 0f32;

        for item in loader.epoch(epoch)? {
            match item.result {
                Ok(window) => {
                    items += 1;
                    let samples = window.to_interleaved();
                    let sum_sq: f64 = samples.iter().map(|s| (*s as f64).powi(2)).sum();
                    rms_sum += (sum_sq / samples.len().max(1) as f64).sqrt();
                    peak = samples.iter().fold(peak, |p, s| p.max(s.abs()));
                }
                Err(e) => {
                    failed += 1;
                    warn!(position = item.position, "skipping item: {e}");
                }
            }
        }

        let summary = EpochSummary {
            epoch,
            items,
            failed,
            elapsed_ms: start.elapsed().as_secs_f64() * 1_000.0,
            mean_rms: rms_sum / items.max(1) as f64,
            peak,
        };
        info!(
            epoch,
            items,
            failed,
            elapsed_ms = summary.elapsed_ms,
            "epoch finished"
        );
        epochs.push(summary);
    }

    let summary = RunSummary {
        dataset_root: root.display().to_string(),
        files: dataset.len(),
        native_sample_rate: dataset.native_sample_rate(),
        target_rate: settings.target.target_rate,
        target_samples: settings.target.target_samples(),
        workers: settings.loader.num_workers,
        epochs,
    };
    let json = serde_json::to_string_pretty(&summary)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("writing summary to {}", path.display()))?;
            info!(path = %path.display(), "summary written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
