//! Print the mel-spectrogram a clip turns into
//!
//! Runs one file through the same front-end the trainer uses and reports the
//! matrix shape and dB range per band group.
//!
//! Usage:
//!   cargo run --example feature_dump -- <AUDIO_FILE> [--config cfg.toml]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use weathervane::{AudioNormalizer, PipelineConfig, SpectrogramExtractor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Audio file to analyse
    file: PathBuf,

    /// Optional TOML configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of band groups to summarise
    #[arg(short, long, default_value_t = 8)]
    groups: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(p) => PipelineConfig::from_file(p).context("loading config")?,
        None => PipelineConfig::default(),
    };

    let waveform = AudioNormalizer::new(&cfg.audio)
        .normalize(&args.file)
        .with_context(|| format!("normalizing {}", args.file.display()))?;
    let features = SpectrogramExtractor::new(&cfg.spectrogram, cfg.audio.sample_rate)?
        .extract(&waveform)?;

    let (bands, frames) = features.dim();
    println!(
        "{}: {} samples @ {} Hz → {bands} bands × {frames} frames",
        args.file.display(),
        waveform.len(),
        waveform.sample_rate
    );

    let per_group = bands.div_ceil(args.groups.max(1));
    for (g, rows) in features
        .axis_chunks_iter(ndarray::Axis(0), per_group)
        .enumerate()
    {
        let (lo, hi) = rows
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let mean = rows.mean().unwrap_or(f32::NAN);
        println!(
            "  bands {:>3}-{:<3} min {lo:>7.1} dB  mean {mean:>7.1} dB  max {hi:>7.1} dB",
            g * per_group,
            g * per_group + rows.nrows() - 1
        );
    }
    Ok(())
}
