//! weathervane CLI binary
//! Weather-event audio classifier using Candle ML

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

mod cli;
use cli::{Cli, Commands};

use weathervane::{
    ModelArchive, PipelineConfig, Predictor, TrainingOutcome, pipeline::train_from_dir,
};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(cmd) => {
            info!("Training weather-event classifier...");
            train(cmd)
        }
        Commands::Classify(cmd) => classify(cmd),
        Commands::Inspect(cmd) => {
            info!("Inspecting model...");
            inspect(cmd)
        }
    }
}

fn train(cmd: cli::TrainCommand) -> Result<()> {
    let mut cfg = match &cmd.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    // CLI flags win over the file
    if let Some(m) = cmd.model_type {
        cfg.training.model_type = m;
    }
    if let Some(e) = cmd.epochs {
        cfg.training.epochs = e;
    }
    if let Some(b) = cmd.batch_size {
        cfg.training.batch_size = b;
    }
    if let Some(lr) = cmd.learning_rate {
        cfg.training.learning_rate = lr;
    }
    if let Some(seed) = cmd.seed {
        cfg.split.seed = seed;
        cfg.training.seed = seed;
    }

    let summary = train_from_dir(&cmd.data_dir, &cfg, &cmd.output)
        .with_context(|| format!("Training on {} failed", cmd.data_dir.display()))?;

    println!("Classes:");
    for (label, n) in &summary.class_counts {
        println!("  {label}: {n} recordings");
    }
    if !summary.skipped.is_empty() {
        warn!("{} files skipped", summary.skipped.len());
        for s in &summary.skipped {
            println!("  skipped {}: {}", s.path.display(), s.reason);
        }
    }
    println!(
        "Split: {} train / {} eval",
        summary.train_size, summary.eval_size
    );
    match summary.history.outcome {
        TrainingOutcome::EarlyStopped { best_epoch } => println!(
            "Stopped early after {} epochs (best epoch {})",
            summary.history.len(),
            best_epoch.map_or_else(|| "-".to_owned(), |e| e.to_string())
        ),
        outcome => println!("{outcome} after {} epochs", summary.history.len()),
    }
    if let Some(best) = summary.history.best() {
        println!(
            "Best eval loss {:.4}, accuracy {:.1}%",
            best.eval_loss,
            best.eval_accuracy * 100.0
        );
    }
    if let Some(d) = &summary.history.divergence {
        warn!("{d}");
    }
    println!("Model:   {}", summary.archive_path.display());
    println!("Export:  {}", summary.export_dir.display());
    println!("History: {}", summary.history_path.display());
    Ok(())
}

fn classify(cmd: cli::ClassifyCommand) -> Result<()> {
    let predictor = Predictor::open(&cmd.model)
        .with_context(|| format!("Failed to load model {}", cmd.model.display()))?;

    for file in &cmd.files {
        let p = predictor
            .classify_file(file)
            .with_context(|| format!("Failed to classify {}", file.display()))?;
        println!(
            "{}\t{}\t{:.1}%",
            file.display(),
            p.label,
            p.confidence * 100.0
        );
        if cmd.verbose {
            for (label, prob) in &p.probabilities {
                println!("    {label:<16} {prob:.4}");
            }
        }
    }
    Ok(())
}

fn inspect(cmd: cli::InspectCommand) -> Result<()> {
    let model = if cmd.model_path.is_dir() {
        ModelArchive::import_dir(&cmd.model_path)
    } else {
        ModelArchive::open(&cmd.model_path)
    }
    .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?;

    println!("Model Information:");
    println!("  Version: {}", model.version());
    println!("  Type: {}", model.model_type);
    println!("  Labels: {:?}", model.labels.iter().collect::<Vec<_>>());
    println!("  Padded shape: {:?}", model.padded_shape);
    println!("  Input shape: {:?}", model.input_shape());
    println!(
        "  Audio: {} Hz, {} s",
        model.config.audio.sample_rate, model.config.audio.duration_secs
    );

    println!("  Weights:");
    for (name, tensor_data) in &model.weights.tensors {
        println!(
            "    {}: dims {:?}, dtype {}, {} bytes",
            name,
            tensor_data.dims,
            tensor_data.d_type,
            tensor_data.bytes.len()
        );
    }

    Ok(())
}
