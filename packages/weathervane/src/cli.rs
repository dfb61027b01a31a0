//! Command line interface for the weathervane classifier.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use weathervane::ModelType;

/// Weather-event audio classifier
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier from a `<root>/<class>/<clip>` corpus
    Train(TrainCommand),

    /// Classify one or more audio files with a trained model
    Classify(ClassifyCommand),

    /// Inspect a trained model
    Inspect(InspectCommand),
}

#[derive(Parser, Debug)]
pub struct TrainCommand {
    /// Corpus root; every sub-directory is one class
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Output directory for model.wvc, model/ and history.json
    #[arg(short, long)]
    pub output: PathBuf,

    /// TOML configuration file (defaults are used for missing keys)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model type (tiny, small, medium, large)
    #[arg(short, long)]
    pub model_type: Option<ModelType>,

    /// Number of training epochs
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Batch size
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Seed for splitting, shuffling and augmentation
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct ClassifyCommand {
    /// Path to a .wvc archive or an exported model directory
    #[arg(short, long)]
    pub model: PathBuf,

    /// Audio files to classify
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Print the full probability vector
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct InspectCommand {
    /// Path to the model file to inspect
    pub model_path: PathBuf,
}
