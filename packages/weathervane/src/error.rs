//! Crate-level error type.
//!
//! Per-file failures ([`Error::FileRead`]) are the only recoverable kind: the
//! corpus loader logs and skips them. Everything else aborts the run with the
//! offending path / label / shape in the message.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    audio::AudioError, config::ConfigError, features::SpectrogramError, model::ArchiveError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: AudioError,
    },

    #[error("cannot extract features from {}: {source}", path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: SpectrogramError,
    },

    #[error("no class directories found under {}", root.display())]
    EmptyCorpus { root: PathBuf },

    #[error("cannot list corpus root {}: {source}", root.display())]
    CorpusRoot {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("label \"{0}\" is not part of the vocabulary")]
    UnknownLabel(String),

    #[error("no samples to prepare")]
    NoSamples,

    #[error("training needs non-empty splits (train={train}, eval={eval})")]
    EmptySplit { train: usize, eval: usize },

    #[error("batch computation failed: {0}")]
    BatchComputation(#[from] candle_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Spectrogram(#[from] SpectrogramError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// `true` for failures the corpus loader may skip over.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::FileRead { .. })
    }

    pub(crate) fn shape(context: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Result alias used across the public API.
pub type Result<T> = std::result::Result<T, Error>;
