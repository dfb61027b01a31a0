//! weathervane – public crate root
//! ===============================
//! Weather-event audio classifier (mel-spectrogram front-end + Candle back-end).
//!
//! * **Front-end**: decode → mono → resample → fixed length → mel dB matrix.
//! * **Dataset**: labeled directory walk, fixed-shape tensors, seeded split.
//! * **Training**: epoch loop with checkpoint / plateau / early-stop policies
//!   driving any [`Classifier`]; [`SpectrogramNet`] is the bundled one.
//!
//! Everything is configured by one immutable [`PipelineConfig`].
//
//  ───────────────────────────────────────────────────────────────────────────
//  `desktop` (default) turns on rayon file-level parallelism in the loader.
//  ───────────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]

/* ────────────────────────  sub-modules  ─────────────────────────────── */
pub mod audio;
pub mod config;
pub mod constants;
pub mod corpus;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod training;

/* ───────────────────────── public façade ─────────────────────────────── */
pub use audio::{AudioError, AudioNormalizer, Waveform};
pub use config::{ConfigError, PipelineConfig};
pub use corpus::{Corpus, CorpusLoader, LabelVocabulary, Sample};
pub use dataset::{DatasetSplitter, PreparedSet, Split, TensorPreparer, TensorSet};
pub use error::{Error, Result};
pub use features::{FeatureMatrix, SpectrogramExtractor};
pub use model::{ArchiveError, ModelArchive, ModelType, SpectrogramNet};
pub use pipeline::{Prediction, Predictor, TrainSummary};
pub use training::{
    Classifier, ClassifierState, TrainingController, TrainingHistory, TrainingOutcome,
    TrainingPhase,
};
