//! Immutable pipeline configuration.
//!
//! One [`PipelineConfig`] is built up-front (defaults, TOML file, CLI overrides)
//! and handed by reference to every component constructor. Nothing reads a
//! global; two pipelines with different configs can live in the same process.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{constants::*, model::ModelType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/* ───────────────────────── sections ───────────────────────── */

/// Loading / normalization parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Target clip duration in seconds.
    pub duration_secs: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl AudioConfig {
    /// Exact sample count every normalized waveform must have.
    #[inline]
    pub fn required_samples(&self) -> usize {
        (self.sample_rate as f64 * self.duration_secs).round() as usize
    }
}

/// Spectral analysis parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    pub fft_size: usize,
    pub hop_length: usize,
    pub num_bands: usize,
    pub freq_min: f32,
    pub freq_max: f32,
    pub dynamic_range_db: f32,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            hop_length: DEFAULT_HOP_LENGTH,
            num_bands: DEFAULT_NUM_BANDS,
            freq_min: DEFAULT_FREQ_MIN,
            freq_max: DEFAULT_FREQ_MAX,
            dynamic_range_db: DEFAULT_DYNAMIC_RANGE_DB,
        }
    }
}

/// Fixed classifier input shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensorConfig {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Default for TensorConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_TENSOR_HEIGHT,
            width: DEFAULT_TENSOR_WIDTH,
            channels: DEFAULT_TENSOR_CHANNELS,
        }
    }
}

impl TensorConfig {
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }
}

/// Train / eval partitioning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub eval_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            eval_fraction: DEFAULT_EVAL_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

/// Random affine augmentation ranges (all symmetric around zero / one).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Max rotation in degrees.
    pub rotation_degrees: f32,
    /// Max horizontal shift as a fraction of the width.
    pub width_shift: f32,
    /// Max vertical shift as a fraction of the height.
    pub height_shift: f32,
    /// Max shear angle in degrees.
    pub shear_degrees: f32,
    /// Zoom factor is drawn from `[1 - zoom, 1 + zoom]`.
    pub zoom: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            rotation_degrees: 10.0,
            width_shift: 0.1,
            height_shift: 0.1,
            shear_degrees: 5.0,
            zoom: 0.1,
        }
    }
}

impl AugmentConfig {
    /// Parameters that leave every tensor untouched.
    pub fn identity() -> Self {
        Self {
            rotation_degrees: 0.0,
            width_shift: 0.0,
            height_shift: 0.0,
            shear_degrees: 0.0,
            zoom: 0.0,
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Learning-rate decay on evaluation-loss plateaus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauConfig {
    pub patience: usize,
    pub factor: f64,
    pub min_lr: f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            patience: 3,
            factor: 0.5,
            min_lr: 1e-6,
        }
    }
}

/// Hyper-parameters accepted by the training controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Epochs without eval-loss improvement before stopping.
    pub patience_stop: usize,
    pub plateau: PlateauConfig,
    pub augment: AugmentConfig,
    /// Seed for batch shuffling and augmentation.
    pub seed: u64,
    /// Default network size preset.
    pub model_type: ModelType,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            patience_stop: 8,
            plateau: PlateauConfig::default(),
            augment: AugmentConfig::default(),
            seed: DEFAULT_SEED,
            model_type: ModelType::Small,
        }
    }
}

/* ───────────────────────── root ───────────────────────── */

/// Complete configuration of one training / inference run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub audio: AudioConfig,
    pub spectrogram: SpectrogramConfig,
    pub tensor: TensorConfig,
    pub split: SplitConfig,
    pub training: TrainConfig,
}

impl PipelineConfig {
    /// Read a TOML file; missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Cross-field sanity checks. Spectral limits are re-checked by the extractor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_owned()));

        if self.audio.sample_rate == 0 {
            return invalid("audio.sample_rate must be > 0");
        }
        if !(self.audio.duration_secs > 0.0) {
            return invalid("audio.duration_secs must be > 0");
        }
        if self.audio.required_samples() == 0 {
            return invalid("audio.sample_rate * audio.duration_secs rounds to zero samples");
        }
        if self.tensor.height == 0 || self.tensor.width == 0 || self.tensor.channels == 0 {
            return invalid("tensor dimensions must be > 0");
        }
        if !(0.0..=1.0).contains(&self.split.eval_fraction) {
            return invalid("split.eval_fraction must lie in [0, 1]");
        }
        if self.training.batch_size == 0 {
            return invalid("training.batch_size must be > 0");
        }
        if !(self.training.learning_rate > 0.0) {
            return invalid("training.learning_rate must be > 0");
        }
        if !(self.training.plateau.factor > 0.0 && self.training.plateau.factor < 1.0) {
            return invalid("training.plateau.factor must lie in (0, 1)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_front_end() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.required_samples(), 32_000);
        assert_eq!(cfg.spectrogram.fft_size, 2048);
        assert_eq!(cfg.spectrogram.hop_length, 200);
        assert_eq!(cfg.spectrogram.num_bands, 260);
        assert_eq!(cfg.split.eval_fraction, 0.2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
            [audio]
            duration_secs = 1.5

            [training]
            epochs = 3
            model_type = "tiny"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.audio.required_samples(), 24_000);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.training.epochs, 3);
        assert_eq!(cfg.training.model_type, ModelType::Tiny);
        assert_eq!(cfg.training.batch_size, 32);
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let err = PipelineConfig::from_toml_str("[split]\neval_fraction = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_duration_shorter_than_one_sample() {
        let mut cfg = PipelineConfig::default();
        cfg.audio.duration_secs = 0.00001;
        assert_eq!(cfg.audio.required_samples(), 0);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
