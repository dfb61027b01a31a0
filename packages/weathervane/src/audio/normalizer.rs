//! **AudioNormalizer**
//!
//! 1. Decode any supported file → mono `f32` (see [`decode_file`]).
//! 2. Resample to the configured rate (see [`resample_mono`]).
//! 3. Force the exact sample count: centred zero-padding when short,
//!    centred trim when long, untouched when equal.

use std::path::Path;

use crate::config::AudioConfig;

use super::{AudioError, decode_file, resample_mono};

/// Mono PCM at a known sample-rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Loads one clip and brings it to `sample_rate × duration` samples.
#[derive(Clone, Debug)]
pub struct AudioNormalizer {
    sample_rate: u32,
    required_samples: usize,
}

impl AudioNormalizer {
    pub fn new(cfg: &AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            required_samples: cfg.required_samples(),
        }
    }

    /// Load, resample and fit one file.
    pub fn normalize<P: AsRef<Path>>(&self, path: P) -> Result<Waveform, AudioError> {
        let decoded = decode_file(path.as_ref())?;
        self.normalize_samples(&decoded.samples, decoded.sample_rate)
    }

    /// Same as [`normalize`](Self::normalize) for samples already in memory.
    pub fn normalize_samples(
        &self,
        samples: &[f32],
        source_rate: u32,
    ) -> Result<Waveform, AudioError> {
        let resampled = resample_mono(samples, source_rate, self.sample_rate)?;
        Ok(Waveform {
            samples: fit_to_length(resampled, self.required_samples),
            sample_rate: self.sample_rate,
        })
    }
}

/// Centre `samples` inside exactly `required` slots.
pub fn fit_to_length(mut samples: Vec<f32>, required: usize) -> Vec<f32> {
    let len = samples.len();
    if len < required {
        let pad_left = (required - len) / 2;
        let mut out = vec![0.0; required];
        out[pad_left..pad_left + len].copy_from_slice(&samples);
        out
    } else if len > required {
        let start = (len - required) / 2;
        samples.drain(..start);
        samples.truncate(required);
        samples
    } else {
        samples
    }
}
