//! **SpectrogramExtractor**: normalized waveform → log-mel feature matrix.
//!
//! * Centred STFT (zero padding of `fft_size / 2` on both ends), periodic Hann window.
//! * Power spectrum |X|² mapped through a Slaney mel filterbank.
//! * Decibels referenced to the matrix peak, clamped at `peak - dynamic_range_db`.
//!
//! The FFT plan and filterbank are built once in [`SpectrogramExtractor::new`];
//! `extract` takes `&self` and is safe to share across worker threads.

use std::{f32::consts::PI, sync::Arc};

use ndarray::Array2;
use rustfft::{Fft, FftPlanner, num_complex::Complex32};
use thiserror::Error;

use crate::{audio::Waveform, config::SpectrogramConfig, constants::POWER_FLOOR};

use super::mel::MelFilterbank;

/// `bands × frames` log-mel energies.
pub type FeatureMatrix = Array2<f32>;

#[derive(Debug, Error)]
pub enum SpectrogramError {
    #[error("invalid spectrogram parameters: {0}")]
    InvalidParams(String),
    #[error("waveform sample-rate {found} Hz differs from extractor rate {expected} Hz")]
    RateMismatch { expected: u32, found: u32 },
    #[error("waveform is empty")]
    EmptyWaveform,
}

pub struct SpectrogramExtractor {
    sample_rate: u32,
    fft_size: usize,
    hop_length: usize,
    dynamic_range_db: f32,

    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    filterbank: MelFilterbank,
}

impl std::fmt::Debug for SpectrogramExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrogramExtractor")
            .field("sample_rate", &self.sample_rate)
            .field("fft_size", &self.fft_size)
            .field("hop_length", &self.hop_length)
            .field("num_bands", &self.filterbank.num_bands())
            .field("dynamic_range_db", &self.dynamic_range_db)
            .finish()
    }
}

impl SpectrogramExtractor {
    pub fn new(cfg: &SpectrogramConfig, sample_rate: u32) -> Result<Self, SpectrogramError> {
        let invalid = |msg: String| Err(SpectrogramError::InvalidParams(msg));
        let nyquist = sample_rate as f32 / 2.0;

        if cfg.fft_size < 2 {
            return invalid(format!("fft_size {} must be >= 2", cfg.fft_size));
        }
        if cfg.hop_length == 0 {
            return invalid("hop_length must be > 0".into());
        }
        if cfg.num_bands == 0 {
            return invalid("num_bands must be > 0".into());
        }
        if !(cfg.freq_min >= 0.0 && cfg.freq_min < cfg.freq_max && cfg.freq_max <= nyquist) {
            return invalid(format!(
                "frequency range [{}, {}] must satisfy 0 <= min < max <= {nyquist}",
                cfg.freq_min, cfg.freq_max
            ));
        }
        if !(cfg.dynamic_range_db > 0.0) {
            return invalid("dynamic_range_db must be > 0".into());
        }

        let fft = FftPlanner::<f32>::new().plan_fft_forward(cfg.fft_size);
        let window = (0..cfg.fft_size)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / cfg.fft_size as f32).cos())
            .collect();
        let filterbank = MelFilterbank::new(
            sample_rate,
            cfg.fft_size,
            cfg.num_bands,
            cfg.freq_min,
            cfg.freq_max,
        );

        Ok(Self {
            sample_rate,
            fft_size: cfg.fft_size,
            hop_length: cfg.hop_length,
            dynamic_range_db: cfg.dynamic_range_db,
            fft,
            window,
            filterbank,
        })
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.filterbank.num_bands()
    }

    /// Frames produced for a waveform of `len` samples.
    #[inline]
    pub fn num_frames(&self, len: usize) -> usize {
        let padded = len + 2 * (self.fft_size / 2);
        if padded < self.fft_size {
            0
        } else {
            1 + (padded - self.fft_size) / self.hop_length
        }
    }

    /// Compute the clamped log-mel matrix of one waveform.
    pub fn extract(&self, waveform: &Waveform) -> Result<FeatureMatrix, SpectrogramError> {
        if waveform.sample_rate != self.sample_rate {
            return Err(SpectrogramError::RateMismatch {
                expected: self.sample_rate,
                found: waveform.sample_rate,
            });
        }
        if waveform.is_empty() {
            return Err(SpectrogramError::EmptyWaveform);
        }

        let power = self.power_spectrogram(&waveform.samples);
        let mut mel = self.filterbank.apply(&power);
        self.to_clamped_db(&mut mel);
        Ok(mel)
    }

    /* -------- helpers ------------------------------------------------- */

    /// `freqs × frames` power spectrogram.
    fn power_spectrogram(&self, samples: &[f32]) -> Array2<f32> {
        let pad = self.fft_size / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let frames = self.num_frames(samples.len());
        let n_freqs = self.fft_size / 2 + 1;
        let mut power = Array2::<f32>::zeros((n_freqs, frames));
        let mut buf = vec![Complex32::new(0.0, 0.0); self.fft_size];

        for t in 0..frames {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.fft_size];
            for (dst, (&x, &w)) in buf.iter_mut().zip(frame.iter().zip(&self.window)) {
                *dst = Complex32::new(x * w, 0.0);
            }
            self.fft.process(&mut buf);

            for (k, c) in buf.iter().take(n_freqs).enumerate() {
                power[[k, t]] = c.norm_sqr();
            }
        }
        power
    }

    fn to_clamped_db(&self, mel: &mut Array2<f32>) {
        mel.mapv_inplace(|p| 10.0 * p.max(POWER_FLOOR).log10());
        let peak = mel.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = -self.dynamic_range_db;
        mel.mapv_inplace(|db| (db - peak).max(floor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sr: u32, len: usize) -> Waveform {
        Waveform {
            samples: (0..len)
                .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin() * 0.5)
                .collect(),
            sample_rate: sr,
        }
    }

    fn small_cfg() -> SpectrogramConfig {
        SpectrogramConfig {
            fft_size: 512,
            hop_length: 128,
            num_bands: 40,
            freq_min: 20.0,
            freq_max: 7_600.0,
            dynamic_range_db: 80.0,
        }
    }

    #[test]
    fn default_shape_for_two_second_clip() {
        let ext = SpectrogramExtractor::new(&SpectrogramConfig::default(), 16_000).unwrap();
        let m = ext.extract(&tone(1_000.0, 16_000, 32_000)).unwrap();
        assert_eq!(m.dim(), (260, 161));
    }

    #[test]
    fn output_is_deterministic() {
        let ext = SpectrogramExtractor::new(&small_cfg(), 16_000).unwrap();
        let w = tone(440.0, 16_000, 8_000);
        let a = ext.extract(&w).unwrap();
        let b = ext.extract(&w).unwrap();
        let bits_a: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn dynamic_range_is_clamped_below_peak() {
        let ext = SpectrogramExtractor::new(&small_cfg(), 16_000).unwrap();
        let m = ext.extract(&tone(2_000.0, 16_000, 8_000)).unwrap();
        let max = m.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let min = m.iter().copied().fold(f32::INFINITY, f32::min);
        assert_eq!(max, 0.0);
        assert!(min >= -80.0);
        // pure tone: most bands sit on the floor
        assert_eq!(min, -80.0);
    }

    #[test]
    fn tone_energy_lands_in_matching_band() {
        let ext = SpectrogramExtractor::new(&small_cfg(), 16_000).unwrap();
        let low = ext.extract(&tone(300.0, 16_000, 8_000)).unwrap();
        let high = ext.extract(&tone(5_000.0, 16_000, 8_000)).unwrap();

        let argmax_band = |m: &FeatureMatrix| {
            let col = m.column(m.ncols() / 2);
            col.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
                .0
        };
        assert!(argmax_band(&low) < argmax_band(&high));
    }

    #[test]
    fn silence_is_flat() {
        let ext = SpectrogramExtractor::new(&small_cfg(), 16_000).unwrap();
        let m = ext
            .extract(&Waveform {
                samples: vec![0.0; 4_000],
                sample_rate: 16_000,
            })
            .unwrap();
        assert!(m.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejects_bad_parameters_and_rates() {
        let mut cfg = small_cfg();
        cfg.freq_max = 9_000.0;
        assert!(SpectrogramExtractor::new(&cfg, 16_000).is_err());

        let ext = SpectrogramExtractor::new(&small_cfg(), 16_000).unwrap();
        let err = ext.extract(&tone(440.0, 8_000, 4_000)).unwrap_err();
        assert!(matches!(err, SpectrogramError::RateMismatch { .. }));
    }
}
