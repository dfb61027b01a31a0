//! Slaney-style mel filterbank (area-normalised triangular filters).

use ndarray::Array2;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1_000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

#[inline]
fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz → mel (linear below 1 kHz, logarithmic above).
#[inline]
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    }
}

/// Inverse of [`hz_to_mel`].
#[inline]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    }
}

/// `[num_bands, fft_size / 2 + 1]` weight matrix.
#[derive(Clone, Debug)]
pub struct MelFilterbank {
    weights: Array2<f32>,
}

impl MelFilterbank {
    pub fn new(
        sample_rate: u32,
        fft_size: usize,
        num_bands: usize,
        freq_min: f32,
        freq_max: f32,
    ) -> Self {
        let n_freqs = fft_size / 2 + 1;
        let sr = sample_rate as f64;

        let fft_freqs: Vec<f64> = (0..n_freqs)
            .map(|k| k as f64 * sr / fft_size as f64)
            .collect();

        // num_bands + 2 edges, evenly spaced on the mel axis
        let mel_lo = hz_to_mel(freq_min as f64);
        let mel_hi = hz_to_mel(freq_max as f64);
        let edges: Vec<f64> = (0..num_bands + 2)
            .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f64 / (num_bands + 1) as f64))
            .collect();

        let mut weights = Array2::<f32>::zeros((num_bands, n_freqs));
        for band in 0..num_bands {
            let (left, centre, right) = (edges[band], edges[band + 1], edges[band + 2]);
            let norm = 2.0 / (right - left);

            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - left) / (centre - left);
                let upper = (right - f) / (right - centre);
                let w = lower.min(upper).max(0.0);
                weights[[band, k]] = (w * norm) as f32;
            }
        }
        Self { weights }
    }

    #[inline]
    pub fn num_bands(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn num_freqs(&self) -> usize {
        self.weights.ncols()
    }

    /// Borrow the raw weights (`bands × freqs`).
    #[inline]
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Map a `freqs × frames` power spectrogram onto the mel bands.
    pub fn apply(&self, power: &Array2<f32>) -> Array2<f32> {
        self.weights.dot(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0, 20.0, 440.0, 999.0, 1_000.0, 4_000.0, 13_000.0] {
            assert_relative_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-6);
        }
        assert_relative_eq!(hz_to_mel(1_000.0), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn mel_scale_is_monotonic() {
        let mut prev = -1.0;
        for hz in (0..16_000).step_by(250) {
            let m = hz_to_mel(hz as f64);
            assert!(m > prev);
            prev = m;
        }
    }

    #[test]
    fn filterbank_shape_and_sign() {
        let fb = MelFilterbank::new(16_000, 2048, 260, 20.0, 13_000.0);
        assert_eq!(fb.num_bands(), 260);
        assert_eq!(fb.num_freqs(), 1025);
        assert!(fb.weights().iter().all(|&w| w >= 0.0 && w.is_finite()));
    }

    #[test]
    fn wide_bands_cover_their_centre() {
        let fb = MelFilterbank::new(16_000, 512, 20, 0.0, 8_000.0);
        for row in fb.weights().rows() {
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }
}
