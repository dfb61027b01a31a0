/// DEFAULT_SAMPLE_RATE is the rate every clip is resampled to before feature extraction.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// DEFAULT_DURATION_SECS is the fixed clip length after padding / trimming.
pub const DEFAULT_DURATION_SECS: f64 = 2.0;

/// DEFAULT_FFT_SIZE is the STFT window length in samples.
pub const DEFAULT_FFT_SIZE: usize = 2048;

/// DEFAULT_HOP_LENGTH is the STFT hop in samples.
pub const DEFAULT_HOP_LENGTH: usize = 200;

/// DEFAULT_NUM_BANDS is the number of mel bands (feature matrix height).
pub const DEFAULT_NUM_BANDS: usize = 260;

/// DEFAULT_FREQ_MIN is the lower edge of the mel filterbank in Hz.
pub const DEFAULT_FREQ_MIN: f32 = 20.0;

/// DEFAULT_FREQ_MAX is the upper edge of the mel filterbank in Hz.
pub const DEFAULT_FREQ_MAX: f32 = 13_000.0;

/// DEFAULT_DYNAMIC_RANGE_DB is the clamp depth below the spectrogram peak.
pub const DEFAULT_DYNAMIC_RANGE_DB: f32 = 80.0;

/// Floor applied to power values before taking the logarithm.
pub(crate) const POWER_FLOOR: f32 = 1e-10;

/// Classifier input height.
pub const DEFAULT_TENSOR_HEIGHT: usize = 224;

/// Classifier input width.
pub const DEFAULT_TENSOR_WIDTH: usize = 224;

/// Classifier input channels (spectrogram replicated into an RGB-like stack).
pub const DEFAULT_TENSOR_CHANNELS: usize = 3;

/// DEFAULT_EVAL_FRACTION is the share of samples held out for evaluation.
pub const DEFAULT_EVAL_FRACTION: f64 = 0.2;

/// DEFAULT_SEED drives splitting, shuffling and augmentation.
pub const DEFAULT_SEED: u64 = 42;

/// Probability clamp used by the categorical cross-entropy.
pub(crate) const PROB_EPSILON: f32 = 1e-7;

/// On-disk model archive extension.
pub const MODEL_ARCHIVE_EXTENSION: &str = "wvc";
