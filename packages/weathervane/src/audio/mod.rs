pub mod decode;
pub mod normalizer;
pub mod resample;

/* handy re-exports */
pub use decode::{DecodedAudio, decode_file};
pub use normalizer::{AudioNormalizer, Waveform, fit_to_length};
pub use resample::resample_mono;

use thiserror::Error;

/// Per-file load failure. The corpus loader treats every variant as "skip".
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    #[error("decode: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("no decodable audio track")]
    NoTrack,
    #[error("unsupported audio: {0}")]
    Unsupported(String),
    #[error("stream contains no samples")]
    Empty,
    #[error(transparent)]
    ResamplerConstruct(#[from] rubato::ResamplerConstructionError),
    #[error(transparent)]
    Resample(#[from] rubato::ResampleError),
}
