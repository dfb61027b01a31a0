pub mod mel;
pub mod spectrogram;

pub use mel::MelFilterbank;
pub use spectrogram::{FeatureMatrix, SpectrogramError, SpectrogramExtractor};
