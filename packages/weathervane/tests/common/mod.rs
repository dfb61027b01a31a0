//! Shared fixtures: tiny configs and synthetic WAV corpora.
#![allow(dead_code)]

use std::{f32::consts::PI, fs, path::Path};

use weathervane::{
    PipelineConfig,
    config::{AudioConfig, SpectrogramConfig, TensorConfig},
};

/// Fast front-end: 8 kHz, half a second, 32 bands, 16×16×3 tensors.
pub fn small_config() -> PipelineConfig {
    let mut cfg = PipelineConfig {
        audio: AudioConfig {
            sample_rate: 8_000,
            duration_secs: 0.5,
        },
        spectrogram: SpectrogramConfig {
            fft_size: 256,
            hop_length: 64,
            num_bands: 32,
            freq_min: 20.0,
            freq_max: 4_000.0,
            dynamic_range_db: 80.0,
        },
        tensor: TensorConfig {
            height: 16,
            width: 16,
            channels: 3,
        },
        ..Default::default()
    };
    cfg.training.epochs = 2;
    cfg.training.batch_size = 4;
    cfg.training.model_type = weathervane::ModelType::Tiny;
    cfg
}

/// Mono 16-bit sine of `secs` seconds.
pub fn write_tone(path: &Path, freq: f32, secs: f32, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    let n = (secs * sample_rate as f32) as usize;
    for i in 0..n {
        let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5;
        w.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    w.finalize().unwrap();
}

/// `root/rain` (low tones) and `root/thunder` (high tones), `per_class` clips
/// each, all shorter than the configured duration and of varying length.
pub fn weather_corpus(root: &Path, per_class: usize) {
    for (class, base) in [("rain", 300.0), ("thunder", 1_800.0)] {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..per_class {
            let secs = 0.15 + 0.05 * i as f32;
            write_tone(
                &dir.join(format!("{class}_{i:02}.wav")),
                base + 40.0 * i as f32,
                secs,
                8_000,
            );
        }
    }
}
