//! **Audio decoding → mono `f32`**
//!
//! * `.wav` goes through `hound` (int 8/16/24/32, float 32).
//! * Anything else, and WAV encodings `hound` refuses, goes through `symphonia`.
//! * Channels are averaged into one; the source sample-rate is reported as-is.

use std::{fs::File, path::Path};

use hound::WavReader;
use log::debug;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use super::AudioError;

/// Mono PCM at the file's native sample-rate.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Decode any supported file into mono samples.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, AudioError> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    let decoded = if is_wav {
        match decode_wav(path) {
            Err(AudioError::Wav(hound::Error::Unsupported)) => {
                debug!("hound refused {}, retrying with symphonia", path.display());
                decode_symphonia(path)?
            }
            other => other?,
        }
    } else {
        decode_symphonia(path)?
    };

    if decoded.samples.is_empty() || decoded.sample_rate == 0 {
        return Err(AudioError::Empty);
    }
    Ok(decoded)
}

/* ───────────────────────── WAV fast-path ───────────────────────── */

fn decode_wav(path: &Path) -> Result<DecodedAudio, AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(AudioError::Unsupported(format!(
                    "{}-bit float wav",
                    spec.bits_per_sample
                )));
            }
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::Unsupported(format!(
                    "{}-bit int wav",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples: mix_down(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/* ───────────────────────── generic containers ───────────────────────── */

fn decode_symphonia(path: &Path) -> Result<DecodedAudio, AudioError> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    // Find the first audio track with a known (decodeable) codec.
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        // If the packet does not belong to the selected track, skip over it.
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("{}: dropping corrupt packet ({msg})", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mono.extend(mix_down(buf.samples(), spec.channels.count()));
    }

    Ok(DecodedAudio {
        samples: mono,
        sample_rate: sample_rate
            .ok_or_else(|| AudioError::Unsupported("unknown sample rate".into()))?,
    })
}

/* ────────────────────── utils ────────────────────── */

/// Average interleaved channels into one.
pub(crate) fn mix_down(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let inv = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * inv)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_wav(path: &Path, spec: WavSpec, frames: &[i16]) {
        let mut w = WavWriter::create(path, spec).unwrap();
        for &s in frames {
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn stereo_is_averaged() {
        assert_eq!(mix_down(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(mix_down(&[0.25, -0.25], 1), vec![0.25, -0.25]);
    }

    #[test]
    fn decodes_int16_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[16_384, 0, -16_384, 0, 0, 0]);

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.sample_rate, 22_050);
        assert_eq!(audio.samples.len(), 3);
        assert!((audio.samples[0] - 0.25).abs() < 1e-6);
        assert!((audio.samples[1] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"definitely not RIFF").unwrap();
        assert!(decode_file(&path).is_err());

        let other = dir.path().join("broken.ogg");
        std::fs::write(&other, b"OggS but not really").unwrap();
        assert!(decode_file(&other).is_err());
    }

    #[test]
    fn empty_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_wav(&path, spec, &[]);
        assert!(matches!(decode_file(&path), Err(AudioError::Empty)));
    }
}
