//! Single-point mono resampler (rubato FFT, host-side only).
//
//  The FFT resampler delays its output by `output_delay()` frames; the delay is
//  cut from the front and the tail flushed so that the returned length is
//  exactly `ceil(len * sr_out / sr_in)`.

use rubato::{FftFixedIn, Resampler};

use super::AudioError;

const CHUNK: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Resample mono PCM from `sr_in` to `sr_out`.
pub fn resample_mono(input: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>, AudioError> {
    if sr_in == sr_out || input.is_empty() {
        return Ok(input.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(sr_in as usize, sr_out as usize, CHUNK, SUB_CHUNKS, 1)?;

    let expected = (input.len() as u64 * sr_out as u64).div_ceil(sr_in as u64) as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + CHUNK);

    let mut chunks = input.chunks_exact(CHUNK);
    for chunk in chunks.by_ref() {
        let frames = resampler.process(&[chunk], None)?;
        out.extend_from_slice(&frames[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let frames = resampler.process_partial(Some(&[rest][..]), None)?;
        out.extend_from_slice(&frames[0]);
    }

    // flush the delay line with silence
    while out.len() < expected + delay {
        let frames = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    let end = (delay + expected).min(out.len());
    Ok(out[delay.min(end)..end].to_vec())
}
