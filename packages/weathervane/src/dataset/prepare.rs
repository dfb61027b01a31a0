//! Feature matrices → fixed-shape classifier input.
//!
//! pad (bottom / right zeros) → bilinear resize → channel replicate.
//! Targets are one-hot through the corpus vocabulary.

use log::debug;
use ndarray::{Array1, Array2, Array3, Axis, s};

use crate::{
    Error, Result,
    config::TensorConfig,
    corpus::{LabelVocabulary, Sample},
    features::FeatureMatrix,
};

/// Parallel tensors / targets, index `i` of one belongs to index `i` of the other.
#[derive(Clone, Debug, Default)]
pub struct TensorSet {
    pub tensors: Vec<Array3<f32>>,
    pub targets: Vec<Array1<f32>>,
}

impl TensorSet {
    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Copy out the entries at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            tensors: indices.iter().map(|&i| self.tensors[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i].clone()).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PreparedSet {
    pub tensors: TensorSet,
    /// `(height, width)` every matrix was padded to before resizing.
    /// Recorded so inference can repeat the exact geometry.
    pub padded_shape: (usize, usize),
}

pub struct TensorPreparer {
    height: usize,
    width: usize,
    channels: usize,
}

impl TensorPreparer {
    pub fn new(cfg: &TensorConfig) -> Self {
        Self {
            height: cfg.height,
            width: cfg.width,
            channels: cfg.channels,
        }
    }

    #[inline]
    pub fn output_shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    pub fn prepare(&self, samples: &[Sample], vocabulary: &LabelVocabulary) -> Result<PreparedSet> {
        if samples.is_empty() {
            return Err(Error::NoSamples);
        }

        let padded_shape = samples.iter().fold((0, 0), |(h, w), s| {
            let (sh, sw) = s.features.dim();
            (h.max(sh), w.max(sw))
        });
        debug!(
            "preparing {} samples: pad to {:?}, resize to {:?}",
            samples.len(),
            padded_shape,
            self.output_shape()
        );

        let expected = [self.height, self.width, self.channels];
        let mut set = TensorSet {
            tensors: Vec::with_capacity(samples.len()),
            targets: Vec::with_capacity(samples.len()),
        };

        for sample in samples {
            let target = vocabulary
                .one_hot(&sample.label)
                .ok_or_else(|| Error::UnknownLabel(sample.label.clone()))?;
            let tensor = self.prepare_one(&sample.features, padded_shape)?;

            if tensor.shape() != expected {
                return Err(Error::shape(
                    format!("prepared tensor for {}", sample.source.display()),
                    &expected,
                    tensor.shape(),
                ));
            }
            set.tensors.push(tensor);
            set.targets.push(target);
        }

        if set.len() != samples.len() {
            return Err(Error::shape("prepared set size", &[samples.len()], &[set.len()]));
        }

        Ok(PreparedSet {
            tensors: set,
            padded_shape,
        })
    }

    /// Pad → resize → replicate a single matrix against a known padded shape.
    pub fn prepare_one(
        &self,
        matrix: &FeatureMatrix,
        padded_shape: (usize, usize),
    ) -> Result<Array3<f32>> {
        let (h, w) = matrix.dim();
        if h > padded_shape.0 || w > padded_shape.1 || h == 0 || w == 0 {
            return Err(Error::shape(
                "feature matrix vs padded shape",
                &[padded_shape.0, padded_shape.1],
                &[h, w],
            ));
        }
        let padded = pad_to(matrix, padded_shape);
        let resized = resize_bilinear(&padded, self.height, self.width);
        Ok(replicate_channels(&resized, self.channels))
    }
}

/* ────────────────────── geometry ────────────────────── */

fn pad_to(matrix: &FeatureMatrix, (h, w): (usize, usize)) -> Array2<f32> {
    let (mh, mw) = matrix.dim();
    if (mh, mw) == (h, w) {
        return matrix.clone();
    }
    let mut out = Array2::zeros((h, w));
    out.slice_mut(s![..mh, ..mw]).assign(matrix);
    out
}

/// Half-pixel-centre bilinear interpolation, edges clamped.
pub(crate) fn resize_bilinear(src: &Array2<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
    let (in_h, in_w) = src.dim();
    if (in_h, in_w) == (out_h, out_w) {
        return src.clone();
    }
    let sy = in_h as f32 / out_h as f32;
    let sx = in_w as f32 / out_w as f32;

    let axis = |o: usize, scale: f32, len: usize| -> (usize, usize, f32) {
        let pos = ((o as f32 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f32);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(len - 1);
        (lo, hi, pos - lo as f32)
    };

    let cols: Vec<_> = (0..out_w).map(|x| axis(x, sx, in_w)).collect();
    let mut out = Array2::zeros((out_h, out_w));
    for y in 0..out_h {
        let (y0, y1, fy) = axis(y, sy, in_h);
        for (x, &(x0, x1, fx)) in cols.iter().enumerate() {
            let top = src[[y0, x0]] * (1.0 - fx) + src[[y0, x1]] * fx;
            let bottom = src[[y1, x0]] * (1.0 - fx) + src[[y1, x1]] * fx;
            out[[y, x]] = top * (1.0 - fy) + bottom * fy;
        }
    }
    out
}

fn replicate_channels(plane: &Array2<f32>, channels: usize) -> Array3<f32> {
    let (h, w) = plane.dim();
    let mut out = Array3::zeros((h, w, channels));
    for mut slice in out.axis_iter_mut(Axis(2)) {
        slice.assign(plane);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn sample(label: &str, h: usize, w: usize, fill: f32) -> Sample {
        Sample {
            features: Array2::from_elem((h, w), fill),
            label: label.into(),
            source: PathBuf::from(format!("{label}.wav")),
        }
    }

    fn preparer(h: usize, w: usize, c: usize) -> TensorPreparer {
        TensorPreparer::new(&TensorConfig {
            height: h,
            width: w,
            channels: c,
        })
    }

    #[test]
    fn variable_widths_share_one_shape() {
        let vocab = LabelVocabulary::sorted(["rain", "thunder"]);
        let samples = vec![
            sample("rain", 8, 10, -10.0),
            sample("thunder", 8, 12, -20.0),
            sample("rain", 8, 7, -30.0),
        ];
        let set = preparer(16, 16, 3).prepare(&samples, &vocab).unwrap();

        assert_eq!(set.padded_shape, (8, 12));
        assert_eq!(set.tensors.len(), 3);
        for t in &set.tensors.tensors {
            assert_eq!(t.shape(), &[16, 16, 3]);
        }
        assert_eq!(set.tensors.targets[1].to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn channels_are_identical() {
        let vocab = LabelVocabulary::sorted(["rain"]);
        let mut s = sample("rain", 4, 4, 0.0);
        s.features[[1, 2]] = -5.0;
        let set = preparer(6, 6, 3).prepare(&[s], &vocab).unwrap();
        let t = &set.tensors.tensors[0];
        let c0 = t.index_axis(Axis(2), 0);
        assert_eq!(c0, t.index_axis(Axis(2), 1));
        assert_eq!(c0, t.index_axis(Axis(2), 2));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let vocab = LabelVocabulary::sorted(["rain"]);
        let err = preparer(4, 4, 1)
            .prepare(&[sample("fog", 2, 2, 0.0)], &vocab)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownLabel(l) if l == "fog"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let vocab = LabelVocabulary::sorted(["rain"]);
        assert!(matches!(
            preparer(4, 4, 1).prepare(&[], &vocab),
            Err(Error::NoSamples)
        ));
    }

    #[test]
    fn oversized_matrix_at_inference_is_a_shape_mismatch() {
        let m = Array2::zeros((10, 10));
        let err = preparer(4, 4, 1).prepare_one(&m, (8, 8)).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn constant_plane_resizes_to_constant() {
        let src = Array2::from_elem((5, 9), -42.0);
        let out = resize_bilinear(&src, 13, 4);
        assert_eq!(out.dim(), (13, 4));
        for v in out.iter() {
            assert_abs_diff_eq!(*v, -42.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn upsampling_interpolates_between_neighbours() {
        let src = Array2::from_shape_vec((1, 2), vec![0.0, 1.0]).unwrap();
        let out = resize_bilinear(&src, 1, 4);
        let v = out.row(0).to_vec();
        assert_abs_diff_eq!(v[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(v[2], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(v[3], 1.0, epsilon = 1e-6);
    }
}
