//! The trainable collaborator the controller drives.
//!
//! The controller never looks inside a [`Classifier`]: it feeds `(N, H, W, C)`
//! batches, reads probabilities back and snapshots / restores opaque
//! [`ClassifierState`]s.

use std::collections::HashMap;

use candle_core::{DType, Device, Tensor};
use indexmap::IndexMap;
use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

/// Outcome of one optimisation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchMetrics {
    /// Mean loss over the batch.
    pub loss: f32,
    /// Predictions whose arg-max matched the target's.
    pub correct: usize,
}

pub trait Classifier {
    /// `(N, H, W, C)` → `(N, classes)` probabilities.
    fn predict(&self, batch: &Tensor) -> candle_core::Result<Tensor>;

    /// One gradient step on `(batch, targets)`; targets are `(N, classes)`.
    fn fit_batch(&mut self, batch: &Tensor, targets: &Tensor) -> candle_core::Result<BatchMetrics>;

    fn state(&self) -> candle_core::Result<ClassifierState>;

    fn set_state(&mut self, state: &ClassifierState) -> candle_core::Result<()>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/* --------------------------------------------------------------------- */
/*  State snapshot                                                       */

/// Serializable tensor data container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    /// Raw tensor bytes in little-endian format
    pub bytes: Vec<u8>,
    /// Tensor shape dimensions in row-major order
    pub dims: Vec<usize>,
    /// Candle data type as lowercase string (e.g., "f32", "bf16")
    pub d_type: String,
}

impl TryFrom<&Tensor> for TensorData {
    type Error = candle_core::Error;

    fn try_from(t: &Tensor) -> Result<Self, Self::Error> {
        let mut bytes = Vec::new();
        t.write_bytes(&mut bytes)?;
        Ok(TensorData {
            bytes,
            dims: t.dims().to_vec(),
            d_type: t.dtype().as_str().to_owned(),
        })
    }
}

impl TryFrom<&TensorData> for Tensor {
    type Error = candle_core::Error;

    fn try_from(td: &TensorData) -> Result<Self, Self::Error> {
        let dt = match td.d_type.as_str() {
            "f32" => DType::F32,
            "f64" => DType::F64,
            "f16" => DType::F16,
            "bf16" => DType::BF16,
            "i64" => DType::I64,
            "u32" => DType::U32,
            "u8" => DType::U8,
            other => {
                return Err(candle_core::Error::Msg(format!("unsupported dtype {other}")));
            }
        };
        Tensor::from_raw_buffer(&td.bytes, dt, &td.dims, &Device::Cpu)
    }
}

/// Named parameter tensors in deterministic order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifierState {
    pub tensors: IndexMap<String, TensorData>,
}

impl ClassifierState {
    /// Snapshot `(name, tensor)` pairs, sorted by name.
    pub fn capture<'a, I>(named: I) -> candle_core::Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a Tensor)>,
    {
        let mut tensors: IndexMap<String, TensorData> = named
            .into_iter()
            .map(|(k, t)| Ok((k.clone(), TensorData::try_from(t)?)))
            .collect::<candle_core::Result<_>>()?;
        tensors.sort_keys();
        Ok(Self { tensors })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&TensorData> {
        self.tensors.get(name)
    }

    /// Rebuild CPU tensors (for safetensors export / weight loading).
    pub fn to_tensors(&self) -> candle_core::Result<HashMap<String, Tensor>> {
        self.tensors
            .iter()
            .map(|(k, td)| Ok((k.clone(), Tensor::try_from(td)?)))
            .collect()
    }
}

/* --------------------------------------------------------------------- */
/*  ndarray → Candle batches                                             */

/// Stack `(H, W, C)` tensors into one `(N, H, W, C)` batch.
pub fn stack_inputs<'a, I>(items: I, device: &Device) -> candle_core::Result<Tensor>
where
    I: IntoIterator<Item = &'a Array3<f32>>,
{
    let mut dims: Option<(usize, usize, usize)> = None;
    let mut n = 0usize;
    let mut flat = Vec::new();
    for t in items {
        match dims {
            None => dims = Some(t.dim()),
            Some(d) if d != t.dim() => {
                return Err(candle_core::Error::Msg(format!(
                    "batch entry {n} has shape {:?}, expected {d:?}",
                    t.dim()
                )));
            }
            Some(_) => {}
        }
        flat.extend(t.iter().copied());
        n += 1;
    }
    let (h, w, c) = dims.ok_or_else(|| candle_core::Error::Msg("empty batch".into()))?;
    Tensor::from_vec(flat, (n, h, w, c), device)
}

/// Stack target vectors into `(N, classes)`.
pub fn stack_targets<'a, I>(items: I, device: &Device) -> candle_core::Result<Tensor>
where
    I: IntoIterator<Item = &'a Array1<f32>>,
{
    let mut width = None;
    let mut n = 0usize;
    let mut flat = Vec::new();
    for t in items {
        if *width.get_or_insert(t.len()) != t.len() {
            return Err(candle_core::Error::Msg(format!(
                "target {n} has width {}, expected {width:?}",
                t.len()
            )));
        }
        flat.extend(t.iter().copied());
        n += 1;
    }
    let width = width.ok_or_else(|| candle_core::Error::Msg("empty batch".into()))?;
    Tensor::from_vec(flat, (n, width), device)
}
