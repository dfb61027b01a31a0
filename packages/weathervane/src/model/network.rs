//! Default trainable classifier: a small Candle CNN over `(H, W, C)` tensors.
//!
//! conv(s2) → relu → pool → conv → relu → pool → global mean → linear.
//! Width of the two conv blocks follows [`ModelType`].

use candle_core::{D, DType, Device, Module, Tensor};
use candle_nn::{
    self as nn, Conv2d, Conv2dConfig, Linear, Optimizer, VarBuilder, VarMap,
    optim::{AdamW, ParamsAdamW},
};
use log::debug;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::training::{BatchMetrics, Classifier, ClassifierState};

/// Network size variants.
///
/// Smaller models train faster on CPU; larger ones have more capacity.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelType {
    /// 8 → 16 channels
    Tiny,
    /// 16 → 32 channels
    Small,
    /// 32 → 64 channels
    Medium,
    /// 64 → 128 channels
    Large,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", <&'static str>::from(self))
    }
}

impl ModelType {
    /// Output channels of the two conv blocks.
    pub const fn widths(self) -> (usize, usize) {
        match self {
            ModelType::Tiny => (8, 16),
            ModelType::Small => (16, 32),
            ModelType::Medium => (32, 64),
            ModelType::Large => (64, 128),
        }
    }
}

pub struct SpectrogramNet {
    var_map: VarMap,
    conv1: Conv2d,
    conv2: Conv2d,
    head: Linear,
    opt: AdamW,
    model_type: ModelType,
    input_shape: (usize, usize, usize),
    num_classes: usize,
}

impl SpectrogramNet {
    /// Fresh, randomly initialised network.
    pub fn new(
        model_type: ModelType,
        input_shape: (usize, usize, usize),
        num_classes: usize,
        learning_rate: f64,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let var_map = VarMap::new();
        let vs = VarBuilder::from_varmap(&var_map, DType::F32, device);
        let (c1, c2) = model_type.widths();
        let channels = input_shape.2;

        let conv1 = nn::conv2d(
            channels,
            c1,
            3,
            Conv2dConfig {
                padding: 1,
                stride: 2,
                ..Default::default()
            },
            vs.pp("conv1"),
        )?;
        let conv2 = nn::conv2d(
            c1,
            c2,
            3,
            Conv2dConfig {
                padding: 1,
                ..Default::default()
            },
            vs.pp("conv2"),
        )?;
        let head = nn::linear(c2, num_classes, vs.pp("head"))?;

        let opt = AdamW::new(
            var_map.all_vars(),
            ParamsAdamW {
                lr: learning_rate,
                ..Default::default()
            },
        )?;

        debug!(
            "SpectrogramNet[{model_type}] input {input_shape:?} → {num_classes} classes, {} tensors",
            var_map.all_vars().len()
        );

        Ok(Self {
            var_map,
            conv1,
            conv2,
            head,
            opt,
            model_type,
            input_shape,
            num_classes,
        })
    }

    /// Network with weights restored from `state` (inference / resume).
    pub fn from_state(
        model_type: ModelType,
        input_shape: (usize, usize, usize),
        num_classes: usize,
        state: &ClassifierState,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let mut net = Self::new(model_type, input_shape, num_classes, 0.0, device)?;
        net.set_state(state)?;
        Ok(net)
    }

    #[inline]
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    #[inline]
    pub fn input_shape(&self) -> (usize, usize, usize) {
        self.input_shape
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn check_input(&self, xs: &Tensor) -> candle_core::Result<()> {
        let (h, w, c) = self.input_shape;
        match xs.dims() {
            [_, xh, xw, xc] if (*xh, *xw, *xc) == (h, w, c) => Ok(()),
            other => Err(candle_core::Error::Msg(format!(
                "expected (N, {h}, {w}, {c}) input, got {other:?}"
            ))),
        }
    }
}

impl Module for SpectrogramNet {
    /// `(N, H, W, C)` → logits `(N, classes)`.
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = xs.permute((0, 3, 1, 2))?.contiguous()?;
        let xs = self.conv1.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = self.conv2.forward(&xs)?.relu()?.max_pool2d(2)?;
        let xs = xs.mean((2, 3))?;
        self.head.forward(&xs)
    }
}

impl Classifier for SpectrogramNet {
    fn predict(&self, batch: &Tensor) -> candle_core::Result<Tensor> {
        self.check_input(batch)?;
        nn::ops::softmax(&self.forward(batch)?, D::Minus1)
    }

    fn fit_batch(&mut self, batch: &Tensor, targets: &Tensor) -> candle_core::Result<BatchMetrics> {
        self.check_input(batch)?;
        let logits = self.forward(batch)?;
        let log_probs = nn::ops::log_softmax(&logits, D::Minus1)?;

        // soft-target categorical cross-entropy
        let loss = (targets * &log_probs)?.sum(D::Minus1)?.neg()?.mean_all()?;
        self.opt.backward_step(&loss)?;

        let hits = logits
            .argmax(D::Minus1)?
            .eq(&targets.argmax(D::Minus1)?)?
            .to_dtype(DType::F32)?
            .sum_all()?
            .to_scalar::<f32>()?;

        Ok(BatchMetrics {
            loss: loss.to_scalar::<f32>()?,
            correct: hits as usize,
        })
    }

    fn state(&self) -> candle_core::Result<ClassifierState> {
        let guard = self
            .var_map
            .data()
            .lock()
            .map_err(|e| candle_core::Error::Msg(format!("var map mutex: {e}")))?;
        ClassifierState::capture(guard.iter().map(|(k, v)| (k, v.as_tensor())))
    }

    fn set_state(&mut self, state: &ClassifierState) -> candle_core::Result<()> {
        let guard = self
            .var_map
            .data()
            .lock()
            .map_err(|e| candle_core::Error::Msg(format!("var map mutex: {e}")))?;
        for (name, var) in guard.iter() {
            let td = state
                .get(name)
                .ok_or_else(|| candle_core::Error::Msg(format!("missing weight {name}")))?;
            var.set(&Tensor::try_from(td)?)?;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.opt.set_learning_rate(lr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::stack_inputs;
    use ndarray::Array3;

    fn tiny_net() -> SpectrogramNet {
        SpectrogramNet::new(ModelType::Tiny, (16, 16, 3), 2, 1e-2, &Device::Cpu).unwrap()
    }

    #[test]
    fn predict_yields_distributions() {
        let net = tiny_net();
        let xs = Tensor::randn(0f32, 1f32, (4, 16, 16, 3), &Device::Cpu).unwrap();
        let probs = net.predict(&xs).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(probs.len(), 4);
        for row in probs {
            assert_eq!(row.len(), 2);
            let s: f32 = row.iter().sum();
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn wrong_input_shape_is_rejected() {
        let net = tiny_net();
        let xs = Tensor::zeros((1, 8, 16, 3), DType::F32, &Device::Cpu).unwrap();
        assert!(net.predict(&xs).is_err());
    }

    #[test]
    fn state_round_trip_restores_predictions() {
        let mut net = tiny_net();
        let items = vec![Array3::from_elem((16, 16, 3), 0.5f32)];
        let xs = stack_inputs(&items, &Device::Cpu).unwrap();
        let ys = Tensor::new(&[[1f32, 0.0]], &Device::Cpu).unwrap();

        let saved = net.state().unwrap();
        let before = net.predict(&xs).unwrap().to_vec2::<f32>().unwrap();
        net.fit_batch(&xs, &ys).unwrap();
        net.set_state(&saved).unwrap();
        let after = net.predict(&xs).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn learning_rate_is_adjustable() {
        let mut net = tiny_net();
        net.set_learning_rate(1e-4);
        assert_eq!(net.learning_rate(), 1e-4);
    }

    #[test]
    fn model_type_names() {
        assert_eq!(ModelType::Medium.to_string(), "medium");
        assert_eq!("large".parse::<ModelType>().unwrap(), ModelType::Large);
    }
}
