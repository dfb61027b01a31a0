//! Epoch loop with checkpoint / plateau / early-stop control.
//!
//! Per epoch, in order:
//! 1. reshuffle the training order (seeded RNG, one stream for the whole run)
//! 2. augment each tensor into a fresh copy and fit batch by batch
//! 3. evaluate the untouched eval set
//! 4. checkpoint → plateau → early stop
//!
//! Any `fit_batch` / `predict` failure aborts the run.

use candle_core::Device;
use log::{debug, info, warn};
use ndarray::Array1;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use strum::{Display, IntoStaticStr};

use crate::{
    Error, Result,
    config::TrainConfig,
    constants::PROB_EPSILON,
    dataset::{TensorSet, augment},
};

use super::{
    BatchMetrics, CheckpointPolicy, Classifier, ClassifierState, EarlyStopPolicy, EpochRecord,
    PlateauPolicy, TrainingDivergence, TrainingHistory, TrainingOutcome, stack_inputs,
    stack_targets,
};

/// Where the controller currently is in its epoch cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, IntoStaticStr)]
pub enum TrainingPhase {
    Running,
    CheckpointEvaluated,
    LrPlateauAdjusted,
    EarlyStopped,
    Completed,
}

pub struct TrainingController {
    config: TrainConfig,
    device: Device,
    phase: TrainingPhase,
    checkpoint: CheckpointPolicy,
}

impl TrainingController {
    pub fn new(config: TrainConfig) -> Self {
        Self::with_device(config, Device::Cpu)
    }

    pub fn with_device(config: TrainConfig, device: Device) -> Self {
        Self {
            config,
            device,
            phase: TrainingPhase::Running,
            checkpoint: CheckpointPolicy::new(),
        }
    }

    #[inline]
    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    /// State of the epoch with the lowest eval loss, if any was finite.
    #[inline]
    pub fn best_checkpoint(&self) -> Option<&ClassifierState> {
        self.checkpoint.state()
    }

    #[inline]
    pub fn best_epoch(&self) -> Option<usize> {
        self.checkpoint.best_epoch()
    }

    pub fn train<C: Classifier + ?Sized>(
        &mut self,
        classifier: &mut C,
        train_set: &TensorSet,
        eval_set: &TensorSet,
    ) -> Result<TrainingHistory> {
        if train_set.is_empty() || eval_set.is_empty() {
            return Err(Error::EmptySplit {
                train: train_set.len(),
                eval: eval_set.len(),
            });
        }

        let cfg = self.config.clone();
        let batch_size = cfg.batch_size.max(1);
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut plateau =
            PlateauPolicy::new(cfg.plateau.patience, cfg.plateau.factor, cfg.plateau.min_lr);
        let mut stopper = EarlyStopPolicy::new(cfg.patience_stop);
        let mut history = TrainingHistory::default();
        let mut order: Vec<usize> = (0..train_set.len()).collect();

        self.checkpoint = CheckpointPolicy::new();
        classifier.set_learning_rate(cfg.learning_rate);

        info!(
            "training: {} train / {} eval, {} epochs, batch {}, lr {:e}",
            train_set.len(),
            eval_set.len(),
            cfg.epochs,
            batch_size,
            cfg.learning_rate
        );

        for epoch in 1..=cfg.epochs {
            self.phase = TrainingPhase::Running;
            let lr = classifier.learning_rate();

            /* ---------- fit ---------- */
            order.shuffle(&mut rng);
            let mut loss_sum = 0f32;
            let mut correct = 0usize;
            for chunk in order.chunks(batch_size) {
                let augmented: Vec<_> = chunk
                    .iter()
                    .map(|&i| augment(&train_set.tensors[i], &cfg.augment, &mut rng))
                    .collect();
                let x = stack_inputs(&augmented, &self.device)?;
                let y = stack_targets(chunk.iter().map(|&i| &train_set.targets[i]), &self.device)?;

                let BatchMetrics { loss, correct: c } = classifier.fit_batch(&x, &y)?;
                loss_sum += loss * chunk.len() as f32;
                correct += c;
            }
            let train_loss = loss_sum / train_set.len() as f32;
            let train_accuracy = correct as f32 / train_set.len() as f32;

            /* ---------- evaluate ---------- */
            let (eval_loss, eval_accuracy) = self.evaluate(classifier, eval_set)?;

            if !train_loss.is_finite() || !eval_loss.is_finite() {
                let d = TrainingDivergence {
                    epoch,
                    train_loss,
                    eval_loss,
                };
                if history.record_divergence(d.clone()) {
                    warn!("{d}");
                }
            }

            /* ---------- checkpoint ---------- */
            let checkpointed = self
                .checkpoint
                .observe(epoch, eval_loss, || classifier.state())?;
            self.phase = TrainingPhase::CheckpointEvaluated;

            info!(
                "epoch {epoch}/{}  train_loss={train_loss:.4} acc={train_accuracy:.3}  \
                 eval_loss={eval_loss:.4} acc={eval_accuracy:.3}  lr={lr:e}{}",
                cfg.epochs,
                if checkpointed { "  *" } else { "" }
            );
            history.push(EpochRecord {
                epoch,
                train_loss,
                train_accuracy,
                eval_loss,
                eval_accuracy,
                learning_rate: lr,
                checkpointed,
            });

            /* ---------- plateau ---------- */
            if let Some(next) = plateau.step(eval_loss, lr) {
                info!("eval loss plateaued, learning rate {lr:e} → {next:e}");
                classifier.set_learning_rate(next);
                self.phase = TrainingPhase::LrPlateauAdjusted;
            }

            /* ---------- early stop ---------- */
            if stopper.step(eval_loss) {
                let best_epoch = self.checkpoint.best_epoch();
                if let Some(state) = self.checkpoint.state() {
                    classifier.set_state(state)?;
                }
                info!(
                    "early stop at epoch {epoch}: no improvement for {} epochs, restored epoch {}",
                    cfg.patience_stop,
                    best_epoch.map_or_else(|| "-".to_owned(), |e| e.to_string())
                );
                self.phase = TrainingPhase::EarlyStopped;
                history.outcome = TrainingOutcome::EarlyStopped { best_epoch };
                return Ok(history);
            }
        }

        self.phase = TrainingPhase::Completed;
        history.outcome = TrainingOutcome::Completed;
        debug!(
            "epoch budget exhausted; best eval loss {} at epoch {:?}",
            self.checkpoint.best_loss(),
            self.checkpoint.best_epoch()
        );
        Ok(history)
    }

    /// Mean categorical cross-entropy and accuracy over `set`, no augmentation.
    pub fn evaluate<C: Classifier + ?Sized>(
        &self,
        classifier: &C,
        set: &TensorSet,
    ) -> Result<(f32, f32)> {
        let batch_size = self.config.batch_size.max(1);
        let mut loss_sum = 0f32;
        let mut correct = 0usize;

        for lo in (0..set.len()).step_by(batch_size) {
            let hi = (lo + batch_size).min(set.len());
            let x = stack_inputs(&set.tensors[lo..hi], &self.device)?;
            let probs = classifier.predict(&x)?.to_vec2::<f32>()?;

            if probs.len() != hi - lo {
                return Err(Error::shape("eval predictions", &[hi - lo], &[probs.len()]));
            }
            for (p, t) in probs.iter().zip(&set.targets[lo..hi]) {
                if p.len() != t.len() {
                    return Err(Error::shape("eval probability width", &[t.len()], &[p.len()]));
                }
                loss_sum += cross_entropy(p, t);
                if argmax(p) == argmax_iter(t.iter().copied()) {
                    correct += 1;
                }
            }
        }

        let n = set.len() as f32;
        Ok((loss_sum / n, correct as f32 / n))
    }
}

/// Build a controller, run it once and hand back the history.
pub fn train<C: Classifier + ?Sized>(
    classifier: &mut C,
    train_set: &TensorSet,
    eval_set: &TensorSet,
    config: &TrainConfig,
) -> Result<TrainingHistory> {
    TrainingController::new(config.clone()).train(classifier, train_set, eval_set)
}

/* ────────────────────── utils ────────────────────── */

fn cross_entropy(probs: &[f32], target: &Array1<f32>) -> f32 {
    probs
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| -t * p.clamp(PROB_EPSILON, 1.0).ln())
        .sum()
}

#[inline]
fn argmax(v: &[f32]) -> Option<usize> {
    argmax_iter(v.iter().copied())
}

fn argmax_iter(v: impl Iterator<Item = f32>) -> Option<usize> {
    v.enumerate()
        .fold(None::<(usize, f32)>, |best, (i, x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hot(v: &[f32]) -> Array1<f32> {
        Array1::from_vec(v.to_vec())
    }

    #[test]
    fn cross_entropy_of_confident_hit_is_small() {
        // a certain hit costs nothing; only the lower end is clamped
        assert_eq!(cross_entropy(&[1.0, 0.0], &hot(&[1.0, 0.0])), 0.0);
        assert_abs_diff_eq!(
            cross_entropy(&[0.5, 0.5], &hot(&[0.0, 1.0])),
            2f32.ln(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn zero_probability_is_clamped() {
        let l = cross_entropy(&[1.0, 0.0], &hot(&[0.0, 1.0]));
        assert!(l.is_finite());
        assert_abs_diff_eq!(l, -(PROB_EPSILON.ln()), epsilon = 1e-3);
    }

    #[test]
    fn argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
