//! Convergence-control policies consulted once per epoch.
//!
//! Each policy owns its own "best loss" and patience counter. Improvement is
//! strict (`loss < best`); ties and non-finite losses never count.

use super::ClassifierState;

#[inline]
fn improves(loss: f32, best: f32) -> bool {
    loss.is_finite() && loss < best
}

/* --------------------------------------------------------------------- */
/*  Checkpoint                                                           */

/// Keeps the classifier state of the best evaluation loss seen so far.
#[derive(Debug)]
pub struct CheckpointPolicy {
    best_loss: f32,
    best_epoch: Option<usize>,
    state: Option<ClassifierState>,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            best_loss: f32::INFINITY,
            best_epoch: None,
            state: None,
        }
    }
}

impl CheckpointPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Would `loss` replace the current checkpoint?
    #[inline]
    pub fn should_save(&self, loss: f32) -> bool {
        improves(loss, self.best_loss)
    }

    /// Save `state` if `loss` improves on the best; returns whether it did.
    /// The state is only built when it is going to be kept.
    pub fn observe<E>(
        &mut self,
        epoch: usize,
        loss: f32,
        state: impl FnOnce() -> Result<ClassifierState, E>,
    ) -> Result<bool, E> {
        if !self.should_save(loss) {
            return Ok(false);
        }
        self.state = Some(state()?);
        self.best_loss = loss;
        self.best_epoch = Some(epoch);
        Ok(true)
    }

    #[inline]
    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    #[inline]
    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    #[inline]
    pub fn state(&self) -> Option<&ClassifierState> {
        self.state.as_ref()
    }
}

/* --------------------------------------------------------------------- */
/*  Learning-rate plateau                                                */

#[derive(Clone, Debug)]
pub struct PlateauPolicy {
    patience: usize,
    factor: f64,
    min_lr: f64,
    best_loss: f32,
    wait: usize,
}

impl PlateauPolicy {
    pub fn new(patience: usize, factor: f64, min_lr: f64) -> Self {
        Self {
            patience,
            factor,
            min_lr,
            best_loss: f32::INFINITY,
            wait: 0,
        }
    }

    /// Feed one epoch's loss. Returns the new learning rate when it changed.
    ///
    /// After `patience` non-improving epochs the rate becomes
    /// `max(lr * factor, min_lr)` and the counter restarts.
    pub fn step(&mut self, loss: f32, lr: f64) -> Option<f64> {
        if improves(loss, self.best_loss) {
            self.best_loss = loss;
            self.wait = 0;
            return None;
        }
        self.wait += 1;
        if self.wait < self.patience {
            return None;
        }
        self.wait = 0;
        let next = (lr * self.factor).max(self.min_lr);
        (next < lr).then_some(next)
    }

    #[inline]
    pub fn wait(&self) -> usize {
        self.wait
    }
}

/* --------------------------------------------------------------------- */
/*  Early stop                                                           */

#[derive(Clone, Debug)]
pub struct EarlyStopPolicy {
    patience: usize,
    best_loss: f32,
    wait: usize,
}

impl EarlyStopPolicy {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_loss: f32::INFINITY,
            wait: 0,
        }
    }

    /// `true` once `patience` consecutive epochs failed to improve.
    pub fn step(&mut self, loss: f32) -> bool {
        if improves(loss, self.best_loss) {
            self.best_loss = loss;
            self.wait = 0;
            return false;
        }
        self.wait += 1;
        self.wait >= self.patience
    }

    #[inline]
    pub fn wait(&self) -> usize {
        self.wait
    }
}
