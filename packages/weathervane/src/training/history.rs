//! Append-only record of a training run; serialized to `history.json`.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// 1-based
    pub epoch: usize,
    #[serde(with = "nullable_loss")]
    pub train_loss: f32,
    pub train_accuracy: f32,
    #[serde(with = "nullable_loss")]
    pub eval_loss: f32,
    pub eval_accuracy: f32,
    /// Rate in effect while this epoch was trained.
    pub learning_rate: f64,
    pub checkpointed: bool,
}

/// A loss went NaN / ±inf. Recorded once, training carries on.
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[error("training diverged at epoch {epoch} (train loss {train_loss}, eval loss {eval_loss})")]
pub struct TrainingDivergence {
    pub epoch: usize,
    #[serde(with = "nullable_loss")]
    pub train_loss: f32,
    #[serde(with = "nullable_loss")]
    pub eval_loss: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrainingOutcome {
    /// The loop has not terminated yet.
    Running,
    /// Patience ran out; classifier restored to `best_epoch` (if any epoch
    /// produced a finite eval loss).
    EarlyStopped { best_epoch: Option<usize> },
    /// Epoch budget exhausted.
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    pub outcome: TrainingOutcome,
    pub divergence: Option<TrainingDivergence>,
}

impl Default for TrainingHistory {
    fn default() -> Self {
        Self {
            epochs: Vec::new(),
            outcome: TrainingOutcome::Running,
            divergence: None,
        }
    }
}

impl TrainingHistory {
    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    /// Note the first divergence; later ones are ignored.
    pub fn record_divergence(&mut self, d: TrainingDivergence) -> bool {
        if self.divergence.is_some() {
            return false;
        }
        self.divergence = Some(d);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Record with the lowest finite eval loss (earliest on ties).
    pub fn best(&self) -> Option<&EpochRecord> {
        self.epochs
            .iter()
            .filter(|r| r.eval_loss.is_finite())
            .fold(None, |best: Option<&EpochRecord>, r| match best {
                Some(b) if b.eval_loss <= r.eval_loss => Some(b),
                _ => Some(r),
            })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// serde_json writes non-finite floats as `null`; read those back as NaN.
mod nullable_loss {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f32, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f32(*v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(d)?.unwrap_or(f32::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(epoch: usize, eval_loss: f32) -> EpochRecord {
        EpochRecord {
            epoch,
            train_loss: 1.0,
            train_accuracy: 0.5,
            eval_loss,
            eval_accuracy: 0.5,
            learning_rate: 1e-3,
            checkpointed: false,
        }
    }

    #[test]
    fn best_prefers_earliest_tie_and_skips_nan() {
        let mut h = TrainingHistory::default();
        h.push(rec(1, 0.9));
        h.push(rec(2, 0.85));
        h.push(rec(3, f32::NAN));
        h.push(rec(4, 0.85));
        assert_eq!(h.best().map(|r| r.epoch), Some(2));
    }

    #[test]
    fn divergence_is_recorded_once() {
        let mut h = TrainingHistory::default();
        let d = |epoch| TrainingDivergence {
            epoch,
            train_loss: f32::NAN,
            eval_loss: 1.0,
        };
        assert!(h.record_divergence(d(3)));
        assert!(!h.record_divergence(d(4)));
        assert_eq!(h.divergence.as_ref().map(|d| d.epoch), Some(3));
    }

    #[test]
    fn json_carries_outcome() {
        let mut h = TrainingHistory::default();
        h.push(rec(1, 0.5));
        h.outcome = TrainingOutcome::EarlyStopped {
            best_epoch: Some(1),
        };
        let json = h.to_json().unwrap();
        assert!(json.contains("early_stopped"));
        assert!(json.contains("\"best_epoch\": 1"));
    }

    #[test]
    fn diverged_history_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut h = TrainingHistory::default();
        h.push(rec(1, 0.5));
        h.push(rec(2, f32::NAN));
        h.record_divergence(TrainingDivergence {
            epoch: 2,
            train_loss: 1.0,
            eval_loss: f32::INFINITY,
        });
        h.save_json(&path).unwrap();

        let back: TrainingHistory =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.epochs[0], h.epochs[0]);
        assert!(back.epochs[1].eval_loss.is_nan());
        let d = back.divergence.unwrap();
        assert_eq!((d.epoch, d.train_loss), (2, 1.0));
        assert!(!d.eval_loss.is_finite());
    }
}
