//! Seeded train / eval partition.
//
//  The permutation comes from `StdRng::seed_from_u64(seed)`; the first
//  `round(n * eval_fraction)` permuted indices become the eval subset and
//  both subsets keep permuted order. Classes are not stratified.

use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    Result,
    config::{ConfigError, SplitConfig},
};

use super::TensorSet;

#[derive(Clone, Debug)]
pub struct Split {
    pub train: TensorSet,
    pub eval: TensorSet,
    /// Positions in the input set, in subset order.
    pub train_indices: Vec<usize>,
    pub eval_indices: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct DatasetSplitter {
    eval_fraction: f64,
    seed: u64,
}

impl DatasetSplitter {
    pub fn new(cfg: &SplitConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&cfg.eval_fraction) {
            return Err(ConfigError::Invalid(format!(
                "eval_fraction must be within [0, 1], got {}",
                cfg.eval_fraction
            ))
            .into());
        }
        Ok(Self {
            eval_fraction: cfg.eval_fraction,
            seed: cfg.seed,
        })
    }

    /// Number of eval entries for a set of `n`.
    #[inline]
    pub fn eval_len(&self, n: usize) -> usize {
        ((n as f64 * self.eval_fraction).round() as usize).min(n)
    }

    /// Permute `0..n` with the configured seed.
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        order
    }

    pub fn split(&self, set: TensorSet) -> Result<Split> {
        let n = set.len();
        let order = self.permutation(n);
        let (eval_idx, train_idx) = order.split_at(self.eval_len(n));

        if eval_idx.is_empty() || train_idx.is_empty() {
            warn!(
                "split of {n} samples leaves train={} eval={}",
                train_idx.len(),
                eval_idx.len()
            );
        }
        info!(
            "split: {} train / {} eval (seed {})",
            train_idx.len(),
            eval_idx.len(),
            self.seed
        );

        Ok(Split {
            train: set.subset(train_idx),
            eval: set.subset(eval_idx),
            train_indices: train_idx.to_vec(),
            eval_indices: eval_idx.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use ndarray::{Array1, Array3};

    fn numbered(n: usize) -> TensorSet {
        TensorSet {
            tensors: (0..n).map(|i| Array3::from_elem((1, 1, 1), i as f32)).collect(),
            targets: (0..n).map(|_| Array1::from_vec(vec![1.0])).collect(),
        }
    }

    fn splitter(eval_fraction: f64, seed: u64) -> DatasetSplitter {
        DatasetSplitter::new(&SplitConfig {
            eval_fraction,
            seed,
        })
        .unwrap()
    }

    #[test]
    fn disjoint_and_exhaustive() {
        let s = splitter(0.2, 42).split(numbered(10)).unwrap();
        assert_eq!(s.eval.len(), 2);
        assert_eq!(s.train.len(), 8);

        let mut all: Vec<usize> = s.train_indices.iter().chain(&s.eval_indices).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn subsets_follow_their_indices() {
        let s = splitter(0.3, 7).split(numbered(10)).unwrap();
        for (t, &i) in s.eval.tensors.iter().zip(&s.eval_indices) {
            assert_eq!(t[[0, 0, 0]], i as f32);
        }
    }

    #[test]
    fn same_seed_same_split() {
        let a = splitter(0.25, 1234).split(numbered(37)).unwrap();
        let b = splitter(0.25, 1234).split(numbered(37)).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
        assert_eq!(a.eval_indices, b.eval_indices);
    }

    #[test]
    fn rounding_of_eval_size() {
        assert_eq!(splitter(0.2, 0).eval_len(7), 1);
        assert_eq!(splitter(0.25, 0).eval_len(10), 3);
        assert_eq!(splitter(1.0, 0).eval_len(4), 4);
        assert_eq!(splitter(0.0, 0).eval_len(4), 0);
    }

    #[test]
    fn fraction_out_of_range() {
        let err = DatasetSplitter::new(&SplitConfig {
            eval_fraction: 1.5,
            seed: 0,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Invalid(_))));
    }
}
