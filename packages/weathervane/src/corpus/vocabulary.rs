//! Ordered class-name ↔ index mapping.
//
//  The index of a label is its position in the set. The loader builds the set
//  from a lexicographic sort of the class directory names, so indices never
//  depend on filesystem enumeration order. The same instance is stored in the
//  model archive and decodes predictions at inference time.

use indexmap::IndexSet;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    labels: IndexSet<String>,
}

impl LabelVocabulary {
    /// Sort (byte-wise) and de-duplicate `labels`.
    pub fn sorted<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut v: Vec<String> = labels.into_iter().map(Into::into).collect();
        v.sort();
        v.dedup();
        Self {
            labels: v.into_iter().collect(),
        }
    }

    /// Keep the given order (used when restoring a persisted vocabulary).
    pub fn from_ordered<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.get_index_of(label)
    }

    #[inline]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get_index(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// One-hot target of width `len()`; `None` for unknown labels.
    pub fn one_hot(&self, label: &str) -> Option<Array1<f32>> {
        let idx = self.index_of(label)?;
        let mut v = Array1::zeros(self.len());
        v[idx] = 1.0;
        Some(v)
    }

    /// Arg-max of a probability vector → `(label, probability)`.
    pub fn decode(&self, probs: &[f32]) -> Option<(&str, f32)> {
        if probs.len() != self.len() {
            return None;
        }
        let (idx, p) = probs
            .iter()
            .copied()
            .enumerate()
            .fold(None::<(usize, f32)>, |best, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })?;
        Some((self.label(idx)?, p))
    }
}

impl PartialEq for LabelVocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.labels.iter().eq(other.labels.iter())
    }
}

impl Eq for LabelVocabulary {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorting_fixes_indices() {
        let v = LabelVocabulary::sorted(["thunder", "rain", "wind", "rain"]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.index_of("rain"), Some(0));
        assert_eq!(v.index_of("thunder"), Some(1));
        assert_eq!(v.index_of("wind"), Some(2));
        assert_eq!(v.index_of("hail"), None);
    }

    #[test]
    fn index_round_trip_for_every_label() {
        let v = LabelVocabulary::sorted(["hail", "rain", "snow", "thunder", "wind"]);
        for label in v.iter() {
            let idx = v.index_of(label).unwrap();
            assert_eq!(v.label(idx), Some(label));
        }
    }

    #[test]
    fn one_hot_has_single_hot_entry() {
        let v = LabelVocabulary::sorted(["rain", "thunder"]);
        let t = v.one_hot("thunder").unwrap();
        assert_eq!(t.to_vec(), vec![0.0, 1.0]);
        assert!(v.one_hot("fog").is_none());
    }

    #[test]
    fn order_matters_for_equality() {
        let a = LabelVocabulary::from_ordered(["rain", "thunder"]);
        let b = LabelVocabulary::from_ordered(["thunder", "rain"]);
        assert_ne!(a, b);
        assert_eq!(a, LabelVocabulary::sorted(["thunder", "rain"]));
    }

    #[test]
    fn decode_picks_argmax() {
        let v = LabelVocabulary::sorted(["hail", "rain", "thunder"]);
        assert_eq!(v.decode(&[0.1, 0.7, 0.2]), Some(("rain", 0.7)));
        assert_eq!(v.decode(&[0.5, 0.5]), None);
    }

    #[test]
    fn serde_keeps_order() {
        let v = LabelVocabulary::from_ordered(["wind", "hail"]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"["wind","hail"]"#);
        let back: LabelVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
