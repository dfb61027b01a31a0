pub mod augment;
pub mod prepare;
pub mod split;

pub use augment::{AffineParams, augment};
pub use prepare::{PreparedSet, TensorPreparer, TensorSet};
pub use split::{DatasetSplitter, Split};
