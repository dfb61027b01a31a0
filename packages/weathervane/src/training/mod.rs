pub mod classifier;
pub mod controller;
pub mod history;
pub mod policy;

pub use classifier::{
    BatchMetrics, Classifier, ClassifierState, TensorData, stack_inputs, stack_targets,
};
pub use controller::{TrainingController, TrainingPhase, train};
pub use history::{EpochRecord, TrainingDivergence, TrainingHistory, TrainingOutcome};
pub use policy::{CheckpointPolicy, EarlyStopPolicy, PlateauPolicy};
