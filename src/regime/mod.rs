pub mod classifier;

pub use classifier::{DirectionTracker, RegimeClassifier};
