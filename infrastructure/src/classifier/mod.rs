//! Expert classifier adapters

pub mod checkpoint;

pub use checkpoint::CheckpointClassifier;
