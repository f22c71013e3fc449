//! Domain layer for moegate
//!
//! This crate contains the value types of gate computation for a
//! mixture-of-experts model assembled from independently trained experts.
//! It has no dependencies on tensor backends, file formats, or presentation.
//!
//! # Core Concepts
//!
//! - **Expert**: a constituent model, described by positive and negative prompts
//! - **Gate mode**: the strategy that turns prompts into per-layer gate vectors
//! - **Degeneracy**: layers whose expert vectors are nearly linearly dependent

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod expert;
pub mod gate;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{
    error::DomainError,
    model::{ModelDims, ModelReference},
};
pub use diagnostics::degeneracy::{DegeneracyReport, LayerCondition};
pub use expert::entities::Expert;
pub use gate::{
    batch::TokenizedBatch,
    mode::{GateMode, SequenceReduction},
    options::{DevicePlacement, LoadOptions, Quantization},
};
