//! Application-level configuration.
//!
//! - [`GateParams`] - thresholds, numeric tolerances, and sampling seed for
//!   gate computation

pub mod gate_params;

pub use gate_params::GateParams;
