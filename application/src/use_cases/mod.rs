//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod check_degeneracy;
pub mod compute_gate_tensor;
