//! Routing diagnostics.

pub mod degeneracy;
