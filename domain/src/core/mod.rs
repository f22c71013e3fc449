//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelReference`] - handle to a pretrained base model
//! - [`model::ModelDims`] - layer count, hidden size, and vocabulary size
//! - [`error::DomainError`] - domain-level errors

pub mod error;
pub mod model;
