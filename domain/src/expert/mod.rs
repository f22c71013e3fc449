//! Experts and their routing prompts.

pub mod entities;
