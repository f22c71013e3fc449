//! Gate computation concepts.
//!
//! - [`mode::GateMode`] - which embedding strategy produces the gate vectors
//! - [`options::LoadOptions`] - flags forwarded to model and tokenizer loading
//! - [`batch::TokenizedBatch`] - padded token ids plus attention mask

pub mod batch;
pub mod mode;
pub mod options;
