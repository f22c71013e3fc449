//! Tokenized prompt batch

use crate::core::error::DomainError;

/// Padded token ids plus a 0/1 attention mask of the same shape.
///
/// Produced per prompt list, consumed once by an embedding strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedBatch {
    input_ids: Vec<Vec<u32>>,
    attention_mask: Vec<Vec<u32>>,
    seq_len: usize,
}

impl TokenizedBatch {
    /// Build a batch, checking that every row of ids and mask has the same length.
    pub fn new(
        input_ids: Vec<Vec<u32>>,
        attention_mask: Vec<Vec<u32>>,
    ) -> Result<Self, DomainError> {
        let seq_len = input_ids.first().map(Vec::len).unwrap_or(0);

        if attention_mask.len() != input_ids.len() {
            return Err(DomainError::RaggedBatch {
                row: attention_mask.len().min(input_ids.len()),
                expected: input_ids.len(),
                actual: attention_mask.len(),
            });
        }

        for (row, (ids, mask)) in input_ids.iter().zip(&attention_mask).enumerate() {
            if ids.len() != seq_len {
                return Err(DomainError::RaggedBatch {
                    row,
                    expected: seq_len,
                    actual: ids.len(),
                });
            }
            if mask.len() != seq_len {
                return Err(DomainError::RaggedBatch {
                    row,
                    expected: seq_len,
                    actual: mask.len(),
                });
            }
        }

        Ok(Self {
            input_ids,
            attention_mask,
            seq_len,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty() || self.seq_len == 0
    }

    pub fn input_ids(&self) -> &[Vec<u32>] {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &[Vec<u32>] {
        &self.attention_mask
    }

    /// Row-major ids, `batch_size * seq_len` long
    pub fn flat_input_ids(&self) -> Vec<u32> {
        self.input_ids.iter().flatten().copied().collect()
    }

    /// Row-major mask, `batch_size * seq_len` long
    pub fn flat_attention_mask(&self) -> Vec<u32> {
        self.attention_mask.iter().flatten().copied().collect()
    }
}
