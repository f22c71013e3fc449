//! Prompt tokenization adapter

use crate::ports::tokenizer::{PromptTokenizer, TokenizerError};
use moegate_domain::TokenizedBatch;

/// Tokenize prompts as one padded batch, each prefixed with the BOS token.
///
/// Prompts are prefixed with the tokenizer's BOS string (or nothing) and no
/// further special tokens are added.
pub fn tokenize_prompts<T: PromptTokenizer + ?Sized>(
    prompts: &[String],
    tokenizer: &T,
) -> Result<TokenizedBatch, TokenizerError> {
    let bos = tokenizer.bos_token().unwrap_or("");
    let texts: Vec<String> = prompts.iter().map(|p| format!("{}{}", bos, p)).collect();
    tokenizer.encode_batch(&texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTokenizer {
        bos: Option<String>,
        seen: Mutex<Vec<String>>,
    }

    impl PromptTokenizer for RecordingTokenizer {
        fn bos_token(&self) -> Option<&str> {
            self.bos.as_deref()
        }

        fn encode_batch(&self, texts: &[String]) -> Result<TokenizedBatch, TokenizerError> {
            self.seen.lock().unwrap().extend(texts.iter().cloned());
            let seq_len = texts.iter().map(|t| t.len()).max().unwrap_or(0);
            let ids = texts
                .iter()
                .map(|t| {
                    let mut row: Vec<u32> = t.bytes().map(u32::from).collect();
                    row.resize(seq_len, 0);
                    row
                })
                .collect();
            let mask = texts
                .iter()
                .map(|t| (0..seq_len).map(|i| u32::from(i < t.len())).collect())
                .collect();
            TokenizedBatch::new(ids, mask)
                .map_err(|e| TokenizerError::encode(None, e.to_string()))
        }
    }

    #[test]
    fn test_prefixes_bos_token() {
        let tokenizer = RecordingTokenizer {
            bos: Some("<s>".to_string()),
            seen: Mutex::new(Vec::new()),
        };
        let batch =
            tokenize_prompts(&["hi".to_string(), "hello".to_string()], &tokenizer).unwrap();

        assert_eq!(
            *tokenizer.seen.lock().unwrap(),
            vec!["<s>hi".to_string(), "<s>hello".to_string()]
        );
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.seq_len(), "<s>hello".len());
        assert_eq!(batch.attention_mask()[0].iter().sum::<u32>(), 5);
    }

    #[test]
    fn test_without_bos_token() {
        let tokenizer = RecordingTokenizer {
            bos: None,
            seen: Mutex::new(Vec::new()),
        };
        tokenize_prompts(&["plain".to_string()], &tokenizer).unwrap();
        assert_eq!(*tokenizer.seen.lock().unwrap(), vec!["plain".to_string()]);
    }
}
