//! Corpus encoding
//!
//! Maps each sample's tokens to their zero-based positions in the filtered
//! vocabulary.

use crate::error::PipelineError;
use crate::types::{Corpus, Sample, Vocabulary};
use tracing::info;

/// Encoder from token samples to vocabulary indices
pub struct CorpusEncoder<'a> {
    vocabulary: &'a Vocabulary,
}

impl<'a> CorpusEncoder<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Encode every sample; the first unknown token fails the whole corpus
    pub fn encode(&self, samples: &[Sample]) -> Result<Corpus, PipelineError> {
        let corpus = samples
            .iter()
            .map(|sample| self.encode_sample(sample))
            .collect::<Result<Corpus, _>>()?;

        info!(
            documents = corpus.len(),
            tokens = corpus.iter().map(Vec::len).sum::<usize>(),
            "encoded corpus"
        );
        Ok(corpus)
    }

    pub fn encode_sample(&self, sample: &Sample) -> Result<Vec<usize>, PipelineError> {
        sample
            .tokens()
            .iter()
            .map(|token| {
                self.vocabulary
                    .index_of(token)
                    .ok_or_else(|| PipelineError::UnknownToken {
                        token: token.clone(),
                        stage: "corpus encoding",
                        context: sample.source().display().to_string(),
                    })
            })
            .collect()
    }

    /// Map indices back to tokens
    pub fn decode(&self, document: &[usize]) -> Result<Vec<String>, PipelineError> {
        document
            .iter()
            .map(|&idx| {
                self.vocabulary
                    .get(idx)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        PipelineError::ShapeMismatch(format!(
                            "index {idx} outside vocabulary of {} tokens",
                            self.vocabulary.len()
                        ))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(name: &str, tokens: &[&str]) -> Sample {
        Sample::new(name, tokens.iter().map(|t| t.to_string()).collect())
    }

    fn vocab(tokens: &[&str]) -> Vocabulary {
        let mut v = Vocabulary::new();
        for t in tokens {
            v.insert(t);
        }
        v
    }

    #[test]
    fn test_encode_indices() {
        let vocabulary = vocab(&["W_2", "W_5", "W_9"]);
        let samples = vec![
            sample("a_1.txt", &["W_5", "W_2", "W_5"]),
            sample("a_2.txt", &["W_9"]),
        ];

        let corpus = CorpusEncoder::new(&vocabulary).encode(&samples).unwrap();
        assert_eq!(corpus, vec![vec![1, 0, 1], vec![2]]);
    }

    #[test]
    fn test_roundtrip_reproduces_tokens() {
        let vocabulary = vocab(&["a", "b", "c"]);
        let original = sample("s_1.txt", &["c", "a", "b", "a", "c"]);
        let encoder = CorpusEncoder::new(&vocabulary);

        let encoded = encoder.encode_sample(&original).unwrap();
        assert_eq!(encoder.decode(&encoded).unwrap(), original.tokens());
    }

    #[test]
    fn test_unknown_token_names_token_and_file() {
        let vocabulary = vocab(&["W_1"]);
        let samples = vec![sample("walk_3.txt", &["W_1", "W_77"])];

        let err = CorpusEncoder::new(&vocabulary).encode(&samples).unwrap_err();
        match err {
            PipelineError::UnknownToken { token, context, .. } => {
                assert_eq!(token, "W_77");
                assert_eq!(context, "walk_3.txt");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        let vocabulary = vocab(&["a"]);
        assert!(CorpusEncoder::new(&vocabulary).decode(&[3]).is_err());
    }
}
