//! Core types for the Sensory Topics pipeline
//!
//! This module defines the data structures that flow between stages:
//! samples and activity labels, the vocabulary, and the topic-model input.

use ndarray::Array2;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Ground-truth activity label, e.g. `activity_3`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ActivityLabel(String);

impl ActivityLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Build a label from a prefix and a raw activity id
    pub fn from_id(prefix: &str, id: &str) -> Self {
        Self(format!("{prefix}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token sequence recorded for one activity instance
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    source: PathBuf,
    tokens: Vec<String>,
}

impl Sample {
    pub fn new(source: impl Into<PathBuf>, tokens: Vec<String>) -> Self {
        Self {
            source: source.into(),
            tokens,
        }
    }

    /// File the sample was read from
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Ordered set of unique tokens with stable indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of all sample tokens, ordered by first appearance
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut vocabulary = Self::new();
        for sample in samples {
            for token in sample.tokens() {
                vocabulary.insert(token);
            }
        }
        vocabulary
    }

    /// Insert a token, returning its index
    pub fn insert(&mut self, token: &str) -> usize {
        if let Some(&idx) = self.index.get(token) {
            return idx;
        }
        let idx = self.tokens.len();
        self.tokens.push(token.to_string());
        self.index.insert(token.to_string(), idx);
        idx
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.tokens.get(idx).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Serialize for Vocabulary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tokens.serialize(serializer)
    }
}

/// Index-encoded samples, one entry per sample
pub type Corpus = Vec<Vec<usize>>;

/// Everything the external topic-model trainer consumes
#[derive(Debug, Clone, Serialize)]
pub struct TopicModelInput {
    pub corpus: Corpus,
    #[serde(serialize_with = "serialize_rows")]
    pub embeddings: Array2<f64>,
    pub vocabulary: Vocabulary,
    pub num_topics: usize,
    pub concentration: f64,
    pub save_path: PathBuf,
    pub show_topics: usize,
}

/// Serialize a matrix as nested row arrays
fn serialize_rows<S: Serializer>(matrix: &Array2<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    let rows: Vec<Vec<f64>> = matrix.rows().into_iter().map(|r| r.to_vec()).collect();
    rows.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn sample(tokens: &[&str]) -> Sample {
        Sample::new("x.txt", tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_vocabulary_first_appearance_order() {
        let samples = vec![sample(&["b", "a", "b"]), sample(&["c", "a"])];
        let vocab = Vocabulary::from_samples(&samples);

        assert_eq!(vocab.tokens(), &["b", "a", "c"]);
        assert_eq!(vocab.index_of("c"), Some(2));
        assert_eq!(vocab.index_of("z"), None);
    }

    #[test]
    fn test_topic_model_input_serializes_rows() {
        let mut vocabulary = Vocabulary::new();
        vocabulary.insert("W_1");
        vocabulary.insert("W_2");
        let input = TopicModelInput {
            corpus: vec![vec![0, 1, 0]],
            embeddings: array![[1.0, 2.0], [3.0, 4.0]],
            vocabulary,
            num_topics: 2,
            concentration: 0.2,
            save_path: PathBuf::from("saved_model"),
            show_topics: 2,
        };

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["embeddings"][1][0], 3.0);
        assert_eq!(value["vocabulary"][1], "W_2");
        assert_eq!(value["corpus"][0][1], 1);
    }

    #[test]
    fn test_activity_label_display() {
        let label = ActivityLabel::from_id("activity_", "4");
        assert_eq!(label.to_string(), "activity_4");
    }
}
