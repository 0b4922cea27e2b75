//! Feature aggregation
//!
//! Turns each activity instance into one fixed-length vector by averaging the
//! embeddings of every token recorded for it:
//! - Word embeddings are read from a headerless CSV (`token,v1,...,vd`)
//! - Instance tables are read from a CSV with header whose columns are
//!   activity id, subject id, token columns and one trailing ignored column
//! - Rows sharing (activity, subject) form one instance

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::ActivityLabel;
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Token → embedding vector map with a common dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordEmbeddings {
    vectors: HashMap<String, Vec<f64>>,
    dimension: usize,
}

impl WordEmbeddings {
    /// Build from (token, vector) pairs; all vectors must share one length
    pub fn from_pairs<I>(pairs: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut vectors = HashMap::new();
        let mut dimension = None;

        for (token, vector) in pairs {
            match dimension {
                None => dimension = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(PipelineError::ShapeMismatch(format!(
                        "embedding for '{token}' has {} values, expected {d}",
                        vector.len()
                    )));
                }
                Some(_) => {}
            }
            vectors.insert(token, vector);
        }

        Ok(Self {
            vectors,
            dimension: dimension.unwrap_or(0),
        })
    }

    /// Load `token,v1,...,vd` rows; empty values become `0.0`
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut pairs = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let mut fields = record.iter();
            let token = match fields.next() {
                Some(t) if !t.trim().is_empty() => t.trim().to_string(),
                _ => continue,
            };
            let vector = fields
                .enumerate()
                .map(|(column, value)| parse_value(value, line + 1, column + 2))
                .collect::<Result<Vec<f64>, _>>()?;
            pairs.push((token, vector));
        }

        let embeddings = Self::from_pairs(pairs)?;
        info!(
            path = %path.display(),
            tokens = embeddings.len(),
            dimension = embeddings.dimension(),
            "loaded word embeddings"
        );
        Ok(embeddings)
    }

    pub fn get(&self, token: &str) -> Option<&[f64]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

fn parse_value(value: &str, line: usize, column: usize) -> Result<f64, PipelineError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }
    value.parse().map_err(|_| PipelineError::EmbeddingParse {
        line,
        column,
        value: value.to_string(),
    })
}

/// Mean of the embeddings of every token, summed left to right
pub fn mean_embedding<'t, I>(
    tokens: I,
    embeddings: &WordEmbeddings,
    instance: &str,
) -> Result<Vec<f64>, PipelineError>
where
    I: IntoIterator<Item = &'t str>,
{
    let mut sum = vec![0.0; embeddings.dimension()];
    let mut count = 0usize;

    for token in tokens {
        let vector = embeddings
            .get(token)
            .ok_or_else(|| PipelineError::UnknownToken {
                token: token.to_string(),
                stage: "feature aggregation",
                context: instance.to_string(),
            })?;
        for (acc, v) in sum.iter_mut().zip(vector) {
            *acc += v;
        }
        count += 1;
    }

    if count == 0 {
        return Err(PipelineError::EmptyInstance(instance.to_string()));
    }

    let n = count as f64;
    Ok(sum.into_iter().map(|v| v / n).collect())
}

/// Identity of one recorded activity instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub activity_id: String,
    pub subject_id: String,
}

/// Token rows grouped per instance, in order of first appearance
#[derive(Debug, Clone, Default)]
pub struct InstanceTable {
    keys: Vec<InstanceKey>,
    rows: Vec<Vec<Vec<String>>>,
}

impl InstanceTable {
    /// Read an instance CSV (header required)
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let width = reader.headers()?.len();
        if width < 3 {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} has {width} columns, expected activity, subject and token columns",
                path.display()
            )));
        }

        let mut table = Self::default();
        for record in reader.records() {
            let record = record?;
            let fields: Vec<&str> = record.iter().map(str::trim).collect();
            let key = InstanceKey {
                activity_id: fields[0].to_string(),
                subject_id: fields[1].to_string(),
            };
            // The last column is not a token column
            let tokens = fields[2..width - 1]
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
                .collect();
            table.push(key, tokens);
        }

        info!(path = %path.display(), instances = table.len(), "loaded instance table");
        Ok(table)
    }

    /// Append one row of tokens to the instance identified by `key`
    pub fn push(&mut self, key: InstanceKey, tokens: Vec<String>) {
        match self.keys.iter().position(|k| *k == key) {
            Some(idx) => self.rows[idx].push(tokens),
            None => {
                self.keys.push(key);
                self.rows.push(vec![tokens]);
            }
        }
    }

    pub fn keys(&self) -> &[InstanceKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Averaged feature vector and activity label per instance
    pub fn feature_matrix(
        &self,
        embeddings: &WordEmbeddings,
        config: &PipelineConfig,
    ) -> Result<(Array2<f64>, Vec<ActivityLabel>), PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::EmptyInput(
                "instance table has no rows".to_string(),
            ));
        }

        let dimension = embeddings.dimension();
        let mut values = Vec::with_capacity(self.len() * dimension);
        let mut labels = Vec::with_capacity(self.len());

        for (key, rows) in self.keys.iter().zip(&self.rows) {
            let instance = format!("activity {} subject {}", key.activity_id, key.subject_id);
            let tokens = rows.iter().flatten().map(String::as_str);
            let mean = mean_embedding(tokens, embeddings, &instance)?;
            debug!(%instance, rows = rows.len(), "aggregated instance");

            values.extend(mean);
            labels.push(ActivityLabel::from_id(&config.activity_prefix, &key.activity_id));
        }

        let matrix = Array2::from_shape_vec((self.len(), dimension), values)
            .map_err(|e| PipelineError::ShapeMismatch(e.to_string()))?;
        Ok((matrix, labels))
    }
}
