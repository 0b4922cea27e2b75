//! Embedding filtering and normalization
//!
//! The raw embedding file holds one comma-separated vector per line, line `i`
//! belonging to the synthetic cluster name `W_(i+1)`. Only names present in the
//! data vocabulary are kept, in `W_1..W_K` order, and the kept matrix is
//! Yeo-Johnson transformed column-wise. Vocabulary entries outside
//! `W_1..W_K` are dropped.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::power::PowerTransformer;
use crate::types::Vocabulary;
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Canonical ordered synthetic names `W_1..W_K`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNames(Vec<String>);

impl ClusterNames {
    pub fn generate(count: usize, prefix: &str) -> Self {
        Self((1..=count).map(|i| format!("{prefix}{i}")).collect())
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::generate(config.cluster_universe, &config.cluster_prefix)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Unparsed embedding rows as read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct RawEmbeddingTable {
    rows: Vec<Vec<String>>,
}

impl RawEmbeddingTable {
    pub fn parse(contents: &str) -> Self {
        let rows = contents
            .lines()
            .map(|line| line.split(',').map(|f| f.trim().to_string()).collect())
            .collect();
        Self { rows }
    }

    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let table = Self::parse(&contents);
        info!(path = %path.display(), rows = table.len(), "read embedding table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep the rows of names present in `vocabulary`, in `names` order.
    ///
    /// Empty fields become `0.0`.
    pub fn filter(
        &self,
        vocabulary: &Vocabulary,
        names: &ClusterNames,
    ) -> Result<FilteredEmbeddings, PipelineError> {
        let mut kept = Vocabulary::new();
        let mut values: Vec<f64> = Vec::new();
        let mut width: Option<usize> = None;

        for (idx, name) in names.names().iter().enumerate() {
            if !vocabulary.contains(name) {
                continue;
            }
            let row = self
                .rows
                .get(idx)
                .ok_or_else(|| PipelineError::MissingEmbeddingRow {
                    name: name.clone(),
                    rows: self.rows.len(),
                })?;

            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(PipelineError::ShapeMismatch(format!(
                        "embedding row for {name} has {} fields, expected {w}",
                        row.len()
                    )));
                }
                Some(_) => {}
            }

            for (column, field) in row.iter().enumerate() {
                values.push(parse_field(field, idx + 1, column + 1)?);
            }
            kept.insert(name);
        }

        let dropped = vocabulary
            .tokens()
            .iter()
            .filter(|t| !kept.contains(t))
            .count();
        if dropped > 0 {
            debug!(dropped, universe = names.len(), "vocabulary entries outside the cluster universe");
        }

        let width = match width {
            Some(w) if !kept.is_empty() => w,
            _ => {
                return Err(PipelineError::EmptyInput(format!(
                    "no vocabulary entry is in the cluster universe of {} names",
                    names.len()
                )))
            }
        };

        let matrix = Array2::from_shape_vec((kept.len(), width), values)
            .map_err(|e| PipelineError::ShapeMismatch(e.to_string()))?;

        Ok(FilteredEmbeddings {
            vocabulary: kept,
            matrix,
        })
    }
}

fn parse_field(field: &str, line: usize, column: usize) -> Result<f64, PipelineError> {
    if field.is_empty() {
        return Ok(0.0);
    }
    field.parse::<f64>().map_err(|_| PipelineError::EmbeddingParse {
        line,
        column,
        value: field.to_string(),
    })
}

/// Vocabulary and embedding matrix, row `i` belonging to token `i`
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredEmbeddings {
    vocabulary: Vocabulary,
    matrix: Array2<f64>,
}

impl FilteredEmbeddings {
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Replace the matrix by its Yeo-Johnson standardized form
    pub fn normalized(self) -> Result<Self, PipelineError> {
        let matrix = PowerTransformer::fit_transform(&self.matrix)?;
        Ok(Self {
            vocabulary: self.vocabulary,
            matrix,
        })
    }

    pub fn into_parts(self) -> (Vocabulary, Array2<f64>) {
        (self.vocabulary, self.matrix)
    }
}

/// Filter the embedding file at `path` against `vocabulary` and normalize it
pub fn load_filtered_embeddings(
    path: &Path,
    vocabulary: &Vocabulary,
    config: &PipelineConfig,
) -> Result<FilteredEmbeddings, PipelineError> {
    let raw = RawEmbeddingTable::from_path(path)?;
    let names = ClusterNames::from_config(config);
    let filtered = raw.filter(vocabulary, &names)?;
    info!(
        kept = filtered.len(),
        dimensions = filtered.matrix().ncols(),
        "filtered embeddings"
    );
    filtered.normalized()
}
