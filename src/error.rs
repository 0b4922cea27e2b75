//! Error types for Sensory Topics

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing, encoding or evaluating activity data
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("No input files match pattern: {pattern}")]
    NoInputFiles { pattern: String },

    #[error("Sample file contains no tokens: {}", path.display())]
    EmptySample { path: PathBuf },

    #[error("Cannot derive activity label from file name: {}", path.display())]
    InvalidActivityName { path: PathBuf },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unknown token '{token}' during {stage} ({context})")]
    UnknownToken {
        token: String,
        stage: &'static str,
        context: String,
    },

    #[error("Instance {0} has no tokens to aggregate")]
    EmptyInstance(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("No embedding row for '{name}' (table has {rows} rows)")]
    MissingEmbeddingRow { name: String, rows: usize },

    #[error("Cannot parse embedding value '{value}' at line {line}, column {column}")]
    EmbeddingParse {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Estimator error: {0}")]
    EstimatorError(String),
}

impl PipelineError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}
