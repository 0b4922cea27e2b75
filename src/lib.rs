//! Sensory Topics - vocabulary, embedding and evaluation pipeline for activity
//! topic modeling
//!
//! Sensory Topics turns per-activity files of discretized sensor tokens into the
//! input of a Gaussian-LDA style topic model, and scores cluster assignments
//! against ground-truth activities: token files → vocabulary → filtered,
//! Yeo-Johnson normalized embeddings → integer corpus → external trainer →
//! cluster/activity reconciliation → macro-F1.
//!
//! ## Modules
//!
//! - **Topic-model preparation**: [`vocabulary`], [`embedding`], [`power`], [`corpus`]
//! - **Feature evaluation**: [`features`], [`estimator`], [`reconciler`], [`evaluator`]

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod estimator;
pub mod evaluator;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod power;
pub mod reconciler;
pub mod types;
pub mod vocabulary;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{
    classify_features, prepare_topic_model_input, run_topic_model, PreparedCorpus,
    TopicModelTrainer,
};

// Evaluation exports
pub use evaluator::{EvaluationReport, Evaluator, PerformanceLog, PerformanceRow};
pub use reconciler::{ClusterActivityMap, ContingencyTable};

/// Crate version embedded in evaluation reports
pub const SENSORY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "sensory-topics";
