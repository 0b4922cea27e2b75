//! Pipeline configuration
//!
//! All tunables of a run live here and are passed explicitly into each stage.
//! Every field has a default, so a partial JSON document is a valid config.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default size of the synthetic cluster-name universe (`W_1..W_100`)
pub const DEFAULT_CLUSTER_UNIVERSE: usize = 100;

/// Default prefix of synthetic cluster names
pub const DEFAULT_CLUSTER_PREFIX: &str = "W_";

/// Default prefix of activity labels derived from file names
pub const DEFAULT_ACTIVITY_PREFIX: &str = "activity_";

/// Configuration for a single pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of synthetic cluster names K. Vocabulary entries outside
    /// `W_1..W_K` are dropped when filtering embeddings.
    pub cluster_universe: usize,
    /// Prefix of synthetic cluster names
    pub cluster_prefix: String,
    /// Prefix prepended to the id parsed from each token file name
    pub activity_prefix: String,
    /// Dirichlet concentration handed to the topic-model trainer
    pub concentration: f64,
    /// Number of sampling iterations for the topic-model trainer
    pub sample_iterations: usize,
    /// Directory the topic-model trainer saves into
    pub save_path: PathBuf,
    /// Classifier and clusterer settings
    pub evaluation: EvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cluster_universe: DEFAULT_CLUSTER_UNIVERSE,
            cluster_prefix: DEFAULT_CLUSTER_PREFIX.to_string(),
            activity_prefix: DEFAULT_ACTIVITY_PREFIX.to_string(),
            concentration: 0.2,
            sample_iterations: 5,
            save_path: PathBuf::from("saved_model"),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Override the synthetic universe size
    pub fn with_cluster_universe(mut self, k: usize) -> Self {
        self.cluster_universe = k;
        self
    }

    /// Override the estimator seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.evaluation.seed = seed;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cluster_universe == 0 {
            return Err(PipelineError::InvalidConfig(
                "cluster_universe must be at least 1".to_string(),
            ));
        }
        if self.cluster_prefix.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "cluster_prefix must not be empty".to_string(),
            ));
        }
        if !(self.concentration > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "concentration must be positive, got {}",
                self.concentration
            )));
        }
        self.evaluation.validate()
    }
}

/// Settings of the off-the-shelf estimators used for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub svm: SvmConfig,
    pub forest: ForestConfig,
    /// Number of k-means clusters
    pub kmeans_clusters: usize,
    /// Number of Gaussian mixture components
    pub gmm_components: usize,
    /// Seed for every randomized estimator
    pub seed: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            svm: SvmConfig::default(),
            forest: ForestConfig::default(),
            kmeans_clusters: 6,
            gmm_components: 6,
            seed: 42,
        }
    }
}

impl EvaluationConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        if self.kmeans_clusters == 0 || self.gmm_components == 0 {
            return Err(PipelineError::InvalidConfig(
                "cluster and component counts must be at least 1".to_string(),
            ));
        }
        if self.forest.n_trees == 0 {
            return Err(PipelineError::InvalidConfig(
                "forest.n_trees must be at least 1".to_string(),
            ));
        }
        if !(self.svm.c > 0.0) || !(self.svm.degree > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "svm.c and svm.degree must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Polynomial-kernel SVM settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Penalty for both the positive and the negative class
    pub c: f64,
    /// Additive constant of the polynomial kernel
    pub poly_constant: f64,
    /// Polynomial degree
    pub degree: f64,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            poly_constant: 1.0,
            degree: 3.0,
        }
    }
}

/// Random forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json(r#"{"cluster_universe": 50}"#).unwrap();

        assert_eq!(config.cluster_universe, 50);
        assert_eq!(config.cluster_prefix, "W_");
        assert_eq!(config.evaluation.forest.n_trees, 200);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default().with_seed(7);
        let json = config.to_json().unwrap();

        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_zero_universe() {
        let result = PipelineConfig::from_json(r#"{"cluster_universe": 0}"#);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_concentration() {
        let result = PipelineConfig::from_json(r#"{"concentration": 0.0}"#);
        assert!(result.is_err());
    }
}
