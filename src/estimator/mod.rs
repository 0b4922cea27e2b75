//! Off-the-shelf estimators
//!
//! Classifiers and clusterers from the linfa ecosystem behind one
//! `fit`/`predict` interface. Labels are dense class ids produced by a
//! [`LabelEncoder`]; clusterers ignore them.

mod clustering;
mod forest;
mod svm;

pub use clustering::{GaussianMixtureClusterer, KMeansClusterer};
pub use forest::RandomForestClassifier;
pub use svm::SvmClassifier;

use crate::config::EvaluationConfig;
use crate::error::PipelineError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Whether predictions are class ids or opaque cluster ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorRole {
    Classifier,
    Clusterer,
}

/// Trait for estimators used in evaluation
pub trait Estimator {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    fn role(&self) -> EstimatorRole;

    /// Fit on `records` with one class id per row
    fn fit(&mut self, records: &Array2<f64>, targets: &[usize]) -> Result<(), PipelineError>;

    /// Predict one class or cluster id per row
    fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>, PipelineError>;
}

/// The estimator families available for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    Svm,
    RandomForest,
    KMeans,
    GaussianMixture,
}

impl EstimatorKind {
    /// All kinds, in performance-log column order
    pub const ALL: [EstimatorKind; 4] = [
        EstimatorKind::Svm,
        EstimatorKind::RandomForest,
        EstimatorKind::KMeans,
        EstimatorKind::GaussianMixture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::Svm => "svm",
            EstimatorKind::RandomForest => "rfc",
            EstimatorKind::KMeans => "kmeans",
            EstimatorKind::GaussianMixture => "gmm",
        }
    }

    /// Build an unfitted estimator from configuration
    pub fn build(&self, config: &EvaluationConfig) -> Box<dyn Estimator> {
        match self {
            EstimatorKind::Svm => Box::new(SvmClassifier::new(config.svm.clone())),
            EstimatorKind::RandomForest => {
                Box::new(RandomForestClassifier::new(config.forest.clone(), config.seed))
            }
            EstimatorKind::KMeans => {
                Box::new(KMeansClusterer::new(config.kmeans_clusters, config.seed))
            }
            EstimatorKind::GaussianMixture => Box::new(GaussianMixtureClusterer::new(
                config.gmm_components,
                config.seed,
            )),
        }
    }
}

/// Dense, sorted encoding of labels into class ids
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder<L> {
    classes: Vec<L>,
}

impl<L: Ord + Clone> LabelEncoder<L> {
    pub fn fit(labels: &[L]) -> Self {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Class id of every label; labels unseen at fit time are an error
    pub fn encode(&self, labels: &[L]) -> Result<Vec<usize>, PipelineError> {
        labels
            .iter()
            .map(|label| {
                self.classes.binary_search(label).map_err(|_| {
                    PipelineError::ShapeMismatch("label not seen when fitting the encoder".to_string())
                })
            })
            .collect()
    }

    pub fn decode(&self, class: usize) -> Option<&L> {
        self.classes.get(class)
    }

    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Check that records and targets line up and are non-empty
pub(crate) fn check_fit_input(
    name: &str,
    records: &Array2<f64>,
    targets: &[usize],
) -> Result<(), PipelineError> {
    if records.nrows() == 0 || records.ncols() == 0 {
        return Err(PipelineError::EmptyInput(format!(
            "{name} needs at least one row and one feature"
        )));
    }
    if records.nrows() != targets.len() {
        return Err(PipelineError::ShapeMismatch(format!(
            "{name}: {} rows but {} targets",
            records.nrows(),
            targets.len()
        )));
    }
    Ok(())
}

/// Error for `predict` before `fit`
pub(crate) fn not_fitted(name: &str) -> PipelineError {
    PipelineError::EstimatorError(format!("{name} used before fit"))
}
