//! Evaluation of estimators on activity features
//!
//! Classifiers are scored directly; clusterers are fitted on the training
//! split, their training clusters reconciled with the training activities, and
//! the resulting map applied to the test predictions. Every split is L2
//! row-normalized on its own before fitting or predicting.

use crate::config::EvaluationConfig;
use crate::error::PipelineError;
use crate::estimator::{Estimator, EstimatorKind, EstimatorRole, LabelEncoder};
use crate::metrics::{macro_f1, macro_f1_labels};
use crate::reconciler::{ClusterActivityMap, ContingencyTable};
use crate::types::ActivityLabel;
use crate::SENSORY_VERSION;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Feature matrices and labels of a train/test split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Vec<ActivityLabel>,
    pub x_test: Array2<f64>,
    pub y_test: Vec<ActivityLabel>,
}

impl TrainTestSplit {
    /// Check shapes before any numeric work
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.x_train.nrows() != self.y_train.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "train split has {} rows but {} labels",
                self.x_train.nrows(),
                self.y_train.len()
            )));
        }
        if self.x_test.nrows() != self.y_test.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "test split has {} rows but {} labels",
                self.x_test.nrows(),
                self.y_test.len()
            )));
        }
        if self.y_train.is_empty() || self.y_test.is_empty() {
            return Err(PipelineError::EmptyInput(
                "train and test splits must both contain instances".to_string(),
            ));
        }
        if self.x_train.ncols() != self.x_test.ncols() {
            return Err(PipelineError::ShapeMismatch(format!(
                "train split has {} features, test split has {}",
                self.x_train.ncols(),
                self.x_test.ncols()
            )));
        }
        Ok(())
    }
}

/// Scale every row to unit L2 norm; all-zero rows stay zero
pub fn normalize_rows(records: &Array2<f64>) -> Array2<f64> {
    let mut out = records.clone();
    for mut row in out.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    out
}

/// Score of one estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub estimator: EstimatorKind,
    pub macro_f1: f64,
}

/// Result of scoring every estimator on one split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub run_id: String,
    pub computed_at: DateTime<Utc>,
    pub producer_version: String,
    pub cluster_count: usize,
    pub scores: Vec<ModelScore>,
}

impl EvaluationReport {
    pub fn score(&self, kind: EstimatorKind) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.estimator == kind)
            .map(|s| s.macro_f1)
    }

    /// Row for the performance log; missing scores are written as NaN
    pub fn to_row(&self) -> PerformanceRow {
        let get = |kind| self.score(kind).unwrap_or(f64::NAN);
        PerformanceRow {
            cluster_count: self.cluster_count,
            svm_f1: get(EstimatorKind::Svm),
            rfc_f1: get(EstimatorKind::RandomForest),
            kmeans_f1: get(EstimatorKind::KMeans),
            gmm_f1: get(EstimatorKind::GaussianMixture),
        }
    }
}

/// Scores the estimators of an [`EvaluationConfig`]
pub struct Evaluator {
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Fit `estimator` on the training split and return test macro-F1 (0-100)
    pub fn score(
        &self,
        split: &TrainTestSplit,
        estimator: &mut dyn Estimator,
    ) -> Result<f64, PipelineError> {
        split.validate()?;

        let x_train = normalize_rows(&split.x_train);
        let x_test = normalize_rows(&split.x_test);
        let encoder = LabelEncoder::fit(&split.y_train);
        let y_train = encoder.encode(&split.y_train)?;

        estimator.fit(&x_train, &y_train)?;

        let score = match estimator.role() {
            EstimatorRole::Classifier => {
                let predicted = estimator
                    .predict(&x_test)?
                    .into_iter()
                    .map(|class| encoder.decode(class).cloned())
                    .collect::<Vec<_>>();
                macro_f1(&split.y_test, &predicted)?
            }
            EstimatorRole::Clusterer => {
                let train_clusters = estimator.predict(&x_train)?;
                let table = ContingencyTable::from_assignments(&split.y_train, &train_clusters)?;
                debug!(estimator = estimator.name(), "contingency table\n{table}");

                let map = ClusterActivityMap::from_table(&table);
                let test_clusters = estimator.predict(&x_test)?;
                macro_f1(&split.y_test, &map.apply(&test_clusters))?
            }
        };

        info!(estimator = estimator.name(), macro_f1 = score, "scored estimator");
        Ok(score)
    }

    /// Score every estimator family and collect a report
    pub fn evaluate_all(
        &self,
        split: &TrainTestSplit,
        cluster_count: usize,
    ) -> Result<EvaluationReport, PipelineError> {
        split.validate()?;

        let mut scores = Vec::with_capacity(EstimatorKind::ALL.len());
        for kind in EstimatorKind::ALL {
            let mut estimator = kind.build(&self.config);
            let macro_f1 = self.score(split, estimator.as_mut())?;
            scores.push(ModelScore {
                estimator: kind,
                macro_f1,
            });
        }

        Ok(EvaluationReport {
            run_id: Uuid::new_v4().to_string(),
            computed_at: Utc::now(),
            producer_version: SENSORY_VERSION.to_string(),
            cluster_count,
            scores,
        })
    }
}

/// Macro-F1 of cluster assignments reconciled against labels of the same items
pub fn score_assignments(
    labels: &[ActivityLabel],
    clusters: &[usize],
) -> Result<f64, PipelineError> {
    let table = ContingencyTable::from_assignments(labels, clusters)?;
    let map = ClusterActivityMap::from_table(&table);
    macro_f1(labels, &map.apply(clusters))
}

/// Macro-F1 of already-labelled predictions
pub fn score_labels(
    truth: &[ActivityLabel],
    predicted: &[ActivityLabel],
) -> Result<f64, PipelineError> {
    macro_f1_labels(truth, predicted)
}

/// One line of the experiment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub cluster_count: usize,
    pub svm_f1: f64,
    pub rfc_f1: f64,
    pub kmeans_f1: f64,
    pub gmm_f1: f64,
}

/// Append-only CSV log of performance rows (no header)
pub struct PerformanceLog;

impl PerformanceLog {
    pub fn append(path: &Path, row: &PerformanceRow) -> Result<(), PipelineError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PipelineError::io(path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;

        info!(path = %path.display(), cluster_count = row.cluster_count, "appended performance row");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Vec<PerformanceRow>, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<PerformanceRow>, _>>()?;
        Ok(rows)
    }
}
