//! Random forest built from bagged linfa decision trees
//!
//! Every tree sees a bootstrap sample of the rows and a random subset of
//! `round(sqrt(features))` columns. Prediction is a majority vote, ties going
//! to the lowest class id.

use super::{check_fit_input, not_fitted, Estimator, EstimatorRole};
use crate::config::ForestConfig;
use crate::error::PipelineError;
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

struct ForestMember {
    columns: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

pub struct RandomForestClassifier {
    config: ForestConfig,
    seed: u64,
    n_classes: usize,
    members: Vec<ForestMember>,
}

impl RandomForestClassifier {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            n_classes: 0,
            members: Vec::new(),
        }
    }
}

impl Estimator for RandomForestClassifier {
    fn name(&self) -> &'static str {
        "rfc"
    }

    fn role(&self) -> EstimatorRole {
        EstimatorRole::Classifier
    }

    fn fit(&mut self, records: &Array2<f64>, targets: &[usize]) -> Result<(), PipelineError> {
        check_fit_input(self.name(), records, targets)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let (n_rows, n_features) = records.dim();
        let n_selected = ((n_features as f64).sqrt().round() as usize).clamp(1, n_features);

        let mut members = Vec::with_capacity(self.config.n_trees);
        for _ in 0..self.config.n_trees {
            let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
            let mut columns = sample(&mut rng, n_features, n_selected).into_vec();
            columns.sort_unstable();

            let x = records.select(Axis(0), &rows).select(Axis(1), &columns);
            let y: Array1<usize> = rows.iter().map(|&r| targets[r]).collect();
            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(self.config.max_depth)
                .fit(&Dataset::new(x, y))
                .map_err(|e| PipelineError::EstimatorError(format!("tree fit failed: {e}")))?;

            members.push(ForestMember { columns, tree });
        }

        debug!(trees = members.len(), features = n_selected, "fitted random forest");
        self.n_classes = targets.iter().max().map_or(0, |m| m + 1);
        self.members = members;
        Ok(())
    }

    fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>, PipelineError> {
        if self.members.is_empty() {
            return Err(not_fitted(self.name()));
        }

        let mut votes = vec![vec![0usize; self.n_classes]; records.nrows()];
        for member in &self.members {
            let x = records.select(Axis(1), &member.columns);
            let predicted: Array1<usize> = member.tree.predict(&x);
            for (row, &class) in votes.iter_mut().zip(predicted.iter()) {
                if let Some(count) = row.get_mut(class) {
                    *count += 1;
                }
            }
        }

        Ok(votes
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (class, &count) in row.iter().enumerate() {
                    if count > row[best] {
                        best = class;
                    }
                }
                best
            })
            .collect())
    }
}
