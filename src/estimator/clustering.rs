//! K-means and Gaussian mixture clusterers from linfa-clustering

use super::{check_fit_input, not_fitted, Estimator, EstimatorRole};
use crate::error::PipelineError;
use linfa::prelude::*;
use linfa_clustering::{GaussianMixtureModel, KMeans};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Maximum number of k-means / EM iterations
const MAX_ITERATIONS: u64 = 300;

/// Convergence tolerance shared by both clusterers
const TOLERANCE: f64 = 1e-4;

fn check_cluster_count(name: &str, clusters: usize, rows: usize) -> Result<(), PipelineError> {
    if clusters > rows {
        return Err(PipelineError::EstimatorError(format!(
            "{name} asked for {clusters} clusters but only {rows} rows are available"
        )));
    }
    Ok(())
}

pub struct KMeansClusterer {
    n_clusters: usize,
    seed: u64,
    model: Option<KMeans<f64, L2Dist>>,
}

impl KMeansClusterer {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            seed,
            model: None,
        }
    }
}

impl Estimator for KMeansClusterer {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn role(&self) -> EstimatorRole {
        EstimatorRole::Clusterer
    }

    fn fit(&mut self, records: &Array2<f64>, targets: &[usize]) -> Result<(), PipelineError> {
        check_fit_input(self.name(), records, targets)?;
        check_cluster_count(self.name(), self.n_clusters, records.nrows())?;

        let dataset = DatasetBase::from(records.clone());
        let model = KMeans::params_with_rng(self.n_clusters, ChaCha8Rng::seed_from_u64(self.seed))
            .max_n_iterations(MAX_ITERATIONS)
            .tolerance(TOLERANCE)
            .fit(&dataset)
            .map_err(|e| PipelineError::EstimatorError(format!("k-means fit failed: {e}")))?;

        debug!(clusters = self.n_clusters, "fitted k-means");
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>, PipelineError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let labels: Array1<usize> = model.predict(records);
        Ok(labels.to_vec())
    }
}

pub struct GaussianMixtureClusterer {
    n_components: usize,
    seed: u64,
    model: Option<GaussianMixtureModel<f64>>,
}

impl GaussianMixtureClusterer {
    pub fn new(n_components: usize, seed: u64) -> Self {
        Self {
            n_components,
            seed,
            model: None,
        }
    }
}

impl Estimator for GaussianMixtureClusterer {
    fn name(&self) -> &'static str {
        "gmm"
    }

    fn role(&self) -> EstimatorRole {
        EstimatorRole::Clusterer
    }

    fn fit(&mut self, records: &Array2<f64>, targets: &[usize]) -> Result<(), PipelineError> {
        check_fit_input(self.name(), records, targets)?;
        check_cluster_count(self.name(), self.n_components, records.nrows())?;

        let dataset = DatasetBase::from(records.clone());
        let model = GaussianMixtureModel::params(self.n_components)
            .n_runs(1)
            .max_n_iterations(MAX_ITERATIONS)
            .tolerance(TOLERANCE)
            .with_rng(ChaCha8Rng::seed_from_u64(self.seed))
            .fit(&dataset)
            .map_err(|e| PipelineError::EstimatorError(format!("gmm fit failed: {e}")))?;

        debug!(components = self.n_components, "fitted gaussian mixture");
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>, PipelineError> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        let labels: Array1<usize> = model.predict(records);
        Ok(labels.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> Array2<f64> {
        array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.05, 0.05],
            [0.12, 0.08],
            [0.02, 0.13],
            [0.09, 0.11],
            [5.0, 5.1],
            [5.1, 5.0],
            [5.05, 5.05],
            [4.92, 5.08],
            [5.13, 4.95],
            [4.98, 4.9],
        ]
    }

    fn assert_two_groups(labels: &[usize]) {
        assert!(labels[..6].iter().all(|&l| l == labels[0]));
        assert!(labels[6..].iter().all(|&l| l == labels[6]));
        assert_ne!(labels[0], labels[6]);
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let records = blobs();
        let mut model = KMeansClusterer::new(2, 42);
        model.fit(&records, &[0; 12]).unwrap();

        assert_two_groups(&model.predict(&records).unwrap());
    }

    #[test]
    fn test_gmm_separates_blobs() {
        let records = blobs();
        let mut model = GaussianMixtureClusterer::new(2, 42);
        model.fit(&records, &[0; 12]).unwrap();

        assert_two_groups(&model.predict(&records).unwrap());
    }

    #[test]
    fn test_too_many_clusters() {
        let mut model = KMeansClusterer::new(20, 42);
        let result = model.fit(&blobs(), &[0; 12]);
        assert!(matches!(result, Err(PipelineError::EstimatorError(_))));
    }
}
