//! Polynomial-kernel SVM, one-vs-rest over the classes seen in training

use super::{check_fit_input, not_fitted, Estimator, EstimatorRole};
use crate::config::SvmConfig;
use crate::error::PipelineError;
use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2};
use tracing::debug;

/// One binary probabilistic SVM per class; the most confident class wins
pub struct SvmClassifier {
    config: SvmConfig,
    models: Vec<Svm<f64, Pr>>,
}

impl SvmClassifier {
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            models: Vec::new(),
        }
    }
}

impl Estimator for SvmClassifier {
    fn name(&self) -> &'static str {
        "svm"
    }

    fn role(&self) -> EstimatorRole {
        EstimatorRole::Classifier
    }

    fn fit(&mut self, records: &Array2<f64>, targets: &[usize]) -> Result<(), PipelineError> {
        check_fit_input(self.name(), records, targets)?;
        let n_classes = targets.iter().max().map_or(0, |m| m + 1);
        if n_classes < 2 {
            return Err(PipelineError::EstimatorError(
                "svm needs at least two classes".to_string(),
            ));
        }

        let params = Svm::<f64, Pr>::params()
            .pos_neg_weights(self.config.c, self.config.c)
            .polynomial_kernel(self.config.poly_constant, self.config.degree);

        let mut models = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let binary: Array1<bool> = targets.iter().map(|&t| t == class).collect();
            let dataset = Dataset::new(records.clone(), binary);
            let model = params.fit(&dataset).map_err(|e| {
                PipelineError::EstimatorError(format!("svm fit for class {class} failed: {e}"))
            })?;
            debug!(class, "fitted one-vs-rest svm");
            models.push(model);
        }

        self.models = models;
        Ok(())
    }

    fn predict(&self, records: &Array2<f64>) -> Result<Vec<usize>, PipelineError> {
        if self.models.is_empty() {
            return Err(not_fitted(self.name()));
        }

        let mut best = vec![(0usize, f32::NEG_INFINITY); records.nrows()];
        for (class, model) in self.models.iter().enumerate() {
            let probabilities: Array1<Pr> = model.predict(records);
            for (slot, p) in best.iter_mut().zip(probabilities.iter()) {
                if **p > slot.1 {
                    *slot = (class, **p);
                }
            }
        }

        Ok(best.into_iter().map(|(class, _)| class).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_predict_before_fit() {
        let svm = SvmClassifier::new(SvmConfig::default());
        assert!(svm.predict(&array![[1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_single_class_rejected() {
        let mut svm = SvmClassifier::new(SvmConfig::default());
        let result = svm.fit(&array![[1.0, 0.0], [0.9, 0.1]], &[0, 0]);
        assert!(matches!(result, Err(PipelineError::EstimatorError(_))));
    }

    #[test]
    fn test_separates_directions() {
        let records = array![
            [1.0, 0.0],
            [0.95, 0.05],
            [0.9, 0.1],
            [0.97, -0.05],
            [0.0, 1.0],
            [0.05, 0.95],
            [-0.1, 0.9],
            [0.02, 1.05],
            [-1.0, 0.0],
            [-0.95, 0.05],
            [-0.9, -0.1],
            [-1.05, 0.02],
        ];
        let targets = [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];

        let mut svm = SvmClassifier::new(SvmConfig::default());
        svm.fit(&records, &targets).unwrap();
        let predicted = svm.predict(&array![[0.98, 0.0], [0.0, 0.98], [-0.98, 0.0]]).unwrap();

        assert_eq!(predicted, vec![0, 1, 2]);
    }
}
