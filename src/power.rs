//! Yeo-Johnson power transform
//!
//! Maps every column of a matrix towards a Gaussian shape and standardizes it
//! to zero mean and unit variance. The exponent λ of each column is the
//! maximum-likelihood estimate under a normal model, found with bounded Brent
//! minimization.

use crate::error::PipelineError;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Search interval for λ
const LAMBDA_BOUNDS: (f64, f64) = (-5.0, 5.0);

/// Relative tolerance of the λ search
const LAMBDA_TOLERANCE: f64 = 1e-8;

const MAX_ITERATIONS: usize = 500;

/// Columns with variance below this are treated as constant
const MIN_VARIANCE: f64 = 1e-12;

/// Per-column Yeo-Johnson transform with standardization
#[derive(Debug, Clone, PartialEq)]
pub struct PowerTransformer {
    lambdas: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl PowerTransformer {
    /// Estimate λ and the standardization parameters for each column
    pub fn fit(data: &Array2<f64>) -> Result<Self, PipelineError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(PipelineError::EmptyInput(
                "power transform needs at least one row and one column".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::ShapeMismatch(
                "power transform input contains non-finite values".to_string(),
            ));
        }

        let ncols = data.ncols();
        let mut lambdas = Array1::zeros(ncols);
        let mut means = Array1::zeros(ncols);
        let mut scales = Array1::ones(ncols);

        for (j, column) in data.axis_iter(Axis(1)).enumerate() {
            let lambda = optimize_lambda(column);
            let transformed = column.mapv(|x| yeo_johnson(x, lambda));
            let (mean, std) = mean_std(transformed.view());

            lambdas[j] = lambda;
            means[j] = mean;
            scales[j] = if std > MIN_VARIANCE.sqrt() { std } else { 1.0 };
        }

        Ok(Self {
            lambdas,
            means,
            scales,
        })
    }

    /// Apply the fitted transform
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        if data.ncols() != self.lambdas.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "power transform fitted on {} columns, got {}",
                self.lambdas.len(),
                data.ncols()
            )));
        }

        let mut out = data.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (lambda, mean, scale) = (self.lambdas[j], self.means[j], self.scales[j]);
            column.mapv_inplace(|x| (yeo_johnson(x, lambda) - mean) / scale);
        }
        Ok(out)
    }

    /// Fit on `data` and transform it
    pub fn fit_transform(data: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        Self::fit(data)?.transform(data)
    }

    /// Fitted exponent per column
    pub fn lambdas(&self) -> &Array1<f64> {
        &self.lambdas
    }
}

/// Yeo-Johnson transform of a single value
pub fn yeo_johnson(x: f64, lambda: f64) -> f64 {
    let eps = f64::EPSILON;
    if x >= 0.0 {
        if lambda.abs() < eps {
            x.ln_1p()
        } else {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        }
    } else if (lambda - 2.0).abs() > eps {
        -((1.0 - x).powf(2.0 - lambda) - 1.0) / (2.0 - lambda)
    } else {
        -(-x).ln_1p()
    }
}

/// Negative profile log-likelihood of λ for one column
fn negative_log_likelihood(column: ArrayView1<f64>, lambda: f64) -> f64 {
    let n = column.len() as f64;
    let transformed = column.mapv(|x| yeo_johnson(x, lambda));
    let (_, std) = mean_std(transformed.view());
    let variance = std * std;
    if variance < MIN_VARIANCE {
        return f64::INFINITY;
    }

    let jacobian: f64 = column.iter().map(|&x| x.signum() * x.abs().ln_1p()).sum();
    let log_likelihood = -n / 2.0 * variance.ln() + (lambda - 1.0) * jacobian;
    -log_likelihood
}

fn optimize_lambda(column: ArrayView1<f64>) -> f64 {
    let (_, std) = mean_std(column);
    if std * std < MIN_VARIANCE {
        return 1.0;
    }
    let (lower, upper) = LAMBDA_BOUNDS;
    brent_minimize(|l| negative_log_likelihood(column, l), lower, upper)
}

/// Population mean and standard deviation
fn mean_std(values: ArrayView1<f64>) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.sum() / n;
    let sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (mean, (sq / n).sqrt())
}

/// Bounded Brent minimization (golden section with parabolic steps)
fn brent_minimize<F: Fn(f64) -> f64>(f: F, lower: f64, upper: f64) -> f64 {
    let golden = 0.5 * (3.0 - 5f64.sqrt());
    let (mut a, mut b) = (lower, upper);

    let mut x = a + golden * (b - a);
    let (mut w, mut v) = (x, x);
    let mut fx = f(x);
    let (mut fw, mut fv) = (fx, fx);
    let (mut d, mut e) = (0.0f64, 0.0f64);

    for _ in 0..MAX_ITERATIONS {
        let midpoint = 0.5 * (a + b);
        let tol1 = LAMBDA_TOLERANCE * x.abs() + 1e-10;
        let tol2 = 2.0 * tol1;
        if (x - midpoint).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        let mut golden_step = true;
        if e.abs() > tol1 {
            // Parabola through x, w, v
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let previous_e = e;
            e = d;

            if p.abs() < (0.5 * q * previous_e).abs() && p > q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if midpoint >= x { tol1 } else { -tol1 };
                }
                golden_step = false;
            }
        }

        if golden_step {
            e = if x >= midpoint { a - x } else { b - x };
            d = golden * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else if d > 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u);

        if fu <= fx {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn skewness(values: ArrayView1<f64>) -> f64 {
        let (mean, std) = mean_std(values);
        let n = values.len() as f64;
        values.iter().map(|v| ((v - mean) / std).powi(3)).sum::<f64>() / n
    }

    #[test]
    fn test_yeo_johnson_identity_at_one() {
        for x in [-3.0, -0.5, 0.0, 0.5, 4.0] {
            assert_abs_diff_eq!(yeo_johnson(x, 1.0), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_yeo_johnson_log_branches() {
        assert_abs_diff_eq!(yeo_johnson(1.0, 0.0), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(yeo_johnson(-1.0, 2.0), -(2f64.ln()), epsilon = 1e-12);
    }

    #[test]
    fn test_brent_finds_parabola_minimum() {
        let min = brent_minimize(|x| (x - 1.3) * (x - 1.3) + 2.0, -5.0, 5.0);
        assert_abs_diff_eq!(min, 1.3, epsilon = 1e-6);
    }

    #[test]
    fn test_standardizes_columns() {
        let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 35.0], [4.0, 80.0], [9.0, 200.0]];
        let out = PowerTransformer::fit_transform(&data).unwrap();

        for column in out.axis_iter(Axis(1)) {
            let (mean, std) = mean_std(column);
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(std, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_reduces_skew() {
        let column = array![0.1, 0.2, 0.3, 0.5, 0.8, 1.0, 2.0, 5.0, 10.0, 50.0];
        let data = column.clone().insert_axis(Axis(1));
        let out = PowerTransformer::fit_transform(&data).unwrap();

        let before = skewness(column.view());
        let after = skewness(out.column(0));
        assert!(after.abs() < before.abs());
    }

    #[test]
    fn test_constant_columns_stay_finite() {
        let data = Array2::from_elem((4, 3), 2.5);
        let out = PowerTransformer::fit_transform(&data).unwrap();

        assert!(out.iter().all(|v| v.is_finite()));
        assert!(out.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_refit_is_deterministic() {
        let data = array![[0.5, -1.0], [1.5, 0.0], [3.0, 2.0], [7.0, 2.5]];
        let first = PowerTransformer::fit(&data).unwrap();
        let second = PowerTransformer::fit(&data).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.transform(&data).unwrap(),
            PowerTransformer::fit_transform(&data).unwrap()
        );
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let fitted = PowerTransformer::fit(&array![[1.0, 2.0], [2.0, 5.0]]).unwrap();
        assert!(fitted.transform(&array![[1.0], [2.0]]).is_err());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let data = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            PowerTransformer::fit(&data),
            Err(PipelineError::EmptyInput(_))
        ));
    }
}
