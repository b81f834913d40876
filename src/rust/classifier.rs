use log::{debug, info, warn};
use ndarray::{Array1, Array2, Axis};

use crate::config::TrainingConfig;
use crate::dataset::Label;
use crate::embedding::EmbeddingVector;
use crate::error::PipelineError;

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + exp(z))` without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Binary logistic regression with an L2 penalty on the weights.
///
/// Minimizes the mean log-loss plus `||w||² / (2 · c · n)`, which has the same
/// minimizer as the usual `||w||² / 2 + c · Σ loss` formulation. The intercept
/// is not penalized. Optimization is Nesterov-accelerated gradient descent
/// with a fixed step of `1 / L`, where `L` bounds the gradient's Lipschitz
/// constant.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: TrainingConfig,
}

impl LogisticRegression {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fits weights and intercept to `(vectors, labels)`.
    ///
    /// Reaching `max_iter` without meeting the tolerance is logged, not an error.
    ///
    /// # Errors
    /// - `DegenerateTrainingSetError` if lengths differ, fewer than 2 examples
    ///   are given, or only one class is present
    /// - `DimensionMismatchError` if the vectors do not share one width
    /// - `BuildError` if the training config is unusable
    pub fn fit(
        &self,
        vectors: &[EmbeddingVector],
        labels: &[Label],
    ) -> Result<TrainedClassifier, PipelineError> {
        let TrainingConfig { max_iter, tolerance, c } = self.config;
        if max_iter == 0 || !(c > 0.0) || !(tolerance >= 0.0) {
            return Err(PipelineError::BuildError(format!(
                "Invalid training config: max_iter {}, tolerance {}, c {}",
                max_iter, tolerance, c
            )));
        }

        if vectors.len() != labels.len() {
            return Err(PipelineError::DegenerateTrainingSetError(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        let n = vectors.len();
        if n < 2 {
            return Err(PipelineError::DegenerateTrainingSetError(format!(
                "need at least 2 examples, got {}",
                n
            )));
        }
        let positives = labels.iter().filter(|&&l| l == Label::Positive).count();
        if positives == 0 || positives == n {
            let only = if positives == 0 { Label::Negative } else { Label::Positive };
            return Err(PipelineError::DegenerateTrainingSetError(format!(
                "all {} examples have label {}; both classes are required",
                n, only
            )));
        }

        let dim = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(PipelineError::DimensionMismatchError {
                expected: dim,
                actual: bad.len(),
            });
        }

        let mut x = Array2::<f64>::zeros((n, dim));
        for (mut row, vector) in x.axis_iter_mut(Axis(0)).zip(vectors) {
            row.assign(&vector.mapv(f64::from));
        }
        let y: Array1<f64> = labels.iter().map(|&l| f64::from(l.as_u8())).collect();

        let n_f = n as f64;
        let alpha = 1.0 / (c * n_f);
        let mean_sq_norm = x.mapv(|v| v * v).sum() / n_f;
        let lipschitz = 0.25 * (mean_sq_norm + 1.0) + alpha;
        let step = 1.0 / lipschitz;
        debug!(
            "Fitting logistic regression: {} examples, {} features, step {:.3e}",
            n, dim, step
        );

        let gradient = |w: &Array1<f64>, b: f64| -> (Array1<f64>, f64) {
            let z = x.dot(w) + b;
            let residual = z.mapv(sigmoid) - &y;
            let grad_w = x.t().dot(&residual) / n_f + w * alpha;
            let grad_b = residual.sum() / n_f;
            (grad_w, grad_b)
        };

        let mut w = Array1::<f64>::zeros(dim);
        let mut b = 0.0;
        let mut w_prev = w.clone();
        let mut b_prev = b;
        let mut converged = false;
        let mut iterations = 0;

        for k in 1..=max_iter {
            iterations = k;
            let momentum = (k as f64 - 1.0) / (k as f64 + 2.0);
            let w_look = &w + &((&w - &w_prev) * momentum);
            let b_look = b + (b - b_prev) * momentum;

            let (grad_w, grad_b) = gradient(&w_look, b_look);
            let max_grad = grad_w.iter().fold(grad_b.abs(), |m, g| m.max(g.abs()));
            if max_grad <= tolerance {
                w = w_look;
                b = b_look;
                converged = true;
                break;
            }

            w_prev = w;
            b_prev = b;
            w = w_look - grad_w * step;
            b = b_look - grad_b * step;
        }

        let model = TrainedClassifier {
            weights: w,
            intercept: b,
            iterations,
            converged,
        };

        let loss = model
            .decision_values(&x)
            .iter()
            .zip(y.iter())
            .map(|(&z, &t)| softplus(z) - t * z)
            .sum::<f64>()
            / n_f;

        if converged {
            info!(
                "Logistic regression converged after {} iterations (mean log-loss {:.4})",
                iterations, loss
            );
        } else {
            warn!(
                "Logistic regression stopped at max_iter={} without converging (mean log-loss {:.4}); consider raising max_iter",
                max_iter, loss
            );
        }

        Ok(model)
    }
}

/// Fitted logistic regression parameters, consumed through `predict`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedClassifier {
    weights: Array1<f64>,
    intercept: f64,
    iterations: usize,
    converged: bool,
}

impl TrainedClassifier {
    /// Wraps existing parameters, e.g. ones fitted elsewhere.
    pub fn from_parameters(weights: Array1<f64>, intercept: f64) -> Self {
        Self {
            weights,
            intercept,
            iterations: 0,
            converged: true,
        }
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    fn decision_values(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.intercept
    }

    fn check_width(&self, vector: &EmbeddingVector) -> Result<(), PipelineError> {
        if vector.len() != self.dimension() {
            return Err(PipelineError::DimensionMismatchError {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Probability of `Label::Positive` for each vector, in input order.
    pub fn predict_proba(&self, vectors: &[EmbeddingVector]) -> Result<Vec<f64>, PipelineError> {
        vectors
            .iter()
            .map(|vector| {
                self.check_width(vector)?;
                let z = vector
                    .iter()
                    .zip(self.weights.iter())
                    .map(|(&v, &w)| f64::from(v) * w)
                    .sum::<f64>()
                    + self.intercept;
                Ok(sigmoid(z))
            })
            .collect()
    }

    /// Most likely label for each vector, in input order.
    ///
    /// A probability of exactly 0.5 resolves to `Label::Negative`.
    ///
    /// # Errors
    /// - `DimensionMismatchError` if a vector's width differs from the trained width
    pub fn predict(&self, vectors: &[EmbeddingVector]) -> Result<Vec<Label>, PipelineError> {
        Ok(self
            .predict_proba(vectors)?
            .into_iter()
            .map(|p| if p > 0.5 { Label::Positive } else { Label::Negative })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn vecs(rows: &[&[f32]]) -> Vec<EmbeddingVector> {
        rows.iter().map(|r| Array1::from(r.to_vec())).collect()
    }

    #[test]
    fn test_separates_linearly_separable_data() -> Result<(), PipelineError> {
        let vectors = vecs(&[
            &[2.0, 1.5], &[1.5, 2.5], &[3.0, 2.0], &[2.5, 3.0],
            &[-2.0, -1.0], &[-1.5, -2.5], &[-3.0, -2.0], &[-2.5, -1.5],
        ]);
        let labels = [
            Label::Positive, Label::Positive, Label::Positive, Label::Positive,
            Label::Negative, Label::Negative, Label::Negative, Label::Negative,
        ];

        let model = LogisticRegression::default().fit(&vectors, &labels)?;
        assert_eq!(model.predict(&vectors)?, labels.to_vec());
        assert_eq!(model.dimension(), 2);

        let held_out = vecs(&[&[4.0, 4.0], &[-4.0, -3.0]]);
        assert_eq!(model.predict(&held_out)?, vec![Label::Positive, Label::Negative]);
        Ok(())
    }

    #[test]
    fn test_converges_on_small_problem() -> Result<(), PipelineError> {
        let vectors = vecs(&[&[-2.0], &[-1.0], &[1.0], &[2.0]]);
        let labels = [Label::Negative, Label::Negative, Label::Positive, Label::Positive];

        let model = LogisticRegression::default().fit(&vectors, &labels)?;
        assert!(model.converged());
        assert!(model.iterations() < 1000);
        assert!(model.weights()[0] > 0.0);
        // Symmetric data gives a near-zero intercept
        assert!(model.intercept().abs() < 1e-2);
        Ok(())
    }

    #[test]
    fn test_iteration_cap_is_respected() -> Result<(), PipelineError> {
        let vectors = vecs(&[&[-2.0], &[-1.0], &[1.0], &[2.0]]);
        let labels = [Label::Negative, Label::Negative, Label::Positive, Label::Positive];
        let config = TrainingConfig { max_iter: 3, tolerance: 0.0, c: 1.0 };

        let model = LogisticRegression::new(config).fit(&vectors, &labels)?;
        assert_eq!(model.iterations(), 3);
        assert!(!model.converged());
        Ok(())
    }

    #[test]
    fn test_fit_is_deterministic() -> Result<(), PipelineError> {
        let vectors = vecs(&[&[0.3, -1.0], &[1.2, 0.4], &[-0.7, 0.1], &[0.9, 0.8], &[-1.1, -0.2]]);
        let labels = [Label::Negative, Label::Positive, Label::Negative, Label::Positive, Label::Negative];

        let first = LogisticRegression::default().fit(&vectors, &labels)?;
        let second = LogisticRegression::default().fit(&vectors, &labels)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_single_class_is_degenerate() {
        let vectors = vecs(&[&[1.0], &[2.0], &[3.0]]);
        let labels = [Label::Negative; 3];
        assert!(matches!(
            LogisticRegression::default().fit(&vectors, &labels),
            Err(PipelineError::DegenerateTrainingSetError(_))
        ));
    }

    #[test]
    fn test_too_few_or_misaligned_examples() {
        let one = vecs(&[&[1.0]]);
        assert!(matches!(
            LogisticRegression::default().fit(&one, &[Label::Positive]),
            Err(PipelineError::DegenerateTrainingSetError(_))
        ));

        let two = vecs(&[&[1.0], &[-1.0]]);
        assert!(matches!(
            LogisticRegression::default().fit(&two, &[Label::Positive]),
            Err(PipelineError::DegenerateTrainingSetError(_))
        ));
    }

    #[test]
    fn test_ragged_vectors_rejected() {
        let vectors = vecs(&[&[1.0, 0.0], &[-1.0]]);
        assert!(matches!(
            LogisticRegression::default().fit(&vectors, &[Label::Positive, Label::Negative]),
            Err(PipelineError::DimensionMismatchError { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let vectors = vecs(&[&[1.0], &[-1.0]]);
        let labels = [Label::Positive, Label::Negative];
        let config = TrainingConfig { c: 0.0, ..TrainingConfig::default() };
        assert!(matches!(
            LogisticRegression::new(config).fit(&vectors, &labels),
            Err(PipelineError::BuildError(_))
        ));
    }

    #[test]
    fn test_tie_resolves_to_negative() -> Result<(), PipelineError> {
        let model = TrainedClassifier::from_parameters(array![0.0, 0.0], 0.0);
        let vectors = vecs(&[&[5.0, -3.0]]);
        assert_eq!(model.predict_proba(&vectors)?, vec![0.5]);
        assert_eq!(model.predict(&vectors)?, vec![Label::Negative]);
        Ok(())
    }

    #[test]
    fn test_predict_checks_width() {
        let model = TrainedClassifier::from_parameters(array![1.0, 1.0], 0.0);
        assert!(matches!(
            model.predict(&vecs(&[&[1.0, 2.0, 3.0]])),
            Err(PipelineError::DimensionMismatchError { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_predict_empty_input() -> Result<(), PipelineError> {
        let model = TrainedClassifier::from_parameters(array![1.0], 0.0);
        assert!(model.predict(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(softplus(1000.0).is_finite());
    }
}
