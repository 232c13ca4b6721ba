//! RBF-kernel soft-margin classifier trained by gradient descent

use crate::classifier::Classifier;
use crate::config::KernelConfig;
use crate::data::{FeatureTable, FrameLabel};
use crate::error::{GateError, Result};
use crate::normalize::NormalizationStats;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Fitted RBF-kernel classifier.
///
/// Decision score = bias + sum(weight_j * exp(-gamma * ||x - support_j||^2))
/// over the stored supports, computed in the normalized (and optionally
/// feature-weighted) space the model was trained in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelModel {
    pub stats: NormalizationStats,
    /// Per-dimension feature weights applied after normalization;
    /// present only for feature-weighted models
    pub feature_weights: Option<Vec<f32>>,
    /// Support vectors in the transformed space
    pub supports: Vec<Vec<f32>>,
    /// Signed weight per support (alpha_j * y_j)
    pub weights: Vec<f32>,
    pub bias: f32,
    pub gamma: f32,
    /// False when training hit the epoch cap without the loss improvement
    /// falling below the configured tolerance
    pub converged: bool,
}

impl KernelModel {
    /// Map a raw frame into the space the supports live in
    fn transform(&self, frame: &[f32]) -> Result<Vec<f32>> {
        let mut z = self.stats.apply(frame)?;
        if let Some(w) = &self.feature_weights {
            for (zi, &wi) in z.iter_mut().zip(w) {
                *zi *= wi;
            }
        }
        Ok(z)
    }

    fn kernel(&self, a: &[f32], b: &[f32]) -> f32 {
        let sq_dist: f32 = a.iter().zip(b).map(|(&x, &y)| (x - y) * (x - y)).sum();
        (-self.gamma * sq_dist).exp()
    }
}

impl Classifier for KernelModel {
    fn dim(&self) -> usize {
        self.stats.dim()
    }

    fn raw_score(&self, frame: &[f32]) -> Result<f32> {
        let z = self.transform(frame)?;
        let mut score = self.bias;
        for (support, &weight) in self.supports.iter().zip(&self.weights) {
            score += weight * self.kernel(&z, support);
        }
        Ok(score)
    }

    fn converged(&self) -> bool {
        self.converged
    }
}

/// Train an RBF-kernel soft-margin classifier on the speech/music examples
/// of the table (silence/noise excluded).
///
/// Minimizes `(1/N) sum max(0, 1 - y_i * f(x_i)) + lambda * ||alpha||^2`
/// by full-batch or seeded mini-batch subgradient steps, bounded by the
/// configured epoch count.
pub fn train(table: &FeatureTable, config: &KernelConfig) -> Result<KernelModel> {
    train_with_weights(table, config, None)
}

/// Shared fitting path; `feature_weights` is set by the feature-weighted
/// trainer and applied after normalization.
pub(crate) fn train_with_weights(
    table: &FeatureTable,
    config: &KernelConfig,
    feature_weights: Option<Vec<f32>>,
) -> Result<KernelModel> {
    config.validate()?;
    table.dim()?;

    let examples = table.two_class();
    if examples.is_empty() {
        return Err(GateError::EmptyTrainingSet);
    }
    let n_speech = examples
        .iter()
        .filter(|e| e.label == FrameLabel::Speech)
        .count();
    if n_speech == 0 || n_speech == examples.len() {
        let missing = if n_speech == 0 { "speech" } else { "music" };
        return Err(GateError::SingleClassTrainingSet(format!(
            "no {} examples in training set",
            missing
        )));
    }

    let stats = NormalizationStats::fit(&examples)?;
    if let Some(w) = &feature_weights {
        if w.len() != stats.dim() {
            return Err(GateError::DimensionalityMismatch {
                expected: stats.dim(),
                found: w.len(),
            });
        }
    }

    let n = examples.len();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(n);
    for ex in &examples {
        let mut z = stats.apply(&ex.features)?;
        if let Some(w) = &feature_weights {
            for (zi, &wi) in z.iter_mut().zip(w) {
                *zi *= wi;
            }
        }
        vectors.push(z);
    }
    let labels: Array1<f32> = examples.iter().map(|e| e.label.sign()).collect();

    // Gram matrix over the transformed training vectors
    let mut gram = Array2::<f32>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let sq_dist: f32 = vectors[i]
                .iter()
                .zip(&vectors[j])
                .map(|(&a, &b)| (a - b) * (a - b))
                .sum();
            let k = (-config.gamma * sq_dist).exp();
            gram[[i, j]] = k;
            gram[[j, i]] = k;
        }
    }

    let mut alpha = Array1::<f32>::zeros(n);
    let mut bias = 0.0f32;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..n).collect();
    let mut prev_loss = f32::INFINITY;
    let mut converged = false;

    for _epoch in 0..config.epochs {
        match config.batch_size {
            None => {
                gradient_step(&gram, &labels, &mut alpha, &mut bias, &indices, config);
            }
            Some(batch) => {
                indices.shuffle(&mut rng);
                for chunk in indices.chunks(batch.max(1)) {
                    gradient_step(&gram, &labels, &mut alpha, &mut bias, chunk, config);
                }
            }
        }

        let loss = objective(&gram, &labels, &alpha, bias, config.lambda);
        converged = (prev_loss - loss).abs() < config.tolerance;
        prev_loss = loss;
    }

    // Collect supports; optionally prune near-zero weights
    let mut supports = Vec::new();
    let mut weights = Vec::new();
    let prune = config.prune_epsilon.unwrap_or(0.0);
    for i in 0..n {
        let w = alpha[i] * labels[i];
        if config.prune_epsilon.is_some() && w.abs() < prune {
            continue;
        }
        supports.push(vectors[i].clone());
        weights.push(w);
    }

    Ok(KernelModel {
        stats,
        feature_weights,
        supports,
        weights,
        bias,
        gamma: config.gamma,
        converged,
    })
}

/// One subgradient step over the given example indices
fn gradient_step(
    gram: &Array2<f32>,
    labels: &Array1<f32>,
    alpha: &mut Array1<f32>,
    bias: &mut f32,
    batch: &[usize],
    config: &KernelConfig,
) {
    let n = alpha.len();
    let batch_n = batch.len() as f32;

    // Margin violators within the batch
    let mut violators = Vec::new();
    for &i in batch {
        let mut f = *bias;
        for j in 0..n {
            f += alpha[j] * labels[j] * gram[[i, j]];
        }
        if labels[i] * f < 1.0 {
            violators.push(i);
        }
    }

    let mut grad = Array1::<f32>::zeros(n);
    let mut grad_bias = 0.0f32;
    for &i in &violators {
        for j in 0..n {
            grad[j] -= labels[i] * labels[j] * gram[[i, j]] / batch_n;
        }
        grad_bias -= labels[i] / batch_n;
    }
    for j in 0..n {
        grad[j] += 2.0 * config.lambda * alpha[j];
    }

    for j in 0..n {
        alpha[j] -= config.learning_rate * grad[j];
    }
    *bias -= config.learning_rate * grad_bias;
}

/// Regularized hinge-loss objective over the full training set
fn objective(
    gram: &Array2<f32>,
    labels: &Array1<f32>,
    alpha: &Array1<f32>,
    bias: f32,
    lambda: f32,
) -> f32 {
    let n = alpha.len();
    let mut hinge = 0.0f32;
    for i in 0..n {
        let mut f = bias;
        for j in 0..n {
            f += alpha[j] * labels[j] * gram[[i, j]];
        }
        hinge += (1.0 - labels[i] * f).max(0.0);
    }
    hinge / n as f32 + lambda * alpha.iter().map(|a| a * a).sum::<f32>()
}
