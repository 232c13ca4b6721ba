//! Per-dimension mean/std feature normalization, fit once on training data

use crate::data::LabeledExample;
use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};

/// Floor applied to per-dimension standard deviation to avoid division
/// by zero on constant features
pub const STD_FLOOR: f32 = 1e-6;

/// Per-dimension normalization statistics. Immutable after fitting;
/// every model embeds the stats it was fit with so inference scores are
/// always computed in the training-time normalized space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl NormalizationStats {
    /// Fit mean and standard deviation per dimension.
    /// Fails on an empty set or inconsistent dimensionality.
    pub fn fit(examples: &[&LabeledExample]) -> Result<Self> {
        let first = examples.first().ok_or(GateError::EmptyTrainingSet)?;
        let dim = first.features.len();
        let n = examples.len() as f32;

        let mut mean = vec![0.0f32; dim];
        for ex in examples {
            if ex.features.len() != dim {
                return Err(GateError::DimensionalityMismatch {
                    expected: dim,
                    found: ex.features.len(),
                });
            }
            for (m, &x) in mean.iter_mut().zip(&ex.features) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0f32; dim];
        for ex in examples {
            for ((v, &m), &x) in var.iter_mut().zip(&mean).zip(&ex.features) {
                let d = x - m;
                *v += d * d;
            }
        }
        let std = var
            .iter()
            .map(|v| (v / n).sqrt().max(STD_FLOOR))
            .collect();

        Ok(Self { mean, std })
    }

    /// Apply normalization to a raw feature vector. This is the single
    /// normalization code path used by all trainers and models.
    pub fn apply(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.mean.len() {
            return Err(GateError::DimensionalityMismatch {
                expected: self.mean.len(),
                found: vector.len(),
            });
        }
        Ok(vector
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FrameLabel;

    fn example(features: Vec<f32>) -> LabeledExample {
        LabeledExample {
            features,
            label: FrameLabel::Speech,
        }
    }

    #[test]
    fn test_fit_apply_zero_mean_unit_std() {
        let examples = vec![
            example(vec![1.0, 10.0]),
            example(vec![3.0, 20.0]),
            example(vec![5.0, 30.0]),
        ];
        let refs: Vec<&LabeledExample> = examples.iter().collect();
        let stats = NormalizationStats::fit(&refs).unwrap();

        let mut sum = vec![0.0f32; 2];
        let mut sum_sq = vec![0.0f32; 2];
        for ex in &examples {
            let z = stats.apply(&ex.features).unwrap();
            for d in 0..2 {
                sum[d] += z[d];
                sum_sq[d] += z[d] * z[d];
            }
        }
        for d in 0..2 {
            let mean = sum[d] / 3.0;
            let std = (sum_sq[d] / 3.0 - mean * mean).sqrt();
            assert!(mean.abs() < 1e-5, "mean not ~0: {}", mean);
            assert!((std - 1.0).abs() < 1e-4, "std not ~1: {}", std);
        }
    }

    #[test]
    fn test_constant_dimension_floored() {
        let examples = vec![example(vec![2.0]), example(vec![2.0])];
        let refs: Vec<&LabeledExample> = examples.iter().collect();
        let stats = NormalizationStats::fit(&refs).unwrap();
        assert!(stats.std[0] >= STD_FLOOR);
        // Normalizing the fitted value itself must stay finite
        let z = stats.apply(&[2.0]).unwrap();
        assert!(z[0].is_finite());
    }

    #[test]
    fn test_empty_fit_fails() {
        let refs: Vec<&LabeledExample> = vec![];
        assert!(NormalizationStats::fit(&refs).is_err());
    }

    #[test]
    fn test_mismatched_dims_fail() {
        let examples = vec![example(vec![1.0, 2.0]), example(vec![1.0])];
        let refs: Vec<&LabeledExample> = examples.iter().collect();
        assert!(NormalizationStats::fit(&refs).is_err());
    }
}
