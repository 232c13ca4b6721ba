//! Feature-weighted kernel classifier: per-dimension importance weights
//! applied after normalization, before kernel scoring

use crate::config::{KernelConfig, WeightConfig, WeightPolicy};
use crate::data::{FeatureTable, FrameLabel, LabeledExample};
use crate::error::{GateError, Result};
use crate::kernel::{self, KernelModel};
use crate::normalize::NormalizationStats;

/// Train a kernel classifier behind a per-dimension feature-importance
/// transform. The returned model carries the weights in its
/// `feature_weights` field and applies them on every score.
pub fn train(
    table: &FeatureTable,
    weight_config: &WeightConfig,
    kernel_config: &KernelConfig,
) -> Result<KernelModel> {
    let dim = table.dim()?;
    let weights = match &weight_config.policy {
        WeightPolicy::Fixed(w) => {
            if w.len() != dim {
                return Err(GateError::DimensionalityMismatch {
                    expected: dim,
                    found: w.len(),
                });
            }
            w.clone()
        }
        WeightPolicy::VarianceRatio => variance_ratio_weights(table)?,
    };
    kernel::train_with_weights(table, kernel_config, Some(weights))
}

/// Fisher-style per-dimension weights: squared class-mean separation over
/// pooled within-class variance, rescaled to mean 1 so the overall kernel
/// bandwidth keeps its meaning.
pub fn variance_ratio_weights(table: &FeatureTable) -> Result<Vec<f32>> {
    let dim = table.dim()?;
    let examples = table.two_class();
    if examples.is_empty() {
        return Err(GateError::EmptyTrainingSet);
    }
    let speech: Vec<&LabeledExample> = examples
        .iter()
        .filter(|e| e.label == FrameLabel::Speech)
        .copied()
        .collect();
    let music: Vec<&LabeledExample> = examples
        .iter()
        .filter(|e| e.label == FrameLabel::Music)
        .copied()
        .collect();
    if speech.is_empty() || music.is_empty() {
        let missing = if speech.is_empty() { "speech" } else { "music" };
        return Err(GateError::SingleClassTrainingSet(format!(
            "no {} examples for variance-ratio weighting",
            missing
        )));
    }

    // Work in the normalized space the kernel will train in
    let stats = NormalizationStats::fit(&examples)?;
    let speech_stats = class_moments(&speech, &stats)?;
    let music_stats = class_moments(&music, &stats)?;

    let mut weights = Vec::with_capacity(dim);
    for d in 0..dim {
        let sep = speech_stats.0[d] - music_stats.0[d];
        let pooled = speech_stats.1[d] + music_stats.1[d] + 1e-6;
        weights.push(sep * sep / pooled);
    }

    // Rescale to mean 1
    let mean: f32 = weights.iter().sum::<f32>() / dim as f32;
    if mean > 0.0 {
        for w in &mut weights {
            *w /= mean;
        }
    } else {
        weights = vec![1.0; dim];
    }
    Ok(weights)
}

/// Per-dimension (mean, variance) of one class in normalized space
fn class_moments(
    examples: &[&LabeledExample],
    stats: &NormalizationStats,
) -> Result<(Vec<f32>, Vec<f32>)> {
    let dim = stats.dim();
    let n = examples.len() as f32;
    let mut mean = vec![0.0f32; dim];
    let mut transformed = Vec::with_capacity(examples.len());
    for ex in examples {
        let z = stats.apply(&ex.features)?;
        for d in 0..dim {
            mean[d] += z[d];
        }
        transformed.push(z);
    }
    for m in &mut mean {
        *m /= n;
    }
    let mut var = vec![0.0f32; dim];
    for z in &transformed {
        for d in 0..dim {
            let diff = z[d] - mean[d];
            var[d] += diff * diff;
        }
    }
    for v in &mut var {
        *v /= n;
    }
    Ok((mean, var))
}
