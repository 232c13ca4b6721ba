//! Per-class diagonal-covariance Gaussian mixtures fit by EM

use crate::classifier::Classifier;
use crate::config::MixtureConfig;
use crate::data::{FeatureTable, FrameLabel};
use crate::error::{GateError, Result};
use crate::normalize::NormalizationStats;
use ndarray::Array2;
use rand::{rngs::StdRng, seq::index::sample, SeedableRng};
use serde::{Deserialize, Serialize};

const LN_2PI: f32 = 1.837_877_f32;

/// One diagonal-covariance Gaussian component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub weight: f32,
    pub mean: Vec<f32>,
    pub variance: Vec<f32>,
}

/// One class's mixture. Mixing weights sum to 1; variances stay at or
/// above the configured floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMixture {
    pub components: Vec<Component>,
}

impl ClassMixture {
    /// Log-likelihood of a transformed vector under this mixture
    pub fn log_likelihood(&self, z: &[f32]) -> f32 {
        let logs: Vec<f32> = self
            .components
            .iter()
            .map(|c| c.weight.max(f32::MIN_POSITIVE).ln() + log_gaussian(z, &c.mean, &c.variance))
            .collect();
        log_sum_exp(&logs)
    }
}

/// Fitted Bayes classifier over two class mixtures.
///
/// Raw score = prior-weighted log-likelihood ratio of speech over music;
/// positive classifies as speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureModel {
    pub stats: NormalizationStats,
    pub speech: ClassMixture,
    pub music: ClassMixture,
    pub speech_prior: f32,
    /// False when either class's EM hit the round cap without the
    /// log-likelihood improvement falling below tolerance
    pub converged: bool,
}

impl Classifier for MixtureModel {
    fn dim(&self) -> usize {
        self.stats.dim()
    }

    fn raw_score(&self, frame: &[f32]) -> Result<f32> {
        let z = self.stats.apply(frame)?;
        let ll_speech = self.speech.log_likelihood(&z) + self.speech_prior.ln();
        let ll_music = self.music.log_likelihood(&z) + (1.0 - self.speech_prior).ln();
        Ok(ll_speech - ll_music)
    }

    fn converged(&self) -> bool {
        self.converged
    }
}

/// Train one diagonal-covariance mixture per class via EM.
/// Fails if either class has zero training examples.
pub fn train(table: &FeatureTable, config: &MixtureConfig) -> Result<MixtureModel> {
    config.validate()?;
    table.dim()?;

    let examples = table.two_class();
    if examples.is_empty() {
        return Err(GateError::EmptyTrainingSet);
    }
    let stats = NormalizationStats::fit(&examples)?;

    let class_data = |label: FrameLabel| -> Result<Vec<Vec<f32>>> {
        let rows: Vec<&_> = examples.iter().filter(|e| e.label == label).collect();
        if rows.is_empty() {
            return Err(GateError::SingleClassTrainingSet(format!(
                "no {} examples in training set",
                label.name()
            )));
        }
        rows.iter().map(|e| stats.apply(&e.features)).collect()
    };

    let speech_data = class_data(FrameLabel::Speech)?;
    let music_data = class_data(FrameLabel::Music)?;

    let (speech, speech_converged) = fit_class(&speech_data, config, config.seed)?;
    let (music, music_converged) = fit_class(&music_data, config, config.seed.wrapping_add(1))?;

    Ok(MixtureModel {
        stats,
        speech,
        music,
        speech_prior: config.speech_prior,
        converged: speech_converged && music_converged,
    })
}

/// EM fit for one class. Returns the mixture and whether the tolerance
/// was met before the round cap.
fn fit_class(data: &[Vec<f32>], config: &MixtureConfig, seed: u64) -> Result<(ClassMixture, bool)> {
    let n = data.len();
    let dim = data[0].len();
    let k = config.components.min(n);
    let floor = config.variance_floor;

    // Initialization: seeded sample of k distinct examples as means,
    // global per-dimension variance, uniform mixing weights
    let mut rng = StdRng::seed_from_u64(seed);
    let picks = sample(&mut rng, n, k);
    let global_var = global_variance(data, floor);
    let mut components: Vec<Component> = picks
        .iter()
        .map(|i| Component {
            weight: 1.0 / k as f32,
            mean: data[i].clone(),
            variance: global_var.clone(),
        })
        .collect();

    let mut prev_ll = f32::NEG_INFINITY;
    let mut converged = false;

    for _round in 0..config.max_rounds {
        // E-step: log responsibilities per (example, component)
        let mut resp = Array2::<f32>::zeros((n, k));
        let mut total_ll = 0.0f32;
        for (i, x) in data.iter().enumerate() {
            let logs: Vec<f32> = components
                .iter()
                .map(|c| {
                    c.weight.max(f32::MIN_POSITIVE).ln() + log_gaussian(x, &c.mean, &c.variance)
                })
                .collect();
            let norm = log_sum_exp(&logs);
            total_ll += norm;
            for (c, &lg) in logs.iter().enumerate() {
                resp[[i, c]] = (lg - norm).exp();
            }
        }
        let avg_ll = total_ll / n as f32;

        // M-step: responsibility-weighted statistics, variance floored
        for c in 0..k {
            let nc: f32 = (0..n).map(|i| resp[[i, c]]).sum();
            let nc_safe = nc.max(f32::MIN_POSITIVE);

            let mut mean = vec![0.0f32; dim];
            for (i, x) in data.iter().enumerate() {
                for d in 0..dim {
                    mean[d] += resp[[i, c]] * x[d];
                }
            }
            for m in &mut mean {
                *m /= nc_safe;
            }

            let mut variance = vec![0.0f32; dim];
            for (i, x) in data.iter().enumerate() {
                for d in 0..dim {
                    let diff = x[d] - mean[d];
                    variance[d] += resp[[i, c]] * diff * diff;
                }
            }
            for v in &mut variance {
                *v = (*v / nc_safe).max(floor);
            }

            components[c] = Component {
                weight: nc / n as f32,
                mean,
                variance,
            };
        }

        if (avg_ll - prev_ll).abs() < config.tolerance {
            converged = true;
            break;
        }
        prev_ll = avg_ll;
    }

    Ok((ClassMixture { components }, converged))
}

fn global_variance(data: &[Vec<f32>], floor: f32) -> Vec<f32> {
    let n = data.len() as f32;
    let dim = data[0].len();
    let mut mean = vec![0.0f32; dim];
    for x in data {
        for d in 0..dim {
            mean[d] += x[d];
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    let mut var = vec![0.0f32; dim];
    for x in data {
        for d in 0..dim {
            let diff = x[d] - mean[d];
            var[d] += diff * diff;
        }
    }
    var.iter().map(|v| (v / n).max(floor)).collect()
}

/// Log density of a diagonal-covariance Gaussian
fn log_gaussian(x: &[f32], mean: &[f32], variance: &[f32]) -> f32 {
    let mut ll = 0.0f32;
    for d in 0..x.len() {
        let diff = x[d] - mean[d];
        ll += -0.5 * (LN_2PI + variance[d].ln()) - diff * diff / (2.0 * variance[d]);
    }
    ll
}

fn log_sum_exp(logs: &[f32]) -> f32 {
    let max = logs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return max;
    }
    max + logs.iter().map(|l| (l - max).exp()).sum::<f32>().ln()
}
