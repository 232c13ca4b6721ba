//! Constrained parameter search over the decision-pipeline grid

use crate::classifier::Classifier;
use crate::config::{ParameterGrid, PipelineConfig};
use crate::data::FrameStream;
use crate::error::{GateError, Result};
use crate::pipeline::{self, StreamMetrics};
use serde::{Deserialize, Serialize};

/// Candidate metrics normalized against the baseline, capped at 1.0
/// ("no loss")
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub overall: f32,
    pub speech: f32,
    pub music: f32,
}

impl NormalizedMetrics {
    fn compute(candidate: &StreamMetrics, baseline: &StreamMetrics) -> Self {
        Self {
            overall: normalized(candidate.overall_accuracy(), baseline.overall_accuracy()),
            speech: normalized(candidate.speech_accuracy(), baseline.speech_accuracy()),
            music: normalized(candidate.music_accuracy(), baseline.music_accuracy()),
        }
    }

    fn min(&self) -> f32 {
        self.overall.min(self.speech).min(self.music)
    }
}

/// A baseline group that cannot be degraded (zero denominator or zero
/// baseline accuracy) normalizes to 1.0
fn normalized(candidate: f32, baseline: f32) -> f32 {
    if baseline <= 0.0 {
        1.0
    } else {
        (candidate / baseline).min(1.0)
    }
}

/// One evaluated parameter set with its measured metrics
#[derive(Debug, Clone, Serialize)]
pub struct SearchCandidate {
    pub pipeline: PipelineConfig,
    pub metrics: StreamMetrics,
    pub normalized: NormalizedMetrics,
    /// Compute-cost proxy: fraction of frames invoking the classifier
    pub invoked_fraction: f32,
    /// Worst relative accuracy loss across the three metric groups
    pub degradation: f32,
    pub feasible: bool,
}

/// Full search result. `best` indexes into `candidates`; `None` means no
/// candidate satisfied the degradation budget, which is a valid outcome,
/// not an error.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub baseline: StreamMetrics,
    pub max_degradation: f32,
    pub candidates: Vec<SearchCandidate>,
    pub best: Option<usize>,
}

impl SearchOutcome {
    pub fn best_candidate(&self) -> Option<&SearchCandidate> {
        self.best.map(|i| &self.candidates[i])
    }
}

/// Search the grid for the parameter set maximizing compute savings
/// (lowest classifier-invocation fraction) subject to the relative
/// accuracy-degradation budget.
///
/// The baseline is the classifier-fallback-only pipeline, computed once.
/// Candidates are evaluated in the grid's deterministic lexicographic
/// order; ties on invocation fraction break toward smaller degradation,
/// then toward the earlier candidate.
pub fn search(
    model: &dyn Classifier,
    streams: &[FrameStream],
    grid: &ParameterGrid,
    max_degradation: f32,
) -> Result<SearchOutcome> {
    if !(0.0..1.0).contains(&max_degradation) {
        return Err(GateError::InvalidConfigParameter(format!(
            "max_degradation must lie in [0, 1), got {}",
            max_degradation
        )));
    }
    if grid.is_empty() {
        return Err(GateError::InvalidConfigParameter(
            "parameter grid has an empty axis".to_string(),
        ));
    }
    if streams.is_empty() {
        return Err(GateError::EmptyStream("evaluation set".to_string()));
    }
    for stream in streams {
        stream.validate(model.dim())?;
        if stream.labels.is_none() {
            return Err(GateError::MissingStreamLabels(stream.name.clone()));
        }
    }

    let baseline = evaluate(model, streams, &PipelineConfig::baseline())?;
    let floor = 1.0 - max_degradation;

    let mut candidates = Vec::new();
    let mut best: Option<usize> = None;
    for config in grid.candidates() {
        let metrics = evaluate(model, streams, &config)?;
        let norm = NormalizedMetrics::compute(&metrics, &baseline);
        let degradation = 1.0 - norm.min();
        let feasible = norm.overall >= floor && norm.speech >= floor && norm.music >= floor;
        let invoked_fraction = metrics.invoked_fraction();

        let index = candidates.len();
        candidates.push(SearchCandidate {
            pipeline: config,
            metrics,
            normalized: norm,
            invoked_fraction,
            degradation,
            feasible,
        });

        if !feasible {
            continue;
        }
        best = match best {
            None => Some(index),
            Some(b) => {
                let current = &candidates[b];
                let challenger = &candidates[index];
                let better = challenger.invoked_fraction < current.invoked_fraction
                    || (challenger.invoked_fraction == current.invoked_fraction
                        && challenger.degradation < current.degradation);
                if better {
                    Some(index)
                } else {
                    Some(b)
                }
            }
        };
    }

    Ok(SearchOutcome {
        baseline,
        max_degradation,
        candidates,
        best,
    })
}

/// Evaluate one pipeline configuration over all streams; history resets
/// per stream inside the pipeline run
fn evaluate(
    model: &dyn Classifier,
    streams: &[FrameStream],
    config: &PipelineConfig,
) -> Result<StreamMetrics> {
    let mut total = StreamMetrics::default();
    for stream in streams {
        let run = pipeline::run(model, stream, config)?;
        total.merge(&run.metrics);
    }
    Ok(total)
}
