//! Speech/Music Frame Classification with Compute-Reduction Gating
//!
//! Trains two-class frame classifiers (RBF-kernel and diagonal-covariance
//! mixture models) and reduces per-frame inference cost by shortcutting
//! classifier invocations with deterministic filtering and decision
//! skipping, tuned by a constrained parameter search against a
//! no-shortcut baseline.

pub mod classifier;
pub mod config;
pub mod data;
pub mod error;
pub mod kernel;
pub mod mixture;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod search;
pub mod weighted;

pub use classifier::{Classifier, Decision};
pub use config::{
    Config, FilterRule, KernelConfig, MechanismOrder, MixtureConfig, ParameterGrid,
    PipelineConfig, SearchConfig, WeightConfig, WeightPolicy,
};
pub use data::{FeatureTable, FrameLabel, FrameStream, LabeledExample};
pub use error::{GateError, Result};
pub use kernel::KernelModel;
pub use mixture::MixtureModel;
pub use normalize::NormalizationStats;
pub use pipeline::{DecisionRecord, DecisionRule, StreamMetrics, StreamRun};
pub use search::{SearchCandidate, SearchOutcome};

/// Train an RBF-kernel soft-margin classifier on the speech/music
/// examples of a labeled feature table
pub fn train_kernel_classifier(table: &FeatureTable, config: &KernelConfig) -> Result<KernelModel> {
    kernel::train(table, config)
}

/// Train per-class diagonal-covariance Gaussian mixtures via EM
pub fn train_mixture_classifier(
    table: &FeatureTable,
    config: &MixtureConfig,
) -> Result<MixtureModel> {
    mixture::train(table, config)
}

/// Train a feature-weighted kernel classifier; the returned model carries
/// the per-dimension weights in its `feature_weights` field
pub fn train_weighted_classifier(
    table: &FeatureTable,
    weight_config: &WeightConfig,
    kernel_config: &KernelConfig,
) -> Result<KernelModel> {
    weighted::train(table, weight_config, kernel_config)
}

/// Run the filter/skip/classifier decision pipeline over one stream
pub fn run_decision_pipeline(
    model: &dyn Classifier,
    stream: &FrameStream,
    config: &PipelineConfig,
) -> Result<StreamRun> {
    pipeline::run(model, stream, config)
}

/// Search the parameter grid for the configuration maximizing compute
/// savings within the accuracy-degradation budget. A `None` best
/// candidate means the constraint is unsatisfiable on this grid, which
/// is a valid outcome.
pub fn search_params_under_constraint(
    model: &dyn Classifier,
    streams: &[FrameStream],
    grid: &ParameterGrid,
    max_degradation: f32,
) -> Result<SearchOutcome> {
    search::search(model, streams, grid, max_degradation)
}
