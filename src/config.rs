//! Configuration system for classifier training, gating, and search

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub kernel: KernelConfig,
    pub mixture: MixtureConfig,
    pub weighting: WeightConfig,
    pub pipeline: PipelineConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            kernel: KernelConfig::default(),
            mixture: MixtureConfig::default(),
            weighting: WeightConfig::default(),
            pipeline: PipelineConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Validate all sub-configurations
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        self.mixture.validate()?;
        self.pipeline.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

/// RBF-kernel soft-margin classifier training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// RBF bandwidth gamma in K(x,z) = exp(-gamma * ||x-z||^2)
    pub gamma: f32,
    /// L2 regularization strength on the dual weights
    pub lambda: f32,
    pub learning_rate: f32,
    pub epochs: usize,
    /// Mini-batch size; full-batch gradient steps when absent
    pub batch_size: Option<usize>,
    /// Drop supports with |weight| below this after training; keep all
    /// training examples as supports when absent
    pub prune_epsilon: Option<f32>,
    /// Loss-improvement tolerance used only to set the convergence flag
    pub tolerance: f32,
    /// Seed for mini-batch shuffling
    pub seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            gamma: 0.5,
            lambda: 1e-3,
            learning_rate: 0.1,
            epochs: 200,
            batch_size: None,
            prune_epsilon: None,
            tolerance: 1e-5,
            seed: 42,
        }
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.gamma <= 0.0 {
            return Err(GateError::InvalidConfigParameter(format!(
                "kernel.gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.lambda < 0.0 {
            return Err(GateError::InvalidConfigParameter(format!(
                "kernel.lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if self.learning_rate <= 0.0 {
            return Err(GateError::InvalidConfigParameter(format!(
                "kernel.learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(GateError::InvalidConfigParameter(
                "kernel.epochs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == Some(0) {
            return Err(GateError::InvalidConfigParameter(
                "kernel.batch_size must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Diagonal-covariance Gaussian mixture training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixtureConfig {
    /// Components per class mixture
    pub components: usize,
    /// EM round cap
    pub max_rounds: usize,
    /// Log-likelihood improvement tolerance for early convergence
    pub tolerance: f32,
    /// Variance floor applied every M-step
    pub variance_floor: f32,
    /// Class prior probability of speech; music gets the complement
    pub speech_prior: f32,
    /// Seed for component mean initialization
    pub seed: u64,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            components: 4,
            max_rounds: 100,
            tolerance: 1e-4,
            variance_floor: 1e-4,
            speech_prior: 0.5,
            seed: 42,
        }
    }
}

impl MixtureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.components == 0 {
            return Err(GateError::InvalidConfigParameter(
                "mixture.components must be at least 1".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(GateError::InvalidConfigParameter(
                "mixture.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.variance_floor <= 0.0 {
            return Err(GateError::InvalidConfigParameter(format!(
                "mixture.variance_floor must be positive, got {}",
                self.variance_floor
            )));
        }
        if self.speech_prior <= 0.0 || self.speech_prior >= 1.0 {
            return Err(GateError::InvalidConfigParameter(format!(
                "mixture.speech_prior must lie strictly between 0 and 1, got {}",
                self.speech_prior
            )));
        }
        Ok(())
    }
}

/// Per-dimension feature-weight policy for the weighted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Use the given weight vector as-is
    Fixed(Vec<f32>),
    /// Fit weights from the between-class/within-class variance ratio
    VarianceRatio,
}

/// Feature-weighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub policy: WeightPolicy,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            policy: WeightPolicy::VarianceRatio,
        }
    }
}

/// One deterministic filter rule over a raw (unnormalized) feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Index into the raw feature vector
    pub feature: usize,
    pub threshold: f32,
    /// Fire when value <= threshold; otherwise when value >= threshold
    pub fire_below: bool,
}

impl FilterRule {
    pub fn fires(&self, frame: &[f32]) -> bool {
        match frame.get(self.feature) {
            Some(&v) => {
                if self.fire_below {
                    v <= self.threshold
                } else {
                    v >= self.threshold
                }
            }
            None => false,
        }
    }
}

/// Order in which filtering and skipping are applied in combined mode.
/// The order changes which frames short-circuit, so it is a first-class
/// configuration axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismOrder {
    FilterThenSkip,
    SkipThenFilter,
}

/// Decision pipeline configuration; one candidate parameter set.
/// All mechanisms disabled reproduces the classifier-only baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Filter rules (conjunction); a firing filter assigns music without
    /// invoking the classifier. Empty list disables filtering.
    pub filter_rules: Vec<FilterRule>,
    /// Skip-by-label window length; disabled when absent
    pub skip_window: Option<usize>,
    /// Skip-by-score confidence threshold on |raw score|; disabled when
    /// absent
    pub skip_confidence: Option<f32>,
    pub order: MechanismOrder,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_rules: Vec::new(),
            skip_window: Some(3),
            skip_confidence: Some(2.0),
            order: MechanismOrder::FilterThenSkip,
        }
    }
}

impl PipelineConfig {
    /// Classifier-fallback-only configuration (no shortcuts)
    pub fn baseline() -> Self {
        Self {
            filter_rules: Vec::new(),
            skip_window: None,
            skip_confidence: None,
            order: MechanismOrder::FilterThenSkip,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.skip_window == Some(0) {
            return Err(GateError::InvalidConfigParameter(
                "pipeline.skip_window must be at least 1 when set".to_string(),
            ));
        }
        if let Some(c) = self.skip_confidence {
            if !c.is_finite() || c <= 0.0 {
                return Err(GateError::InvalidConfigParameter(format!(
                    "pipeline.skip_confidence must be positive and finite, got {}",
                    c
                )));
            }
        }
        Ok(())
    }

    /// Dimensionality-aware validation: every filter rule must index
    /// within the frame's feature space. An out-of-range rule is a hard
    /// error, never a silent no-op. `found` reports the minimum
    /// dimensionality the offending rule would require.
    pub fn validate_for_dim(&self, dim: usize) -> Result<()> {
        self.validate()?;
        for rule in &self.filter_rules {
            if rule.feature >= dim {
                return Err(GateError::DimensionalityMismatch {
                    expected: dim,
                    found: rule.feature + 1,
                });
            }
        }
        Ok(())
    }
}

/// Parameter grid explored by the constrained search. Each axis lists the
/// settings to try; `None`/empty entries disable that mechanism for the
/// candidate. Candidates are enumerated lexicographically over
/// (order, filter, window, confidence) axis indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub orders: Vec<MechanismOrder>,
    pub filter_rules: Vec<Vec<FilterRule>>,
    pub skip_windows: Vec<Option<usize>>,
    pub skip_confidences: Vec<Option<f32>>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            orders: vec![MechanismOrder::FilterThenSkip, MechanismOrder::SkipThenFilter],
            filter_rules: vec![Vec::new()],
            skip_windows: vec![None, Some(2), Some(3), Some(5)],
            skip_confidences: vec![None, Some(1.0), Some(2.0), Some(4.0)],
        }
    }
}

impl ParameterGrid {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
            || self.filter_rules.is_empty()
            || self.skip_windows.is_empty()
            || self.skip_confidences.is_empty()
    }

    /// Materialize candidate pipeline configurations in deterministic
    /// lexicographic order
    pub fn candidates(&self) -> Vec<PipelineConfig> {
        let mut out = Vec::new();
        for &order in &self.orders {
            for rules in &self.filter_rules {
                for &window in &self.skip_windows {
                    for &confidence in &self.skip_confidences {
                        out.push(PipelineConfig {
                            filter_rules: rules.clone(),
                            skip_window: window,
                            skip_confidence: confidence,
                            order,
                        });
                    }
                }
            }
        }
        out
    }
}

/// Constrained search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParameterGrid,
    /// Maximum relative accuracy degradation versus the no-shortcut
    /// baseline
    pub max_degradation: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: ParameterGrid::default(),
            max_degradation: 0.02,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.max_degradation) {
            return Err(GateError::InvalidConfigParameter(format!(
                "search.max_degradation must lie in [0, 1), got {}",
                self.max_degradation
            )));
        }
        if self.grid.is_empty() {
            return Err(GateError::InvalidConfigParameter(
                "search.grid axes must each list at least one setting".to_string(),
            ));
        }
        for window in &self.grid.skip_windows {
            if *window == Some(0) {
                return Err(GateError::InvalidConfigParameter(
                    "search.grid.skip_windows entries must be at least 1 when set".to_string(),
                ));
            }
        }
        for confidence in self.grid.skip_confidences.iter().flatten() {
            if !confidence.is_finite() || *confidence <= 0.0 {
                return Err(GateError::InvalidConfigParameter(format!(
                    "search.grid.skip_confidences entries must be positive and finite, got {}",
                    confidence
                )));
            }
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        GateError::ConfigValidationFailed(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| GateError::ConfigValidationFailed(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_config_round_trips() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.pipeline, config.pipeline);
    }

    #[test]
    fn test_invalid_gamma_rejected() {
        let mut config = Config::default();
        config.kernel.gamma = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_skip_window_rejected() {
        let mut config = Config::default();
        config.pipeline.skip_window = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_rule_index_must_fit_dimensionality() {
        let config = PipelineConfig {
            filter_rules: vec![FilterRule {
                feature: 3,
                threshold: 0.0,
                fire_below: true,
            }],
            ..PipelineConfig::default()
        };
        assert!(config.validate_for_dim(4).is_ok());
        assert!(config.validate_for_dim(3).is_err());
    }

    #[test]
    fn test_empty_grid_axis_rejected() {
        let mut config = Config::default();
        config.search.grid.skip_confidences = Vec::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grid_enumeration_order() {
        let grid = ParameterGrid {
            orders: vec![MechanismOrder::FilterThenSkip],
            filter_rules: vec![Vec::new()],
            skip_windows: vec![None, Some(2)],
            skip_confidences: vec![None, Some(1.0)],
        };
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 4);
        // Last axis varies fastest
        assert_eq!(candidates[0].skip_window, None);
        assert_eq!(candidates[0].skip_confidence, None);
        assert_eq!(candidates[1].skip_window, None);
        assert_eq!(candidates[1].skip_confidence, Some(1.0));
        assert_eq!(candidates[2].skip_window, Some(2));
    }
}
