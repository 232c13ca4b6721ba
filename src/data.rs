//! Domain types: labels, labeled feature tables, and frame streams

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};

/// Ground-truth class of a 20ms audio frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLabel {
    /// Speech frame (+1)
    Speech,
    /// Music frame (-1)
    Music,
    /// Silence/noise frame (0); excluded from two-class training but
    /// usable in stream evaluation
    Other,
}

impl FrameLabel {
    /// Signed representation used by the two-class trainers
    pub fn sign(&self) -> f32 {
        match self {
            FrameLabel::Speech => 1.0,
            FrameLabel::Music => -1.0,
            FrameLabel::Other => 0.0,
        }
    }

    /// Label for a raw decision score. Zero maps to music; see
    /// [`crate::classifier::Classifier`] for the tie-break policy.
    pub fn from_score(score: f32) -> Self {
        if score > 0.0 {
            FrameLabel::Speech
        } else {
            FrameLabel::Music
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            FrameLabel::Speech => "speech",
            FrameLabel::Music => "music",
            FrameLabel::Other => "other",
        }
    }
}

/// One labeled training/calibration example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: Vec<f32>,
    pub label: FrameLabel,
}

/// Caller-owned labeled feature table consumed by the trainers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    pub examples: Vec<LabeledExample>,
}

impl FeatureTable {
    pub fn new(examples: Vec<LabeledExample>) -> Self {
        Self { examples }
    }

    /// Shared feature dimensionality, validated across all examples.
    /// Fails on an empty table or inconsistent vector lengths.
    pub fn dim(&self) -> Result<usize> {
        let first = self
            .examples
            .first()
            .ok_or(GateError::EmptyTrainingSet)?
            .features
            .len();
        for ex in &self.examples {
            if ex.features.len() != first {
                return Err(GateError::DimensionalityMismatch {
                    expected: first,
                    found: ex.features.len(),
                });
            }
        }
        Ok(first)
    }

    /// Examples belonging to the two trainable classes (speech/music),
    /// silence/noise excluded
    pub fn two_class(&self) -> Vec<&LabeledExample> {
        self.examples
            .iter()
            .filter(|ex| ex.label != FrameLabel::Other)
            .collect()
    }

    /// Examples of one class
    pub fn of_class(&self, label: FrameLabel) -> Vec<&LabeledExample> {
        self.examples
            .iter()
            .filter(|ex| ex.label == label)
            .collect()
    }
}

/// A named, ordered sequence of per-frame feature vectors with optional
/// ground truth for metric computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameStream {
    pub name: String,
    pub frames: Vec<Vec<f32>>,
    #[serde(default)]
    pub labels: Option<Vec<FrameLabel>>,
}

impl FrameStream {
    pub fn new(name: impl Into<String>, frames: Vec<Vec<f32>>) -> Self {
        Self {
            name: name.into(),
            frames,
            labels: None,
        }
    }

    pub fn with_labels(
        name: impl Into<String>,
        frames: Vec<Vec<f32>>,
        labels: Vec<FrameLabel>,
    ) -> Self {
        Self {
            name: name.into(),
            frames,
            labels: Some(labels),
        }
    }

    /// Validate the stream against an expected feature dimensionality.
    /// Any malformed frame fails the whole stream.
    pub fn validate(&self, expected_dim: usize) -> Result<()> {
        if self.frames.is_empty() {
            return Err(GateError::EmptyStream(self.name.clone()));
        }
        for frame in &self.frames {
            if frame.len() != expected_dim {
                return Err(GateError::DimensionalityMismatch {
                    expected: expected_dim,
                    found: frame.len(),
                });
            }
        }
        if let Some(labels) = &self.labels {
            if labels.len() != self.frames.len() {
                return Err(GateError::ProcessingError(format!(
                    "Stream '{}' has {} frames but {} labels",
                    self.name,
                    self.frames.len(),
                    labels.len()
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
