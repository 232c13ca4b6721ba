//! Shared classifier seam used by the decision pipeline and search

use crate::data::FrameLabel;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single classifier decision: predicted label plus the raw decision
/// score that produced it
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decision {
    pub label: FrameLabel,
    pub score: f32,
}

/// A fitted two-class frame classifier.
///
/// Implementations take the *raw* (unnormalized) feature vector and
/// normalize internally with the stats they were fit with, so callers can
/// never score in a different space than training. Scoring is pure: the
/// same input always yields the same score.
///
/// Tie-break policy: a decision score of exactly zero classifies as
/// music (-1).
pub trait Classifier {
    /// Expected raw feature dimensionality
    fn dim(&self) -> usize;

    /// Raw decision score for one frame; positive means speech,
    /// negative means music
    fn raw_score(&self, frame: &[f32]) -> Result<f32>;

    /// Whether iterative fitting met its tolerance before the iteration
    /// cap (false = ConvergenceWarning; the model is still usable)
    fn converged(&self) -> bool {
        true
    }

    /// Classify one frame
    fn classify(&self, frame: &[f32]) -> Result<Decision> {
        let score = self.raw_score(frame)?;
        Ok(Decision {
            label: FrameLabel::from_score(score),
            score,
        })
    }
}
