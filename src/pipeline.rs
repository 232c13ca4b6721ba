//! Streaming decision pipeline: filter / skip / classifier-fallback gating

use crate::classifier::Classifier;
use crate::config::{MechanismOrder, PipelineConfig};
use crate::data::{FrameLabel, FrameStream};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which mechanism produced a frame's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    Filter,
    SkipByLabel,
    SkipByScore,
    Classifier,
}

/// Per-frame decision output
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub label: FrameLabel,
    pub classifier_invoked: bool,
    pub rule: DecisionRule,
}

/// Bounded buffer of recent decisions for one stream run. Shortcut
/// decisions record their label only; the score field is written solely
/// by classifier invocations, so skip-by-score always refers to the most
/// recent real classifier score still inside the window.
struct DecisionHistory {
    entries: VecDeque<(FrameLabel, Option<f32>)>,
    capacity: usize,
}

impl DecisionHistory {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, label: FrameLabel, score: Option<f32>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((label, score));
    }

    /// The common label of the most recent `window` entries, if the
    /// window is full and all labels agree
    fn unanimous_label(&self, window: usize) -> Option<FrameLabel> {
        if window == 0 || self.entries.len() < window {
            return None;
        }
        let mut recent = self.entries.iter().rev().take(window);
        let (first, _) = recent.next()?;
        if recent.all(|(label, _)| label == first) {
            Some(*first)
        } else {
            None
        }
    }

    /// Most recent classifier score still in the buffer
    fn last_score(&self) -> Option<f32> {
        self.entries.iter().rev().find_map(|(_, score)| *score)
    }
}

/// Per-stream aggregate counts. Accuracy denominators exclude frames with
/// ground truth `Other`; the invocation fraction covers all frames.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StreamMetrics {
    pub total_frames: usize,
    pub invoked_frames: usize,
    pub speech_frames: usize,
    pub speech_correct: usize,
    pub music_frames: usize,
    pub music_correct: usize,
}

impl StreamMetrics {
    /// Fraction of frames where the expensive classifier ran; the
    /// compute-cost proxy
    pub fn invoked_fraction(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.invoked_frames as f32 / self.total_frames as f32
    }

    /// Accuracy over speech+music frames; vacuously 1.0 with no labeled
    /// frames
    pub fn overall_accuracy(&self) -> f32 {
        ratio(
            self.speech_correct + self.music_correct,
            self.speech_frames + self.music_frames,
        )
    }

    pub fn speech_accuracy(&self) -> f32 {
        ratio(self.speech_correct, self.speech_frames)
    }

    pub fn music_accuracy(&self) -> f32 {
        ratio(self.music_correct, self.music_frames)
    }

    /// Sum counts across streams
    pub fn merge(&mut self, other: &StreamMetrics) {
        self.total_frames += other.total_frames;
        self.invoked_frames += other.invoked_frames;
        self.speech_frames += other.speech_frames;
        self.speech_correct += other.speech_correct;
        self.music_frames += other.music_frames;
        self.music_correct += other.music_correct;
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        1.0
    } else {
        num as f32 / den as f32
    }
}

/// Output of one stream evaluation
#[derive(Debug, Clone, Serialize)]
pub struct StreamRun {
    pub records: Vec<DecisionRecord>,
    pub metrics: StreamMetrics,
}

/// Run the decision pipeline over one stream. History is created fresh
/// here and dropped at stream end; nothing leaks across streams or
/// candidates.
pub fn run(
    model: &dyn Classifier,
    stream: &FrameStream,
    config: &PipelineConfig,
) -> Result<StreamRun> {
    config.validate_for_dim(model.dim())?;
    stream.validate(model.dim())?;

    let capacity = config
        .skip_window
        .unwrap_or(0)
        .max(if config.skip_confidence.is_some() { 1 } else { 0 })
        .max(1);
    let mut history = DecisionHistory::new(capacity);
    let mut records = Vec::with_capacity(stream.len());

    for frame in &stream.frames {
        let shortcut = match config.order {
            MechanismOrder::FilterThenSkip => {
                try_filter(config, frame).or_else(|| try_skip(config, &history))
            }
            MechanismOrder::SkipThenFilter => {
                try_skip(config, &history).or_else(|| try_filter(config, frame))
            }
        };

        let record = match shortcut {
            Some((label, rule)) => {
                history.push(label, None);
                DecisionRecord {
                    label,
                    classifier_invoked: false,
                    rule,
                }
            }
            None => {
                let decision = model.classify(frame)?;
                history.push(decision.label, Some(decision.score));
                DecisionRecord {
                    label: decision.label,
                    classifier_invoked: true,
                    rule: DecisionRule::Classifier,
                }
            }
        };
        records.push(record);
    }

    let metrics = score_records(&records, stream);
    Ok(StreamRun { records, metrics })
}

/// Filter check over the raw feature vector: all configured rules must
/// hold, and a firing filter assigns music
fn try_filter(config: &PipelineConfig, frame: &[f32]) -> Option<(FrameLabel, DecisionRule)> {
    if config.filter_rules.is_empty() {
        return None;
    }
    if config.filter_rules.iter().all(|rule| rule.fires(frame)) {
        Some((FrameLabel::Music, DecisionRule::Filter))
    } else {
        None
    }
}

/// Skip checks: by label first, then by score
fn try_skip(
    config: &PipelineConfig,
    history: &DecisionHistory,
) -> Option<(FrameLabel, DecisionRule)> {
    if let Some(window) = config.skip_window {
        if let Some(label) = history.unanimous_label(window) {
            return Some((label, DecisionRule::SkipByLabel));
        }
    }
    if let Some(confidence) = config.skip_confidence {
        if let Some(score) = history.last_score() {
            if score.abs() > confidence {
                return Some((FrameLabel::from_score(score), DecisionRule::SkipByScore));
            }
        }
    }
    None
}

fn score_records(records: &[DecisionRecord], stream: &FrameStream) -> StreamMetrics {
    let mut metrics = StreamMetrics {
        total_frames: records.len(),
        invoked_frames: records.iter().filter(|r| r.classifier_invoked).count(),
        ..Default::default()
    };
    if let Some(labels) = &stream.labels {
        for (record, truth) in records.iter().zip(labels) {
            match truth {
                FrameLabel::Speech => {
                    metrics.speech_frames += 1;
                    if record.label == FrameLabel::Speech {
                        metrics.speech_correct += 1;
                    }
                }
                FrameLabel::Music => {
                    metrics.music_frames += 1;
                    if record.label == FrameLabel::Music {
                        metrics.music_correct += 1;
                    }
                }
                FrameLabel::Other => {}
            }
        }
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unanimous_label_requires_full_window() {
        let mut history = DecisionHistory::new(3);
        history.push(FrameLabel::Speech, Some(1.0));
        history.push(FrameLabel::Speech, Some(1.2));
        assert_eq!(history.unanimous_label(3), None);
        history.push(FrameLabel::Speech, None);
        assert_eq!(history.unanimous_label(3), Some(FrameLabel::Speech));
        history.push(FrameLabel::Music, None);
        assert_eq!(history.unanimous_label(3), None);
    }

    #[test]
    fn test_last_score_skips_label_only_entries() {
        let mut history = DecisionHistory::new(3);
        history.push(FrameLabel::Speech, Some(2.5));
        history.push(FrameLabel::Speech, None);
        assert_eq!(history.last_score(), Some(2.5));
        // Scored entry evicted once the buffer wraps
        history.push(FrameLabel::Speech, None);
        history.push(FrameLabel::Speech, None);
        assert_eq!(history.last_score(), None);
    }

    #[test]
    fn test_metrics_ratios_vacuous_without_labels() {
        let metrics = StreamMetrics {
            total_frames: 10,
            invoked_frames: 4,
            ..Default::default()
        };
        assert_eq!(metrics.overall_accuracy(), 1.0);
        assert!((metrics.invoked_fraction() - 0.4).abs() < 1e-6);
    }
}
