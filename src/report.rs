//! Report generation for the CLI layer: JSON artifacts plus a plain-text
//! summary

use crate::error::Result;
use crate::pipeline::StreamMetrics;
use crate::search::SearchOutcome;
use std::fs;
use std::path::Path;

/// Write the full search outcome as JSON plus a human-readable summary
pub fn write_search_report(outcome: &SearchOutcome, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    let json = serde_json::to_string_pretty(outcome)?;
    fs::write(output_dir.join("search_report.json"), json)?;

    let mut report = String::new();
    report.push_str("FRAMEGATE - CONSTRAINED PARAMETER SEARCH\n");
    report.push_str("========================================\n\n");
    report.push_str(&format!(
        "Degradation budget: {:.1}%\n",
        outcome.max_degradation * 100.0
    ));
    report.push_str(&format!(
        "Baseline accuracy: overall {:.4}, speech {:.4}, music {:.4}\n",
        outcome.baseline.overall_accuracy(),
        outcome.baseline.speech_accuracy(),
        outcome.baseline.music_accuracy()
    ));
    report.push_str(&format!(
        "Candidates evaluated: {} ({} feasible)\n\n",
        outcome.candidates.len(),
        outcome.candidates.iter().filter(|c| c.feasible).count()
    ));

    match outcome.best_candidate() {
        Some(best) => {
            report.push_str("Selected candidate:\n");
            report.push_str(&format!("  Order: {:?}\n", best.pipeline.order));
            report.push_str(&format!(
                "  Filter rules: {}\n",
                if best.pipeline.filter_rules.is_empty() {
                    "disabled".to_string()
                } else {
                    format!("{} rule(s)", best.pipeline.filter_rules.len())
                }
            ));
            report.push_str(&format!(
                "  Skip window: {}\n",
                best.pipeline
                    .skip_window
                    .map_or("disabled".to_string(), |w| w.to_string())
            ));
            report.push_str(&format!(
                "  Skip confidence: {}\n",
                best.pipeline
                    .skip_confidence
                    .map_or("disabled".to_string(), |c| format!("{:.2}", c))
            ));
            report.push_str(&format!(
                "  Classifier invoked on {:.1}% of frames (savings {:.1}%)\n",
                best.invoked_fraction * 100.0,
                (1.0 - best.invoked_fraction) * 100.0
            ));
            report.push_str(&format!(
                "  Relative degradation: {:.2}%\n",
                best.degradation * 100.0
            ));
        }
        None => {
            report.push_str("No candidate satisfies the degradation constraint\n");
        }
    }

    fs::write(output_dir.join("search_summary.txt"), report)?;
    Ok(())
}

/// Write per-stream evaluation metrics as JSON
pub fn write_evaluation_report(
    results: &[(String, StreamMetrics)],
    output_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    let mut streams = serde_json::Map::new();
    for (name, metrics) in results {
        let mut entry = serde_json::Map::new();
        entry.insert("total_frames".to_string(), metrics.total_frames.into());
        entry.insert("invoked_frames".to_string(), metrics.invoked_frames.into());
        entry.insert(
            "invoked_fraction".to_string(),
            f64::from(metrics.invoked_fraction()).into(),
        );
        entry.insert(
            "overall_accuracy".to_string(),
            f64::from(metrics.overall_accuracy()).into(),
        );
        entry.insert(
            "speech_accuracy".to_string(),
            f64::from(metrics.speech_accuracy()).into(),
        );
        entry.insert(
            "music_accuracy".to_string(),
            f64::from(metrics.music_accuracy()).into(),
        );
        streams.insert(name.clone(), entry.into());
    }

    let json = serde_json::to_string_pretty(&streams)?;
    fs::write(output_dir.join("evaluation.json"), json)?;
    Ok(())
}
