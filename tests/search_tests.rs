//! Validation tests for the constrained parameter search

use framegate::{
    FeatureTable, FilterRule, FrameLabel, FrameStream, KernelConfig, KernelModel, LabeledExample,
    MechanismOrder, ParameterGrid,
};

/// Separable 1-D table: speech at +1.0, music at -1.0
fn separable_table(per_class: usize) -> FeatureTable {
    let mut examples = Vec::new();
    for _ in 0..per_class {
        examples.push(LabeledExample {
            features: vec![1.0],
            label: FrameLabel::Speech,
        });
        examples.push(LabeledExample {
            features: vec![-1.0],
            label: FrameLabel::Music,
        });
    }
    FeatureTable::new(examples)
}

fn trained_model() -> KernelModel {
    framegate::train_kernel_classifier(&separable_table(10), &KernelConfig::default()).unwrap()
}

fn speech_run_stream(n: usize) -> FrameStream {
    FrameStream::with_labels(
        "speech_run",
        vec![vec![1.0]; n],
        vec![FrameLabel::Speech; n],
    )
}

/// Grid with the no-shortcut baseline plus skip-by-label variants
fn skip_grid() -> ParameterGrid {
    ParameterGrid {
        orders: vec![MechanismOrder::FilterThenSkip],
        filter_rules: vec![Vec::new()],
        skip_windows: vec![None, Some(3), Some(5)],
        skip_confidences: vec![None],
    }
}

#[test]
fn test_baseline_candidate_normalizes_to_exactly_one() {
    let model = trained_model();
    let streams = vec![speech_run_stream(40)];
    let outcome =
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 0.02).unwrap();

    // First candidate is the all-disabled baseline configuration
    let baseline_candidate = &outcome.candidates[0];
    assert_eq!(baseline_candidate.pipeline.skip_window, None);
    assert_eq!(baseline_candidate.normalized.overall, 1.0);
    assert_eq!(baseline_candidate.normalized.speech, 1.0);
    assert_eq!(baseline_candidate.normalized.music, 1.0);
    assert_eq!(baseline_candidate.invoked_fraction, 1.0);
    assert!(baseline_candidate.feasible);
}

#[test]
fn test_selects_maximum_savings_within_budget() {
    let model = trained_model();
    let streams = vec![speech_run_stream(60)];
    let outcome =
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 0.02).unwrap();

    let best = outcome.best_candidate().expect("a candidate must survive");
    // On a pure speech run every skip window keeps full accuracy, so the
    // shortest warm-up (window 3) wins on savings
    assert_eq!(best.pipeline.skip_window, Some(3));
    assert!(best.invoked_fraction < 0.1);
    assert!(best.degradation <= 0.02);
}

#[test]
fn test_tightening_constraint_never_increases_savings() {
    let model = trained_model();
    // Mixed stream: skipping across the block boundary costs accuracy
    let mut frames = vec![vec![1.0]; 50];
    frames.extend(vec![vec![-1.0]; 50]);
    let mut labels = vec![FrameLabel::Speech; 50];
    labels.extend(vec![FrameLabel::Music; 50]);
    let streams = vec![
        FrameStream::with_labels("mixed", frames, labels),
        speech_run_stream(50),
    ];

    let loose =
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 0.02).unwrap();
    let tight =
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 0.01).unwrap();

    let loose_best = loose.best_candidate().expect("baseline always satisfies 2%");
    let tight_best = tight.best_candidate().expect("baseline always satisfies 1%");
    assert!(
        tight_best.invoked_fraction >= loose_best.invoked_fraction,
        "tightening the budget must not increase savings ({} vs {})",
        tight_best.invoked_fraction,
        loose_best.invoked_fraction
    );
}

#[test]
fn test_zero_budget_with_misfiring_filter_returns_none() {
    let model = trained_model();
    let streams = vec![speech_run_stream(20)];
    // Filter fires on every speech frame and labels it music
    let grid = ParameterGrid {
        orders: vec![MechanismOrder::FilterThenSkip],
        filter_rules: vec![vec![FilterRule {
            feature: 0,
            threshold: 0.5,
            fire_below: false,
        }]],
        skip_windows: vec![None],
        skip_confidences: vec![None],
    };
    let outcome = framegate::search_params_under_constraint(&model, &streams, &grid, 0.0).unwrap();

    assert!(outcome.best.is_none());
    assert_eq!(outcome.candidates.len(), 1);
    assert!(!outcome.candidates[0].feasible);
}

#[test]
fn test_tie_break_prefers_earliest_candidate() {
    let model = trained_model();
    let streams = vec![speech_run_stream(30)];
    // Two orders produce identical behavior with filtering disabled;
    // the earlier enumeration entry must win
    let grid = ParameterGrid {
        orders: vec![
            MechanismOrder::FilterThenSkip,
            MechanismOrder::SkipThenFilter,
        ],
        filter_rules: vec![Vec::new()],
        skip_windows: vec![Some(3)],
        skip_confidences: vec![None],
    };
    let outcome =
        framegate::search_params_under_constraint(&model, &streams, &grid, 0.02).unwrap();
    assert_eq!(outcome.best, Some(0));
}

#[test]
fn test_empty_grid_axis_rejected() {
    let model = trained_model();
    let streams = vec![speech_run_stream(10)];
    let grid = ParameterGrid {
        orders: vec![MechanismOrder::FilterThenSkip],
        filter_rules: vec![Vec::new()],
        skip_windows: Vec::new(),
        skip_confidences: vec![None],
    };
    assert!(framegate::search_params_under_constraint(&model, &streams, &grid, 0.02).is_err());
}

#[test]
fn test_out_of_range_filter_rule_rejected_for_every_candidate() {
    let model = trained_model();
    let streams = vec![speech_run_stream(10)];
    let grid = ParameterGrid {
        orders: vec![MechanismOrder::FilterThenSkip],
        filter_rules: vec![vec![FilterRule {
            feature: 9,
            threshold: 0.0,
            fire_below: true,
        }]],
        skip_windows: vec![None],
        skip_confidences: vec![None],
    };
    assert!(framegate::search_params_under_constraint(&model, &streams, &grid, 0.02).is_err());
}

#[test]
fn test_unlabeled_stream_rejected() {
    let model = trained_model();
    let streams = vec![FrameStream::new("unlabeled", vec![vec![1.0]; 10])];
    assert!(
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 0.02).is_err()
    );
}

#[test]
fn test_empty_stream_set_rejected() {
    let model = trained_model();
    assert!(framegate::search_params_under_constraint(&model, &[], &skip_grid(), 0.02).is_err());
}

#[test]
fn test_invalid_budget_rejected() {
    let model = trained_model();
    let streams = vec![speech_run_stream(10)];
    assert!(
        framegate::search_params_under_constraint(&model, &streams, &skip_grid(), 1.5).is_err()
    );
}
