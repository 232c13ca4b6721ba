//! Validation tests for the feature-weighted kernel classifier

use framegate::{
    weighted, Classifier, FeatureTable, FrameLabel, KernelConfig, LabeledExample, WeightConfig,
    WeightPolicy,
};

/// 2-D table where dim 0 separates the classes and dim 1 is noise with
/// identical distribution in both classes
fn informative_dim_table(per_class: usize) -> FeatureTable {
    let mut examples = Vec::new();
    for i in 0..per_class {
        let noise = ((i * 31) % 11) as f32 * 0.2 - 1.0;
        examples.push(LabeledExample {
            features: vec![1.0, noise],
            label: FrameLabel::Speech,
        });
        examples.push(LabeledExample {
            features: vec![-1.0, noise],
            label: FrameLabel::Music,
        });
    }
    FeatureTable::new(examples)
}

#[test]
fn test_variance_ratio_favors_informative_dimension() {
    let table = informative_dim_table(20);
    let weights = weighted::variance_ratio_weights(&table).unwrap();
    assert_eq!(weights.len(), 2);
    assert!(
        weights[0] > weights[1],
        "informative dim should outweigh noise dim ({:?})",
        weights
    );
    // Rescaled to mean 1
    let mean = (weights[0] + weights[1]) / 2.0;
    assert!((mean - 1.0).abs() < 1e-4);
}

#[test]
fn test_weighted_model_carries_weights_and_classifies() {
    let table = informative_dim_table(10);
    let model = framegate::train_weighted_classifier(
        &table,
        &WeightConfig::default(),
        &KernelConfig::default(),
    )
    .unwrap();

    assert!(model.feature_weights.is_some());
    assert_eq!(model.classify(&[1.0, 0.0]).unwrap().label, FrameLabel::Speech);
    assert_eq!(model.classify(&[-1.0, 0.0]).unwrap().label, FrameLabel::Music);
}

#[test]
fn test_fixed_weights_applied_verbatim() {
    let table = informative_dim_table(10);
    let config = WeightConfig {
        policy: WeightPolicy::Fixed(vec![2.0, 0.0]),
    };
    let model =
        framegate::train_weighted_classifier(&table, &config, &KernelConfig::default()).unwrap();
    assert_eq!(model.feature_weights, Some(vec![2.0, 0.0]));

    // Zero weight on the noise dim makes it inert: scores ignore it
    let a = model.raw_score(&[1.0, -5.0]).unwrap();
    let b = model.raw_score(&[1.0, 5.0]).unwrap();
    assert!((a - b).abs() < 1e-6);
}

#[test]
fn test_fixed_weights_wrong_length_fail() {
    let table = informative_dim_table(5);
    let config = WeightConfig {
        policy: WeightPolicy::Fixed(vec![1.0]),
    };
    assert!(framegate::train_weighted_classifier(&table, &config, &KernelConfig::default()).is_err());
}

#[test]
fn test_single_class_fails() {
    let examples = (0..6)
        .map(|i| LabeledExample {
            features: vec![i as f32, 0.0],
            label: FrameLabel::Speech,
        })
        .collect();
    let table = FeatureTable::new(examples);
    assert!(weighted::variance_ratio_weights(&table).is_err());
}
