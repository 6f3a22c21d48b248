use super::*;
use serde_json::json;

#[test]
fn generation_config_defaults_match_documented_thresholds() {
    let config = GenerationConfig::default();
    assert_eq!(config.min_trials, 1000);
    assert_eq!(config.min_success_rate, 0.01);
    assert_eq!(config.present_weight, 2);
    assert_eq!(config.absent_weight, 1);
    assert_eq!(config.max_extra_len, 10);
    assert_eq!(config.any_depth, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn generation_config_fills_missing_fields_from_defaults() {
    let config: GenerationConfig =
        serde_json::from_value(json!({"min_trials": 50})).expect("config");
    assert_eq!(config.min_trials, 50);
    assert_eq!(config.min_success_rate, 0.01);
    assert_eq!(config.present_weight, 2);
}

#[test]
fn generation_config_rejects_unknown_fields() {
    let error = serde_json::from_value::<GenerationConfig>(json!({"trials": 5})).unwrap_err();
    assert!(error.to_string().contains("unknown field"));
}

#[test]
fn generation_config_validate_rejects_out_of_range_values() {
    let config = GenerationConfig {
        min_trials: 0,
        ..GenerationConfig::default()
    };
    assert_eq!(
        config.validate().unwrap_err(),
        "min-trials must be at least 1"
    );

    let config = GenerationConfig {
        min_success_rate: 1.5,
        ..GenerationConfig::default()
    };
    assert!(config.validate().unwrap_err().contains("min-success-rate"));

    let config = GenerationConfig {
        present_weight: 0,
        ..GenerationConfig::default()
    };
    assert!(config.validate().unwrap_err().contains("present-weight"));
}

#[test]
fn generation_config_round_trips_through_json() {
    let config = GenerationConfig {
        min_trials: 10,
        any_depth: 1,
        ..GenerationConfig::default()
    };
    let encoded = serde_json::to_value(&config).expect("encode");
    assert_eq!(encoded["min_trials"], json!(10));
    let decoded: GenerationConfig = serde_json::from_value(encoded).expect("decode");
    assert_eq!(decoded, config);
}

#[test]
fn free_functions_use_a_compiler_without_overrides() {
    let schema = schema::boolean();
    assert!(input_of(&schema).is_ok());
    assert!(output_of(&schema).is_ok());
    let error = input_of(&schema::never()).unwrap_err();
    assert!(matches!(error, ArbitraryError::UnsupportedSchema { .. }));
}
