//! Configuration and result persistence round trips.

use std::path::PathBuf;

use wtfit_rs::lm::NoMonitor;
use wtfit_rs::{
    FitConfiguration, FitParameter, FitParameters, FitResult, FlowRegimeModels,
    LevenbergMarquardt, LmConfig, TerminalState,
};

use super::common::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wtfit-{}-{}", std::process::id(), name))
}

#[test]
fn test_configuration_file_round_trip() {
    let parameters = FitParameters::from_vec(vec![
        FitParameter::with_bounds("m", 12.0, 0.0, 1e4).unwrap().with_unit("psi/cycle"),
        FitParameter::new("b", 3.0).fixed(),
    ])
    .unwrap();
    let configuration = FitConfiguration::new("radial_flow", parameters, 0.35);

    let path = temp_path("config.json");
    configuration.save(&path).unwrap();
    let loaded = FitConfiguration::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, configuration);
    assert_eq!(loaded.weight_percent(), 35);
    assert_eq!(loaded.parameters.get("m").unwrap().unit(), Some("psi/cycle"));
}

#[test]
fn test_persisted_shape() {
    let json = r#"{
        "model_id": "radial_flow",
        "parameters": [
            {"name": "m", "value": 10.0, "lower_bound": 0.0, "upper_bound": null, "fixed": false},
            {"name": "b", "value": 2.0}
        ],
        "weight": 0.5
    }"#;
    let configuration = FitConfiguration::from_json_str(json).unwrap();
    let names: Vec<&str> = configuration.parameters.iter().map(|p| p.name()).collect();
    assert_eq!(names, ["m", "b"]);
    assert_eq!(configuration.parameters.get("m").unwrap().upper_bound(), f64::INFINITY);
    assert_eq!(configuration.parameters.get("b").unwrap().lower_bound(), f64::NEG_INFINITY);
    assert!(!configuration.parameters.get("b").unwrap().is_fixed());
}

#[test]
fn test_result_feeds_back_as_configuration() {
    let observed = storage_radial_observed(50);
    let mut configuration = storage_radial_configuration(0.5);
    configuration.parameters.get_mut("tau").unwrap().set_fixed(true);
    configuration.parameters.get_mut("tau").unwrap().set_value(TRUE_TAU).unwrap();

    let lm = LevenbergMarquardt::new();
    let first = lm
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();
    assert!(first.converged);

    // Persist and reload the result, then restart from it.
    let reloaded = FitResult::from_json_str(&first.to_json_string().unwrap()).unwrap();
    assert_eq!(reloaded, first);
    let refit_configuration = reloaded.to_configuration(&configuration);
    assert!(refit_configuration.parameters.get("tau").unwrap().is_fixed());
    assert_eq!(refit_configuration.parameters.to_map(), first.parameters);

    let second = lm
        .fit(&FlowRegimeModels, &refit_configuration, &observed, &mut NoMonitor)
        .unwrap();
    assert_eq!(second.state, TerminalState::Converged);
    assert!(second.final_error <= first.final_error);
    assert!(second.iterations <= 3);
}

#[test]
fn test_failed_result_file_round_trip() {
    let mut configuration = storage_radial_configuration(0.5);
    configuration.model_id = "type_curve_42".into();

    let failed = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &storage_radial_observed(30), &mut NoMonitor)
        .unwrap();
    assert_eq!(failed.state, TerminalState::Failed);

    let json = failed.to_json_string().unwrap();
    assert!(json.contains("\"final_error\": null"));

    let path = temp_path("failed-result.json");
    std::fs::write(&path, &json).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let reloaded = FitResult::from_json_str(&text).unwrap();
    assert_eq!(reloaded.state, TerminalState::Failed);
    assert!(!reloaded.converged);
    assert!(reloaded.final_error.is_nan());
    assert_eq!(reloaded.parameters, failed.parameters);
    assert_eq!(reloaded.evaluations, failed.evaluations);
    assert_eq!(reloaded.message, failed.message);
    assert!(reloaded.curves.pressure.is_empty());

    // The fitted values still seed a new configuration.
    let retry = reloaded.to_configuration(&configuration);
    assert_eq!(retry.parameters.to_map(), failed.parameters);
}

#[test]
fn test_lm_config_json_with_defaults() {
    let config: LmConfig = serde_json::from_str(r#"{"max_iterations": 7, "ftol": 1e-9}"#).unwrap();
    assert_eq!(config.max_iterations, 7);
    assert_eq!(config.ftol, 1e-9);
    assert_eq!(config.max_lambda, LmConfig::default().max_lambda);
}
