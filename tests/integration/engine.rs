//! Background execution: cancellation, exclusivity, synchronous validation.

use std::sync::Arc;

use wtfit_rs::{
    ChannelListener, FitConfiguration, FitEngine, FitError, FitEvent, ObservedData,
    TerminalState,
};

use super::common::*;

#[test]
fn test_cancel_before_first_iteration() {
    let (evaluator, gate) = GatedEvaluator::new();
    let (listener, events) = ChannelListener::new();
    let mut engine = FitEngine::new(Arc::new(evaluator));
    engine.add_listener(Arc::new(listener));

    let configuration = storage_radial_configuration(0.5);
    let handle = engine
        .start_fit(configuration.clone(), storage_radial_observed(30))
        .unwrap();
    handle.cancel();
    handle.cancel();
    gate.send(()).unwrap();

    let result = handle.wait().unwrap();
    assert_eq!(result.state, TerminalState::Cancelled);
    assert!(!result.converged);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.evaluations, 1);
    assert_eq!(result.parameters, configuration.parameters.to_map());

    // Exactly one completion event and no progress
    let events: Vec<FitEvent> = events.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], FitEvent::Completed(r) if r.state == TerminalState::Cancelled));
}

#[test]
fn test_cancel_after_completion_is_noop() {
    let engine = FitEngine::with_builtin_models();
    let mut handle = engine
        .start_fit(storage_radial_configuration(0.5), storage_radial_observed(30))
        .unwrap();

    while !handle.is_finished() {
        std::thread::yield_now();
    }
    handle.cancel();
    let state = handle.try_result().unwrap().map(|r| r.state);
    assert_eq!(state, Some(TerminalState::Converged));
    assert_eq!(handle.wait().unwrap().state, TerminalState::Converged);
}

#[test]
fn test_second_start_is_rejected_while_running() {
    let (evaluator, gate) = GatedEvaluator::new();
    let engine = FitEngine::new(Arc::new(evaluator));

    let first = engine
        .start_fit(storage_radial_configuration(0.5), storage_radial_observed(30))
        .unwrap();
    assert!(engine.is_running());

    let second = engine.start_fit(storage_radial_configuration(0.5), storage_radial_observed(30));
    assert!(matches!(second, Err(FitError::AlreadyRunning)));

    gate.send(()).unwrap();
    assert_eq!(first.wait().unwrap().state, TerminalState::Converged);
    assert!(!engine.is_running());

    // The engine accepts new work once the run is over.
    let third = engine
        .start_fit(storage_radial_configuration(0.5), storage_radial_observed(30))
        .unwrap();
    assert!(third.wait().unwrap().converged);
}

#[test]
fn test_underdetermined_fails_before_any_evaluation() {
    let evaluator = Arc::new(CountingEvaluator::default());
    let engine = FitEngine::new(evaluator.clone());
    let observed = ObservedData::new(vec![1.0, 2.0, 3.0], vec![1.0; 3], vec![1.0; 3]).unwrap();
    let configuration = FitConfiguration::new("custom", five_free_parameters(), 0.5);

    let err = engine.start_fit(configuration, observed).unwrap_err();
    assert!(matches!(err, FitError::InvalidConfiguration(_)));
    assert_eq!(evaluator.calls(), 0);
    assert!(!engine.is_running());
}

#[test]
fn test_invalid_inputs_are_reported_synchronously() {
    let engine = FitEngine::with_builtin_models();
    let observed = storage_radial_observed(30);

    let mut configuration = storage_radial_configuration(0.5);
    configuration.weight = 1.5;
    assert!(matches!(
        engine.start_fit(configuration, observed.clone()),
        Err(FitError::InvalidConfiguration(_))
    ));

    // Out-of-bound initial value, as it can arrive from a hand-edited file
    let json = storage_radial_configuration(0.5)
        .to_json_string()
        .unwrap()
        .replace("\"value\": 0.04", "\"value\": -1.0");
    let configuration = FitConfiguration::from_json_str(&json).unwrap();
    assert!(matches!(
        engine.start_fit(configuration, observed),
        Err(FitError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_unknown_model_fails_the_run() {
    let engine = FitEngine::with_builtin_models();
    let mut configuration = storage_radial_configuration(0.5);
    configuration.model_id = "type_curve_42".into();

    let result = engine
        .start_fit(configuration, storage_radial_observed(30))
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(result.state, TerminalState::Failed);
    assert!(result.message.contains("type_curve_42"));
    assert!(result.final_error.is_nan());
}
