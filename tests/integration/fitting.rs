//! End-to-end fits of the built-in models on synthetic data.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use wtfit_rs::lm::{FitMonitor, NoMonitor};
use wtfit_rs::models::{pseudo_steady_state, radial_flow};
use wtfit_rs::{
    FitConfiguration, FitEngine, FlowRegimeModels, LevenbergMarquardt, ObservedData,
    ProgressEvent, TerminalState, WellModel,
};

use super::common::*;

struct Errors(Vec<f64>);

impl FitMonitor for Errors {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.0.push(event.error);
    }
}

#[test]
fn test_noise_free_recovery() {
    let observed = storage_radial_observed(60);
    let configuration = storage_radial_configuration(0.5);

    let result = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();

    assert_eq!(result.state, TerminalState::Converged, "{}", result.message);
    assert!(result.converged);
    assert!(relative_error(result.parameters.get("m").unwrap(), TRUE_M) < 1e-4);
    assert!(relative_error(result.parameters.get("tau").unwrap(), TRUE_TAU) < 1e-4);
    assert!(relative_error(result.parameters.get("skin").unwrap(), TRUE_SKIN) < 1e-4);
    assert_eq!(result.curves.pressure.len(), observed.len());
}

#[test]
fn test_recovery_at_every_weight() {
    let observed = storage_radial_observed(60);
    for percent in [0, 25, 100] {
        let weight = FitConfiguration::weight_from_percent(percent);
        let configuration = storage_radial_configuration(weight);
        let result = LevenbergMarquardt::new()
            .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
            .unwrap();

        assert!(result.converged, "weight {}: {}", weight, result.message);
        assert!(relative_error(result.parameters.get("m").unwrap(), TRUE_M) < 1e-4);
    }
}

#[test]
fn test_sse_is_monotone_over_accepted_iterations() {
    let observed = storage_radial_observed(40);
    let model = WellModel::StorageRadial;
    // Start far from the answer so there are many iterations.
    let configuration = FitConfiguration::new(model.id(), model.default_parameters(), 0.3);

    let mut errors = Errors(Vec::new());
    let result = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut errors)
        .unwrap();

    assert!(errors.0.len() > 1);
    assert_eq!(errors.0.len(), result.iterations);
    for pair in errors.0.windows(2) {
        assert!(pair[1] <= pair[0], "SSE increased: {} -> {}", pair[0], pair[1]);
    }
    assert_eq!(*errors.0.last().unwrap(), result.final_error);
}

#[test]
fn test_fixed_parameters_never_move() {
    let observed = storage_radial_observed(50);
    let mut configuration = storage_radial_configuration(0.5);
    let skin = configuration.parameters.get_mut("skin").unwrap();
    skin.set_value(TRUE_SKIN - 0.5).unwrap();
    skin.set_fixed(true);

    let result = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();

    for param in configuration.parameters.iter().filter(|p| p.is_fixed()) {
        assert_eq!(result.parameters.get(param.name()), Some(param.value()));
    }
    assert!(result.final_error > 0.0);
}

#[test]
fn test_bounds_are_respected() {
    let time = log_times(30);
    let truth = radial_flow(&time, 20.0, 1.0);
    let observed =
        ObservedData::new(time.to_vec(), truth.pressure.to_vec(), truth.derivative.to_vec())
            .unwrap();

    let mut parameters = WellModel::RadialFlow.default_parameters();
    parameters.get_mut("m").unwrap().set_bounds(1.0, 15.0).unwrap();
    let configuration = FitConfiguration::new(WellModel::RadialFlow.id(), parameters, 0.5);

    let result = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();
    let m = result.parameters.get("m").unwrap();
    assert!(m <= 15.0);
    assert!(m > 14.9, "m = {}", m);
}

#[test]
fn test_repeated_runs_are_identical() {
    let engine = FitEngine::with_builtin_models();
    let run = || {
        engine
            .start_fit(storage_radial_configuration(0.5), storage_radial_observed(60))
            .unwrap()
            .wait()
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.final_error.to_bits(), second.final_error.to_bits());
}

#[test]
fn test_parallel_jacobian_matches_serial() {
    let observed = storage_radial_observed(60);
    let configuration = storage_radial_configuration(0.5);

    let serial = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();
    let parallel = LevenbergMarquardt::new()
        .with_parallel_jacobian(true)
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();
    assert_eq!(serial, parallel);
}

#[test]
fn test_noisy_pseudo_steady_state() {
    let (m, b, c) = (8.0, 40.0, 0.2);
    let time = log_times(120);
    let truth = pseudo_steady_state(&time, m, b, c);

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.005).unwrap();
    let mut noisy = |v: f64| v * (1.0 + noise.sample(&mut rng));
    let delta_p: Vec<f64> = truth.pressure.iter().map(|&v| noisy(v)).collect();
    let derivative: Vec<f64> = truth.derivative.iter().map(|&v| noisy(v)).collect();
    let observed = ObservedData::new(time.to_vec(), delta_p, derivative).unwrap();

    let model = WellModel::PseudoSteadyState;
    let configuration = FitConfiguration::new(model.id(), model.default_parameters(), 0.5);
    let result = LevenbergMarquardt::new()
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();

    assert_ne!(result.state, TerminalState::Failed, "{}", result.message);
    assert!(result.final_error.is_finite());
    assert!(relative_error(result.parameters.get("m").unwrap(), m) < 0.05);
    assert!(relative_error(result.parameters.get("b").unwrap(), b) < 0.05);
    assert!(relative_error(result.parameters.get("c").unwrap(), c) < 0.05);
}

#[test]
fn test_iteration_cap() {
    let observed = storage_radial_observed(40);
    let model = WellModel::StorageRadial;
    let configuration = FitConfiguration::new(model.id(), model.default_parameters(), 0.5);

    let result = LevenbergMarquardt::new()
        .with_max_iterations(2)
        .fit(&FlowRegimeModels, &configuration, &observed, &mut NoMonitor)
        .unwrap();
    assert_eq!(result.state, TerminalState::MaxIterationsReached);
    assert_eq!(result.iterations, 2);
    assert!(!result.converged);
}
