//! Finite-difference Jacobian against closed-form sensitivities.

use approx::assert_relative_eq;
use ndarray::Array1;
use wtfit_rs::lm::{JacobianBuilder, ResidualEvaluator};
use wtfit_rs::models::storage_radial;
use wtfit_rs::{FitParameters, FlowRegimeModels, ObservedData, WellModel};

use super::common::*;

fn perturbed_observed(time: &Array1<f64>) -> ObservedData {
    // Observed curves away from the model so residuals are not zero.
    let curves = storage_radial(time, 10.0, 0.2, 1.0);
    ObservedData::new(
        time.to_vec(),
        curves.pressure.to_vec(),
        curves.derivative.to_vec(),
    )
    .unwrap()
}

fn radial_parameters(m: f64, b: f64) -> FitParameters {
    let mut params = WellModel::RadialFlow.default_parameters();
    params.get_mut("m").unwrap().set_value(m).unwrap();
    params.get_mut("b").unwrap().set_value(b).unwrap();
    params
}

#[test]
fn test_radial_flow_columns() {
    let time = log_times(25);
    let observed = perturbed_observed(&time);
    let weight = 0.3;
    let model_id = WellModel::RadialFlow.id();
    let residuals = ResidualEvaluator::new(&FlowRegimeModels, &model_id, &observed, weight);

    let (m, b) = (12.0, 2.5);
    let params = radial_parameters(m, b);
    let baseline = residuals.evaluate(&params.to_map()).unwrap();
    let jacobian = JacobianBuilder::default()
        .build(&residuals, &params, &params.free_indices(), &baseline.vector)
        .unwrap();

    let n = time.len();
    assert_eq!(jacobian.dim(), (2 * n, 2));
    for (i, &t) in time.iter().enumerate() {
        // Pressure rows: (1 - w) * d/dθ [m (ln t + b)]
        assert_relative_eq!(jacobian[[i, 0]], (1.0 - weight) * (t.ln() + b), epsilon = 1e-5);
        assert_relative_eq!(jacobian[[i, 1]], (1.0 - weight) * m, epsilon = 1e-5);
        // Derivative rows: w * d/dθ [m]
        assert_relative_eq!(jacobian[[n + i, 0]], weight, epsilon = 1e-5);
        assert_relative_eq!(jacobian[[n + i, 1]], 0.0, epsilon = 1e-5);
    }
}

#[test]
fn test_storage_radial_nonlinear_columns() {
    let time = log_times(25);
    let observed = perturbed_observed(&time);
    let weight = 0.5;
    let model_id = WellModel::StorageRadial.id();
    let residuals = ResidualEvaluator::new(&FlowRegimeModels, &model_id, &observed, weight);

    let (m, tau, skin) = (TRUE_M, TRUE_TAU, TRUE_SKIN);
    let mut params = WellModel::StorageRadial.default_parameters();
    params.get_mut("m").unwrap().set_value(m).unwrap();
    params.get_mut("tau").unwrap().set_value(tau).unwrap();
    params.get_mut("skin").unwrap().set_value(skin).unwrap();

    // m and skin only; tau stays where it is.
    let free = [0, 2];
    let baseline = residuals.evaluate(&params.to_map()).unwrap();
    let jacobian = JacobianBuilder::default()
        .build(&residuals, &params, &free, &baseline.vector)
        .unwrap();

    let n = time.len();
    let h_m = m * 1e-6;
    let h_skin = skin * 1e-6;
    for (i, &t) in time.iter().enumerate() {
        let x = t / tau;
        let d_pressure_dm = (1.0 + x).ln() + skin * (1.0 - (-x).exp());
        let d_pressure_dskin = m * (1.0 - (-x).exp());
        let d_derivative_dm = t / (t + tau) + skin * x * (-x).exp();
        let d_derivative_dskin = m * x * (-x).exp();

        // Both channels are linear in m and skin; allow O(h) slack anyway.
        let tol = |scale: f64, h: f64| 1e-6 * scale.abs().max(1.0) + h;
        assert!((jacobian[[i, 0]] - (1.0 - weight) * d_pressure_dm).abs() < tol(d_pressure_dm, h_m));
        assert!((jacobian[[i, 1]] - (1.0 - weight) * d_pressure_dskin).abs() < tol(d_pressure_dskin, h_skin));
        assert!((jacobian[[n + i, 0]] - weight * d_derivative_dm).abs() < tol(d_derivative_dm, h_m));
        assert!((jacobian[[n + i, 1]] - weight * d_derivative_dskin).abs() < tol(d_derivative_dskin, h_skin));
    }
}

#[test]
fn test_upper_bound_uses_backward_difference() {
    let time = log_times(10);
    let observed = perturbed_observed(&time);
    let model_id = WellModel::RadialFlow.id();
    let residuals = ResidualEvaluator::new(&FlowRegimeModels, &model_id, &observed, 0.5);

    let mut params: FitParameters = radial_parameters(12.0, 2.5);
    let m = params.get_mut("m").unwrap();
    m.set_bounds(0.0, 12.0).unwrap();
    let builder = JacobianBuilder::default();
    assert!(builder.step_for(params.get("m").unwrap()) < 0.0);

    let baseline = residuals.evaluate(&params.to_map()).unwrap();
    let jacobian = builder
        .build(&residuals, &params, &[0], &baseline.vector)
        .unwrap();
    // Still the same linear sensitivity, evaluated from below the bound.
    assert_relative_eq!(jacobian[[10, 0]], 0.5, epsilon = 1e-5);
    assert_eq!(residuals.evaluations(), 2);
}
