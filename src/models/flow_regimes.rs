//! Closed-form flow-regime curves.
//!
//! Each function returns the pressure change Δp(t) together with its
//! logarithmic derivative `t · dΔp/dt`, the pair a well-test diagnostic plot
//! shows on log-log axes.

use ndarray::Array1;

use crate::model::ModelCurves;

/// Infinite-acting radial flow: `Δp = m (ln t + b)`, derivative `m`.
pub fn radial_flow(time: &Array1<f64>, m: f64, b: f64) -> ModelCurves {
    ModelCurves::new(
        time.mapv(|t| m * (t.ln() + b)),
        time.mapv(|_| m),
    )
}

/// Pure wellbore storage: `Δp = t / c`, unit-slope derivative `t / c`.
pub fn wellbore_storage(time: &Array1<f64>, c: f64) -> ModelCurves {
    let pressure = time.mapv(|t| t / c);
    ModelCurves::new(pressure.clone(), pressure)
}

/// Linear (fracture) flow: `Δp = a √t`, half-slope derivative `a √t / 2`.
pub fn linear_flow(time: &Array1<f64>, a: f64) -> ModelCurves {
    ModelCurves::new(
        time.mapv(|t| a * t.sqrt()),
        time.mapv(|t| 0.5 * a * t.sqrt()),
    )
}

/// Storage-dominated transition into radial flow.
///
/// `Δp = m [ln(1 + t/τ) + skin (1 - e^{-t/τ})]`
///
/// `t dΔp/dt = m [t / (t + τ) + skin (t/τ) e^{-t/τ}]`
pub fn storage_radial(time: &Array1<f64>, m: f64, tau: f64, skin: f64) -> ModelCurves {
    ModelCurves::new(
        time.mapv(|t| {
            let x = t / tau;
            m * ((1.0 + x).ln() + skin * (1.0 - (-x).exp()))
        }),
        time.mapv(|t| {
            let x = t / tau;
            m * (t / (t + tau) + skin * x * (-x).exp())
        }),
    )
}

/// Radial flow followed by a closed-boundary (pseudo-steady state) trend:
/// `Δp = m ln t + b + c t`, derivative `m + c t`.
pub fn pseudo_steady_state(time: &Array1<f64>, m: f64, b: f64, c: f64) -> ModelCurves {
    ModelCurves::new(
        time.mapv(|t| m * t.ln() + b + c * t),
        time.mapv(|t| m + c * t),
    )
}
