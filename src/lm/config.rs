//! Configuration options for the Levenberg-Marquardt driver.
//!
//! All tuning constants live here: damping adaptation, stopping tolerances and
//! finite-difference step sizes.

use serde::{Deserialize, Serialize};

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted iterations. Default: 100
    pub max_iterations: usize,

    /// Relative SSE improvement below which an accepted step counts as stalled. Default: 1e-6
    pub ftol: f64,

    /// Consecutive stalled accepted steps required for convergence. Default: 3
    pub ftol_patience: usize,

    /// Step norm tolerance relative to the parameter norm. Default: 1e-8
    pub xtol: f64,

    /// Largest cosine between the residual vector and a Jacobian column at
    /// which the fit counts as stationary. Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-2
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-7
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e7
    pub max_lambda: f64,

    /// Consecutive rejected trial steps before the run is declared diverged. Default: 20
    pub max_rejections: usize,

    /// Relative finite-difference step. Default: 1e-6
    pub fd_epsilon: f64,

    /// Absolute floor for the finite-difference step. Default: 1e-8
    pub fd_min_step: f64,

    /// Evaluate Jacobian columns on the rayon pool. Default: false
    pub parallel_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            ftol: 1e-6,
            ftol_patience: 3,
            xtol: 1e-8,
            gtol: 1e-10,
            initial_lambda: 1e-2,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-7,
            max_lambda: 1e7,
            max_rejections: 20,
            fd_epsilon: 1e-6,
            fd_min_step: 1e-8,
            parallel_jacobian: false,
        }
    }
}

impl LmConfig {
    /// Lambda after a rejected step or singular solve, capped at `max_lambda`.
    pub fn increase_lambda(&self, lambda: f64) -> f64 {
        (lambda * self.lambda_up_factor).min(self.max_lambda)
    }

    /// Lambda after an accepted step, floored at `min_lambda`.
    pub fn decrease_lambda(&self, lambda: f64) -> f64 {
        (lambda * self.lambda_down_factor).max(self.min_lambda)
    }
}
