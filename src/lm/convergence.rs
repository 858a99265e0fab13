//! Convergence criteria and terminal states of a fitting run.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::lm::config::LmConfig;

/// Terminal state reached by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    /// Stopping tolerances were met.
    Converged,

    /// The accepted-iteration cap was reached first.
    MaxIterationsReached,

    /// Too many consecutive rejected trial steps.
    Diverged,

    /// The caller asked the run to stop.
    Cancelled,

    /// A fatal error (model evaluation failure, unrecoverable singular system).
    Failed,
}

impl TerminalState {
    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, TerminalState::Converged)
    }

    pub fn description(&self) -> &'static str {
        match self {
            TerminalState::Converged => "Converged",
            TerminalState::MaxIterationsReached => "Terminated: maximum iterations reached",
            TerminalState::Diverged => "Terminated: too many rejected steps",
            TerminalState::Cancelled => "Cancelled by request",
            TerminalState::Failed => "Failed",
        }
    }
}

/// Stopping tolerances, checked by the driver after each step.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Relative SSE improvement threshold.
    pub ftol: f64,

    /// Consecutive accepted steps below `ftol` needed to stop.
    pub ftol_patience: usize,

    /// Step norm tolerance relative to the parameter norm.
    pub xtol: f64,

    /// Gradient (residual/column cosine) tolerance.
    pub gtol: f64,
}

impl From<&LmConfig> for ConvergenceCriteria {
    fn from(config: &LmConfig) -> Self {
        Self {
            ftol: config.ftol,
            ftol_patience: config.ftol_patience.max(1),
            xtol: config.xtol,
            gtol: config.gtol,
        }
    }
}

impl ConvergenceCriteria {
    /// Relative SSE improvement of an accepted step.
    pub fn relative_improvement(sse_current: f64, sse_trial: f64) -> f64 {
        if sse_current > 0.0 {
            (sse_current - sse_trial) / sse_current
        } else {
            0.0
        }
    }

    /// `‖Δ‖ <= xtol (‖x‖ + xtol)`.
    pub fn step_is_small(&self, step: &Array1<f64>, free_values: &Array1<f64>) -> bool {
        let step_norm = step.dot(step).sqrt();
        let scale = free_values.dot(free_values).sqrt();
        step_norm <= self.xtol * (scale + self.xtol)
    }

    /// Largest cosine between the residual vector and any Jacobian column.
    ///
    /// Zero means the residual is orthogonal to every search direction, i.e.
    /// the current point is stationary. A non-finite column yields NaN, which
    /// never counts as small.
    pub fn gradient_cosine(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> f64 {
        let r_norm = residuals.dot(residuals).sqrt();
        if r_norm == 0.0 {
            return 0.0;
        }
        jacobian
            .columns()
            .into_iter()
            .map(|column| {
                let c_norm = column.dot(&column).sqrt();
                if c_norm == 0.0 {
                    0.0
                } else {
                    (column.dot(residuals) / (c_norm * r_norm)).abs()
                }
            })
            .fold(0.0, |max, cosine| {
                if max.is_nan() || cosine.is_nan() {
                    f64::NAN
                } else {
                    max.max(cosine)
                }
            })
    }

    pub fn gradient_is_small(&self, jacobian: &Array2<f64>, residuals: &Array1<f64>) -> bool {
        Self::gradient_cosine(jacobian, residuals) <= self.gtol
    }
}

/// Tracks consecutive stalled accepted steps across iterations.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    criteria: ConvergenceCriteria,
    stalled: usize,
}

impl ConvergenceMonitor {
    pub fn new(criteria: ConvergenceCriteria) -> Self {
        Self {
            criteria,
            stalled: 0,
        }
    }

    pub fn criteria(&self) -> &ConvergenceCriteria {
        &self.criteria
    }

    /// Record an accepted step; returns a reason string once converged.
    pub fn accept(
        &mut self,
        sse_current: f64,
        sse_trial: f64,
        step: &Array1<f64>,
        free_values: &Array1<f64>,
    ) -> Option<String> {
        let improvement = ConvergenceCriteria::relative_improvement(sse_current, sse_trial);
        if improvement < self.criteria.ftol {
            self.stalled += 1;
        } else {
            self.stalled = 0;
        }

        if self.stalled >= self.criteria.ftol_patience {
            return Some(format!(
                "relative SSE improvement {:.2e} < {:.2e} for {} accepted steps",
                improvement, self.criteria.ftol, self.stalled
            ));
        }
        if self.criteria.step_is_small(step, free_values) {
            return Some(format!(
                "step norm {:.2e} below tolerance",
                step.dot(step).sqrt()
            ));
        }
        None
    }
}
