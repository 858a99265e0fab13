//! Levenberg-Marquardt driver.
//!
//! Runs the iteration state machine
//! `Initializing → Iterating → {Converged, MaxIterationsReached, Diverged, Cancelled, Failed}`
//! over the free parameters of a [`FitConfiguration`]. Every terminal state
//! produces a [`FitResult`]; only input validation is reported as an error.

use ndarray::Array1;
use tracing::{debug, info, warn};

use crate::config::FitConfiguration;
use crate::data::ObservedData;
use crate::error::{FitError, Result};
use crate::model::ModelEvaluator;
use crate::parameters::FitParameters;
use crate::result::{FitResult, ProgressEvent};

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceMonitor, TerminalState};
use super::jacobian::JacobianBuilder;
use super::residuals::{ResidualEvaluator, Residuals};
use super::step::LmStep;

/// Hooks the driver consults between iterations.
///
/// Cancellation is polled once at the top of each iteration; progress is
/// reported once per accepted step, in iteration order.
pub trait FitMonitor {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn on_progress(&mut self, _event: &ProgressEvent) {}
}

/// A monitor that never cancels and ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMonitor;

impl FitMonitor for NoMonitor {}

/// Mutable run state, owned by the driver for the duration of one run.
struct FitState {
    params: FitParameters,
    current: Residuals,
    lambda: f64,
    iteration: usize,
}

/// How the iteration loop ended.
struct Termination {
    state: TerminalState,
    message: String,
}

impl Termination {
    fn new(state: TerminalState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of accepted iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the relative SSE improvement tolerance.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set how many consecutive stalled steps trigger convergence.
    pub fn with_ftol_patience(mut self, patience: usize) -> Self {
        self.config.ftol_patience = patience;
        self
    }

    /// Set the tolerance for the step norm.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the gradient tolerance.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the minimum and maximum damping.
    pub fn with_lambda_bounds(mut self, min_lambda: f64, max_lambda: f64) -> Self {
        self.config.min_lambda = min_lambda;
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set the number of consecutive rejections tolerated before divergence.
    pub fn with_max_rejections(mut self, max_rejections: usize) -> Self {
        self.config.max_rejections = max_rejections;
        self
    }

    /// Set the finite-difference step parameters.
    pub fn with_fd_step(mut self, epsilon: f64, min_step: f64) -> Self {
        self.config.fd_epsilon = epsilon;
        self.config.fd_min_step = min_step;
        self
    }

    /// Evaluate Jacobian columns in parallel.
    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.config.parallel_jacobian = parallel;
        self
    }

    /// Validate the inputs and run a fit to completion on the calling thread.
    ///
    /// Returns `Err(InvalidConfiguration)` without calling the evaluator when
    /// the inputs are malformed; otherwise always returns a [`FitResult`].
    pub fn fit(
        &self,
        evaluator: &dyn ModelEvaluator,
        configuration: &FitConfiguration,
        observed: &ObservedData,
        monitor: &mut dyn FitMonitor,
    ) -> Result<FitResult> {
        configuration.validate_against(observed)?;
        Ok(self.run(evaluator, configuration, observed, monitor))
    }

    /// Run a fit on inputs that already passed validation.
    pub(crate) fn run(
        &self,
        evaluator: &dyn ModelEvaluator,
        configuration: &FitConfiguration,
        observed: &ObservedData,
        monitor: &mut dyn FitMonitor,
    ) -> FitResult {
        let residuals = ResidualEvaluator::new(
            evaluator,
            &configuration.model_id,
            observed,
            configuration.weight,
        );
        let params = configuration.parameters.clone();
        let free_indices = params.free_indices();

        info!(
            model = %configuration.model_id,
            samples = observed.len(),
            free = free_indices.len(),
            weight = configuration.weight,
            "starting Levenberg-Marquardt fit"
        );

        let current = match residuals.evaluate(&params.to_map()) {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "initial model evaluation failed");
                return FitResult::failed(
                    params.to_map(),
                    residuals.evaluations(),
                    self.config.initial_lambda,
                    err.to_string(),
                );
            }
        };

        let mut state = FitState {
            params,
            current,
            lambda: self.config.initial_lambda,
            iteration: 0,
        };

        let termination = if free_indices.is_empty() {
            Termination::new(TerminalState::Converged, "all parameters fixed")
        } else {
            self.iterate(&residuals, &free_indices, &mut state, monitor)
        };

        info!(
            state = ?termination.state,
            iterations = state.iteration,
            error = state.current.sse,
            "fit finished: {}",
            termination.message
        );

        FitResult {
            state: termination.state,
            converged: termination.state.is_converged(),
            parameters: state.params.to_map(),
            final_error: state.current.sse,
            iterations: state.iteration,
            evaluations: residuals.evaluations(),
            lambda: state.lambda,
            curves: state.current.curves,
            message: termination.message,
        }
    }

    fn iterate(
        &self,
        residuals: &ResidualEvaluator<'_>,
        free_indices: &[usize],
        state: &mut FitState,
        monitor: &mut dyn FitMonitor,
    ) -> Termination {
        let jacobian_builder = JacobianBuilder::new(self.config.fd_epsilon, self.config.fd_min_step)
            .with_parallel(self.config.parallel_jacobian);
        let mut convergence = ConvergenceMonitor::new(ConvergenceCriteria::from(&self.config));

        loop {
            if monitor.is_cancelled() {
                return Termination::new(TerminalState::Cancelled, "cancelled by request");
            }
            if state.iteration >= self.config.max_iterations {
                return Termination::new(
                    TerminalState::MaxIterationsReached,
                    format!("maximum iterations ({}) reached", self.config.max_iterations),
                );
            }
            if state.current.sse == 0.0 {
                return Termination::new(TerminalState::Converged, "exact fit (zero residual)");
            }

            let jacobian = match jacobian_builder.build(
                residuals,
                &state.params,
                free_indices,
                &state.current.vector,
            ) {
                Ok(jacobian) => jacobian,
                Err(err) => return Termination::new(TerminalState::Failed, err.to_string()),
            };

            if convergence
                .criteria()
                .gradient_is_small(&jacobian, &state.current.vector)
            {
                return Termination::new(TerminalState::Converged, "gradient below tolerance");
            }

            let current_free = free_values(&state.params, free_indices);
            let mut rejections = 0;

            // Trial loop: solve, try the step, adapt damping. Only an
            // accepted step advances the iteration counter.
            loop {
                let step = match LmStep::calculate_step(&jacobian, &state.current.vector, state.lambda)
                {
                    Ok(step) => step,
                    Err(FitError::SingularSystem) => {
                        if state.lambda >= self.config.max_lambda {
                            return Termination::new(
                                TerminalState::Failed,
                                "singular normal equations at maximum damping",
                            );
                        }
                        state.lambda = self.config.increase_lambda(state.lambda);
                        warn!(lambda = state.lambda, "singular system, increasing damping");
                        continue;
                    }
                    Err(err) => return Termination::new(TerminalState::Failed, err.to_string()),
                };

                let mut values = state.params.values();
                for (&index, delta) in free_indices.iter().zip(step.step.iter()) {
                    values[index] += delta;
                }
                let trial_params = match state.params.with_values(&values) {
                    Ok(params) => params,
                    Err(err) => return Termination::new(TerminalState::Failed, err.to_string()),
                };
                // Clamping may shorten the step; measure what was actually taken.
                let applied = &free_values(&trial_params, free_indices) - &current_free;

                let trial = match residuals.evaluate(&trial_params.to_map()) {
                    Ok(trial) => trial,
                    Err(err) => return Termination::new(TerminalState::Failed, err.to_string()),
                };

                if trial.sse < state.current.sse {
                    let sse_current = state.current.sse;
                    let actual_reduction = sse_current - trial.sse;
                    state.params = trial_params;
                    state.current = trial;
                    state.lambda = self.config.decrease_lambda(state.lambda);
                    state.iteration += 1;

                    debug!(
                        iteration = state.iteration,
                        error = state.current.sse,
                        lambda = state.lambda,
                        gain = actual_reduction / step.predicted_reduction,
                        "step accepted"
                    );
                    monitor.on_progress(&self.progress_event(state));

                    if let Some(reason) =
                        convergence.accept(sse_current, state.current.sse, &applied, &current_free)
                    {
                        return Termination::new(TerminalState::Converged, reason);
                    }
                    break;
                }

                rejections += 1;
                debug!(
                    rejections,
                    trial_error = trial.sse,
                    lambda = state.lambda,
                    "step rejected"
                );

                if convergence.criteria().step_is_small(&applied, &current_free) {
                    return Termination::new(
                        TerminalState::Converged,
                        "no improving step above the step tolerance",
                    );
                }
                if rejections >= self.config.max_rejections {
                    return Termination::new(
                        TerminalState::Diverged,
                        format!("{} consecutive rejected steps", rejections),
                    );
                }
                state.lambda = self.config.increase_lambda(state.lambda);
                if state.lambda >= self.config.max_lambda {
                    warn!(lambda = state.lambda, "damping at its upper limit");
                }
            }
        }
    }

    fn progress_event(&self, state: &FitState) -> ProgressEvent {
        let progress = if self.config.max_iterations == 0 {
            100
        } else {
            (state.iteration * 100 / self.config.max_iterations).min(100) as u8
        };
        ProgressEvent {
            iteration: state.iteration,
            error: state.current.sse,
            parameters: state.params.to_map(),
            curves: state.current.curves.clone(),
            lambda: state.lambda,
            progress,
        }
    }
}

fn free_values(params: &FitParameters, free_indices: &[usize]) -> Array1<f64> {
    let values = params.values();
    free_indices.iter().map(|&i| values[i]).collect()
}
