//! Levenberg-Marquardt algorithm implementation.
//!
//! The pieces are kept separate so each can be tested on its own:
//! [`residuals`] builds the weighted residual vector, [`jacobian`] its
//! forward-difference derivative, [`step`] solves the damped normal equations,
//! [`convergence`] decides when to stop and [`driver`] runs the loop.

pub mod config;
pub mod convergence;
pub mod driver;
pub mod jacobian;
pub mod residuals;
pub mod step;

// Re-export key types
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceMonitor, TerminalState};
pub use driver::{FitMonitor, LevenbergMarquardt, NoMonitor};
pub use jacobian::JacobianBuilder;
pub use residuals::{sum_squared_error, ResidualEvaluator, Residuals};
pub use step::{LmStep, SolveMethod, StepResult};
