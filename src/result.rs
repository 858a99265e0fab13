//! Fit results and progress snapshots.
//!
//! Both types are immutable snapshots: the driver builds them from its private
//! state and hands ownership to the caller.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::FitConfiguration;
use crate::error::Result;
use crate::lm::TerminalState;
use crate::model::ModelCurves;
use crate::parameters::ParameterMap;

/// Snapshot emitted once per accepted iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Accepted-iteration counter after this step (starts at 1).
    pub iteration: usize,

    /// Sum of squared weighted residuals at the new point.
    pub error: f64,

    pub parameters: ParameterMap,

    pub curves: ModelCurves,

    /// Damping after the step was accepted.
    pub lambda: f64,

    /// `iteration / max_iterations` as a whole percentage, capped at 100.
    pub progress: u8,
}

/// Outcome of a fitting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub state: TerminalState,

    pub converged: bool,

    /// Final values of every parameter, free and fixed, in configuration order.
    pub parameters: ParameterMap,

    /// SSE at the returned parameters; NaN when the model never evaluated.
    /// NaN is written to JSON as `null`.
    #[serde(with = "nan_as_null")]
    pub final_error: f64,

    /// Accepted iterations.
    pub iterations: usize,

    /// Model evaluator calls made during the run.
    pub evaluations: usize,

    /// Damping value when the run stopped.
    pub lambda: f64,

    /// Model curves at the returned parameters (empty if never evaluated).
    pub curves: ModelCurves,

    pub message: String,
}

impl FitResult {
    /// Result for a run that stopped before the model could be evaluated.
    pub(crate) fn failed(
        parameters: ParameterMap,
        evaluations: usize,
        lambda: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            state: TerminalState::Failed,
            converged: false,
            parameters,
            final_error: f64::NAN,
            iterations: 0,
            evaluations,
            lambda,
            curves: ModelCurves::new(Array1::zeros(0), Array1::zeros(0)),
            message: message.into(),
        }
    }

    /// Configuration carrying the fitted values, with bounds and fixed flags
    /// taken from `original`. This is the shape persisted for a finished fit.
    pub fn to_configuration(&self, original: &FitConfiguration) -> FitConfiguration {
        let mut configuration = original.clone();
        configuration.parameters.reset_to(&self.parameters);
        configuration
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            None::<f64>.serialize(serializer)
        } else {
            Some(*value).serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result:")?;
        writeln!(f, "  State: {:?}", self.state)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Error (SSE): {:.6e}", self.final_error)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Model evaluations: {}", self.evaluations)?;
        writeln!(f, "  Parameters:")?;
        for (name, value) in self.parameters.iter() {
            writeln!(f, "    {} = {:.6e}", name, value)?;
        }
        Ok(())
    }
}
