//! Model evaluator interface.
//!
//! The fitting engine treats the analytical model as an opaque, possibly
//! expensive, pure function: given a model identifier, a parameter map and the
//! observed time points it returns predicted pressure change and log-derivative
//! curves. Anything implementing [`ModelEvaluator`] can be fitted, including
//! plain closures and the built-in flow-regime models in [`crate::models`].

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::parameters::ParameterMap;

/// Identifier of an analytical model known to an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ModelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Model-predicted pressure change and log-derivative curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCurves {
    pub pressure: Array1<f64>,
    pub derivative: Array1<f64>,
}

impl ModelCurves {
    pub fn new(pressure: Array1<f64>, derivative: Array1<f64>) -> Self {
        Self {
            pressure,
            derivative,
        }
    }

    /// Check both curves have `expected_len` finite samples.
    pub fn check(&self, expected_len: usize) -> Result<()> {
        if self.pressure.len() != expected_len || self.derivative.len() != expected_len {
            return Err(FitError::ModelEvaluation(format!(
                "expected {} samples, got pressure={} derivative={}",
                expected_len,
                self.pressure.len(),
                self.derivative.len()
            )));
        }
        if let Some(i) = self.pressure.iter().position(|v| !v.is_finite()) {
            return Err(FitError::ModelEvaluation(format!(
                "non-finite pressure at index {}",
                i
            )));
        }
        if let Some(i) = self.derivative.iter().position(|v| !v.is_finite()) {
            return Err(FitError::ModelEvaluation(format!(
                "non-finite derivative at index {}",
                i
            )));
        }
        Ok(())
    }
}

/// A trait representing the external model evaluator.
///
/// Implementations must be pure: the same inputs always produce the same
/// curves. The engine calls this from a worker thread, hence `Send + Sync`.
pub trait ModelEvaluator: Send + Sync {
    /// Evaluate `model_id` with `params` at the given time points.
    ///
    /// Both returned curves must have the same length as `time`.
    fn evaluate(
        &self,
        model_id: &ModelId,
        params: &ParameterMap,
        time: &Array1<f64>,
    ) -> Result<ModelCurves>;
}

impl<F> ModelEvaluator for F
where
    F: Fn(&ModelId, &ParameterMap, &Array1<f64>) -> Result<ModelCurves> + Send + Sync,
{
    fn evaluate(
        &self,
        model_id: &ModelId,
        params: &ParameterMap,
        time: &Array1<f64>,
    ) -> Result<ModelCurves> {
        self(model_id, params, time)
    }
}
