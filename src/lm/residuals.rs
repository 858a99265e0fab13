//! Weighted residual construction.
//!
//! The residual vector has length 2N: the first N entries are the pressure
//! channel scaled by `1 - weight`, the last N the derivative channel scaled by
//! `weight`. The objective minimized is the plain sum of their squares.

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array1};

use crate::data::ObservedData;
use crate::error::Result;
use crate::model::{ModelCurves, ModelEvaluator, ModelId};
use crate::parameters::ParameterMap;

/// Residuals at one parameter point, with the curves that produced them.
#[derive(Debug, Clone)]
pub struct Residuals {
    pub vector: Array1<f64>,
    pub curves: ModelCurves,
    pub sse: f64,
}

/// Sum of squared residuals.
pub fn sum_squared_error(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r.powi(2)).sum()
}

/// Turns parameter maps into weighted residual vectors against observed data.
pub struct ResidualEvaluator<'a> {
    evaluator: &'a dyn ModelEvaluator,
    model_id: &'a ModelId,
    observed: &'a ObservedData,
    weight: f64,
    evaluations: AtomicUsize,
}

impl<'a> ResidualEvaluator<'a> {
    pub fn new(
        evaluator: &'a dyn ModelEvaluator,
        model_id: &'a ModelId,
        observed: &'a ObservedData,
        weight: f64,
    ) -> Self {
        Self {
            evaluator,
            model_id,
            observed,
            weight,
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Length of the residual vector (2N).
    pub fn residual_count(&self) -> usize {
        2 * self.observed.len()
    }

    /// Number of model evaluator calls made so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Evaluate the model and build the weighted residual vector.
    ///
    /// Non-finite or wrongly sized model output is a
    /// [`FitError::ModelEvaluation`](crate::error::FitError::ModelEvaluation).
    pub fn evaluate(&self, params: &ParameterMap) -> Result<Residuals> {
        let n = self.observed.len();
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let curves = self
            .evaluator
            .evaluate(self.model_id, params, self.observed.time())?;
        curves.check(n)?;

        let mut vector = Array1::zeros(2 * n);
        {
            let pressure = (&curves.pressure - self.observed.delta_p()) * (1.0 - self.weight);
            vector.slice_mut(s![..n]).assign(&pressure);
        }
        {
            let derivative = (&curves.derivative - self.observed.derivative()) * self.weight;
            vector.slice_mut(s![n..]).assign(&derivative);
        }

        let sse = sum_squared_error(&vector);
        Ok(Residuals {
            vector,
            curves,
            sse,
        })
    }
}
