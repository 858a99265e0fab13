//! Forward-difference Jacobian of the weighted residuals.
//!
//! Only free parameters get a column. Each column costs one residual
//! evaluation, so a Jacobian over k free parameters costs k model calls on
//! top of the baseline the caller already holds.

use ndarray::{Array1, Array2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{FitError, Result};
use crate::lm::residuals::ResidualEvaluator;
use crate::parameters::{FitParameter, FitParameters};

/// Finite-difference Jacobian builder.
#[derive(Debug, Clone, Copy)]
pub struct JacobianBuilder {
    /// Relative step size.
    pub epsilon: f64,

    /// Absolute floor on the step so a zero-valued parameter still moves.
    pub min_step: f64,

    /// Evaluate columns in parallel (requires the `parallel` feature).
    pub parallel: bool,
}

impl Default for JacobianBuilder {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            min_step: 1e-8,
            parallel: false,
        }
    }
}

impl JacobianBuilder {
    pub fn new(epsilon: f64, min_step: f64) -> Self {
        Self {
            epsilon,
            min_step,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Step used for a parameter: `max(|value| * epsilon, min_step)`.
    ///
    /// The sign flips to a backward difference when the forward point would
    /// leave the upper bound.
    pub fn step_for(&self, param: &FitParameter) -> f64 {
        let value = param.value();
        let h = (value.abs() * self.epsilon).max(self.min_step);
        if value + h > param.upper_bound() && value - h >= param.lower_bound() {
            -h
        } else {
            h
        }
    }

    /// Build the `2N x free_indices.len()` Jacobian at `params`.
    ///
    /// `baseline` must be the residual vector at `params`.
    pub fn build(
        &self,
        residuals: &ResidualEvaluator<'_>,
        params: &FitParameters,
        free_indices: &[usize],
        baseline: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        let n_residuals = baseline.len();
        if n_residuals != residuals.residual_count() {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                residuals.residual_count(),
                n_residuals
            )));
        }

        let columns = self.columns(residuals, params, free_indices, baseline)?;

        let mut jac = Array2::zeros((n_residuals, free_indices.len()));
        for (j, column) in columns.iter().enumerate() {
            jac.column_mut(j).assign(column);
        }
        Ok(jac)
    }

    fn columns(
        &self,
        residuals: &ResidualEvaluator<'_>,
        params: &FitParameters,
        free_indices: &[usize],
        baseline: &Array1<f64>,
    ) -> Result<Vec<Array1<f64>>> {
        let all: Vec<&FitParameter> = params.iter().collect();
        let column = |k: usize| -> Result<Array1<f64>> {
            let param = all.get(k).ok_or_else(|| {
                FitError::DimensionMismatch(format!("free index {} out of range", k))
            })?;
            let h = self.step_for(param);

            let mut perturbed = params.to_map();
            perturbed.insert(param.name(), param.value() + h);

            let shifted = residuals.evaluate(&perturbed)?;
            Ok((&shifted.vector - baseline) / h)
        };

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return free_indices.par_iter().map(|&k| column(k)).collect();
            }
        }

        free_indices.iter().map(|&k| column(k)).collect()
    }
}
