//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! Solves the Marquardt-scaled normal equations
//!
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) Δ = -Jᵀr
//! ```
//!
//! with a Cholesky factorization, falling back to LU with partial pivoting
//! when the matrix is not numerically positive definite.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::error::{FitError, Result};
use crate::utils::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};

/// Floor for the diagonal scaling, so a parameter with zero sensitivity
/// still receives some damping.
const MIN_DIAGONAL: f64 = 1e-12;

/// Which factorization produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Cholesky,
    PivotedLu,
}

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step over the free parameters
    pub step: Array1<f64>,

    /// SSE reduction predicted by the linearized model
    pub predicted_reduction: f64,

    /// The damping parameter used to calculate the step
    pub lambda: f64,

    pub method: SolveMethod,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Calculate the damped step for `jacobian` (2N x k) and `residuals` (2N).
    ///
    /// Fails with [`FitError::SingularSystem`] when neither factorization
    /// yields a finite solution.
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        lambda: f64,
    ) -> Result<StepResult> {
        if jacobian.nrows() != residuals.len() {
            return Err(FitError::DimensionMismatch(format!(
                "Jacobian has {} rows but there are {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }

        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);

        let mut augmented = j_t_j.clone();
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += lambda * j_t_j[[i, i]].max(MIN_DIAGONAL);
        }

        let (step, method) = Self::solve(&augmented, &-&j_t_r)?;
        let predicted_reduction = Self::predicted_reduction(&j_t_j, &j_t_r, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
            lambda,
            method,
        })
    }

    /// Solve `a x = b` for symmetric `a`.
    pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<(Array1<f64>, SolveMethod)> {
        let a_na: DMatrix<f64> = ndarray_to_nalgebra(a);
        let b_na = ndarray_vec_to_nalgebra(b);

        if let Some(cholesky) = a_na.clone().cholesky() {
            let x = nalgebra_vec_to_ndarray(&cholesky.solve(&b_na));
            if x.iter().all(|v| v.is_finite()) {
                return Ok((x, SolveMethod::Cholesky));
            }
        }

        let x = a_na
            .lu()
            .solve(&b_na)
            .map(|x| nalgebra_vec_to_ndarray(&x))
            .ok_or(FitError::SingularSystem)?;
        if x.iter().all(|v| v.is_finite()) {
            Ok((x, SolveMethod::PivotedLu))
        } else {
            Err(FitError::SingularSystem)
        }
    }

    /// Reduction of `‖r + JΔ‖²` relative to `‖r‖²`.
    fn predicted_reduction(j_t_j: &Array2<f64>, j_t_r: &Array1<f64>, step: &Array1<f64>) -> f64 {
        -2.0 * step.dot(j_t_r) - step.dot(&j_t_j.dot(step))
    }
}
