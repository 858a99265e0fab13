//! Observed well-test measurements.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Observed pressure change and log-derivative sampled on a common time axis.
///
/// Invariants (checked by [`ObservedData::new`] and [`ObservedData::validate`]):
/// equal lengths, at least one sample, strictly increasing time, finite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedData {
    time: Array1<f64>,
    delta_p: Array1<f64>,
    derivative: Array1<f64>,
}

impl ObservedData {
    /// Build and validate a data set.
    pub fn new(time: Vec<f64>, delta_p: Vec<f64>, derivative: Vec<f64>) -> Result<Self> {
        let data = Self {
            time: Array1::from_vec(time),
            delta_p: Array1::from_vec(delta_p),
            derivative: Array1::from_vec(derivative),
        };
        data.validate()?;
        Ok(data)
    }

    pub fn time(&self) -> &Array1<f64> {
        &self.time
    }

    pub fn delta_p(&self) -> &Array1<f64> {
        &self.delta_p
    }

    pub fn derivative(&self) -> &Array1<f64> {
        &self.derivative
    }

    /// Number of samples N.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.time.len();
        if n == 0 {
            return Err(FitError::InvalidConfiguration(
                "observed data set is empty".to_string(),
            ));
        }
        if self.delta_p.len() != n || self.derivative.len() != n {
            return Err(FitError::InvalidConfiguration(format!(
                "observed sequences differ in length: time={}, delta_p={}, derivative={}",
                n,
                self.delta_p.len(),
                self.derivative.len()
            )));
        }

        let channels = [
            ("time", &self.time),
            ("delta_p", &self.delta_p),
            ("derivative", &self.derivative),
        ];
        for (label, values) in channels {
            if let Some(i) = values.iter().position(|v| !v.is_finite()) {
                return Err(FitError::InvalidConfiguration(format!(
                    "observed {} is not finite at index {}",
                    label, i
                )));
            }
        }

        if let Some(i) = (1..n).find(|&i| self.time[i] <= self.time[i - 1]) {
            return Err(FitError::InvalidConfiguration(format!(
                "observed time is not strictly increasing at index {}",
                i
            )));
        }

        Ok(())
    }
}
