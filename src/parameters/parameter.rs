//! Parameter definition and implementation
//!
//! A [`FitParameter`] is a named model input with box bounds and a `fixed`
//! flag. Fixed parameters are passed through to the model evaluator unchanged
//! and never receive a Jacobian column.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parameters::bounds::{self, Bounds, BoundsError};

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    Bounds(#[from] BoundsError),

    #[error("Parameter '{name}' is defined more than once")]
    DuplicateName { name: String },

    #[error("Parameter name must not be empty")]
    EmptyName,

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Expected {expected} values, got {found}")]
    CountMismatch { expected: usize, found: usize },
}

/// A fit parameter
///
/// Invariant: `lower_bound <= value <= upper_bound` for parameters built
/// through the constructors and setters. Deserialized parameters are checked
/// by [`FitParameter::validate`] before a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameter {
    name: String,

    value: f64,

    #[serde(
        with = "bounds::lower",
        default = "bounds::lower::unbounded"
    )]
    lower_bound: f64,

    #[serde(
        with = "bounds::upper",
        default = "bounds::upper::unbounded"
    )]
    upper_bound: f64,

    #[serde(default)]
    fixed: bool,

    /// Display unit, carried through persistence untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl FitParameter {
    /// Create a free, unbounded parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use wtfit_rs::parameters::FitParameter;
    ///
    /// let param = FitParameter::new("m", 10.0);
    /// assert_eq!(param.name(), "m");
    /// assert_eq!(param.value(), 10.0);
    /// assert!(!param.is_fixed());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            fixed: false,
            unit: None,
        }
    }

    /// Create a free parameter with bounds. The value must already lie inside them.
    ///
    /// # Examples
    ///
    /// ```
    /// use wtfit_rs::parameters::FitParameter;
    ///
    /// let param = FitParameter::with_bounds("skin", 2.0, -5.0, 50.0).unwrap();
    /// assert_eq!(param.lower_bound(), -5.0);
    /// assert_eq!(param.upper_bound(), 50.0);
    /// assert!(FitParameter::with_bounds("skin", 60.0, -5.0, 50.0).is_err());
    /// ```
    pub fn with_bounds(
        name: &str,
        value: f64,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(lower_bound, upper_bound)?;
        bounds.check(value)?;

        Ok(Self {
            name: name.to_string(),
            value,
            lower_bound,
            upper_bound,
            fixed: false,
            unit: None,
        })
    }

    /// Mark the parameter as fixed (held constant during a fit).
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Attach a display unit.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min: self.lower_bound,
            max: self.upper_bound,
        }
    }

    /// Set the value, rejecting anything outside the bounds.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        self.bounds().check(value)?;
        self.value = value;
        Ok(())
    }

    /// Set the fixed flag.
    pub fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    /// Replace the bounds. The current value must still satisfy them.
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(lower_bound, upper_bound)?;
        bounds.check(self.value)?;
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        Ok(())
    }

    /// Clamp `value` into this parameter's bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        self.bounds().clamp(value)
    }

    /// Check the bounds invariant (used on deserialized input).
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.name.trim().is_empty() {
            return Err(ParameterError::EmptyName);
        }
        let bounds = Bounds::new(self.lower_bound, self.upper_bound)?;
        bounds.check(self.value)?;
        Ok(())
    }

    /// Internal setter used by the driver; the caller guarantees the value is clamped.
    pub(crate) fn set_value_clamped(&mut self, value: f64) {
        self.value = self.clamp(value);
    }
}
