//! Parameter bounds implementation
//!
//! Box constraints on fit parameters. The driver enforces them by clamping each
//! trial step, so a parameter never leaves `[min, max]` during a run.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint with min and max values
    ///
    /// # Examples
    ///
    /// ```
    /// use wtfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// assert!(Bounds::new(1.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Clamp a value into `[min, max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    /// Whether `value` lies inside the bounds (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check that `value` is finite and inside the bounds.
    pub fn check(&self, value: f64) -> Result<(), BoundsError> {
        if !value.is_finite() {
            return Err(BoundsError::NonFiniteValue);
        }
        if !self.contains(value) {
            return Err(BoundsError::ValueOutsideBounds {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// True when at least one side is finite.
    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() || self.max.is_finite()
    }
}

// JSON has no infinity; unbounded sides are persisted as `null`.

pub(crate) mod lower {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            Some(*value).serialize(serializer)
        } else {
            None::<f64>.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }

    pub fn unbounded() -> f64 {
        f64::NEG_INFINITY
    }
}

pub(crate) mod upper {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::lower::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }

    pub fn unbounded() -> f64 {
        f64::INFINITY
    }
}
