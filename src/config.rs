//! Fit configuration: which model, which parameters, how to weight the channels.
//!
//! This is also the persisted shape exchanged with project files, so it
//! round-trips through JSON unchanged.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::ObservedData;
use crate::error::{FitError, Result};
use crate::model::ModelId;
use crate::parameters::FitParameters;

/// Model, parameter set and channel weight for one fitting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfiguration {
    pub model_id: ModelId,

    pub parameters: FitParameters,

    /// Derivative channel weight in `[0, 1]`: 0 fits pressure only, 1 fits
    /// the derivative only.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    0.5
}

impl FitConfiguration {
    pub fn new(model_id: impl Into<ModelId>, parameters: FitParameters, weight: f64) -> Self {
        Self {
            model_id: model_id.into(),
            parameters,
            weight,
        }
    }

    /// Convert an integer slider position (0..=100) into a channel weight.
    pub fn weight_from_percent(percent: u8) -> f64 {
        f64::from(percent.min(100)) / 100.0
    }

    /// The channel weight as an integer slider position.
    pub fn weight_percent(&self) -> u8 {
        (self.weight.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    /// Check the configuration on its own: weight range and parameter invariants.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(FitError::InvalidConfiguration(format!(
                "weight {} is outside [0, 1]",
                self.weight
            )));
        }
        if self.parameters.is_empty() {
            return Err(FitError::InvalidConfiguration(
                "no parameters configured".to_string(),
            ));
        }
        self.parameters
            .validate()
            .map_err(|err| FitError::InvalidConfiguration(err.to_string()))
    }

    /// Check the configuration against the data it will be fitted to.
    pub fn validate_against(&self, observed: &ObservedData) -> Result<()> {
        self.validate()?;
        observed.validate()?;

        let free = self.parameters.free_count();
        if observed.len() < free {
            return Err(FitError::InvalidConfiguration(format!(
                "{} free parameters but only {} observed samples",
                free,
                observed.len()
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
