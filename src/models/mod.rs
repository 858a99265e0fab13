//! Built-in analytical well-test models.
//!
//! These closed-form flow-regime models implement [`ModelEvaluator`] and are
//! what the `wtfit` binary fits against. Library users with their own type
//! curves plug in a different evaluator instead.

use ndarray::Array1;

use crate::error::{FitError, Result};
use crate::model::{ModelCurves, ModelEvaluator, ModelId};
use crate::parameters::{FitParameter, FitParameters, ParameterMap};

mod flow_regimes;

pub use flow_regimes::{
    linear_flow, pseudo_steady_state, radial_flow, storage_radial, wellbore_storage,
};

/// The flow-regime models known to [`FlowRegimeModels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellModel {
    RadialFlow,
    WellboreStorage,
    LinearFlow,
    StorageRadial,
    PseudoSteadyState,
}

impl WellModel {
    pub const ALL: [WellModel; 5] = [
        WellModel::RadialFlow,
        WellModel::WellboreStorage,
        WellModel::LinearFlow,
        WellModel::StorageRadial,
        WellModel::PseudoSteadyState,
    ];

    pub fn id(&self) -> ModelId {
        ModelId::new(match self {
            WellModel::RadialFlow => "radial_flow",
            WellModel::WellboreStorage => "wellbore_storage",
            WellModel::LinearFlow => "linear_flow",
            WellModel::StorageRadial => "storage_radial",
            WellModel::PseudoSteadyState => "pseudo_steady_state",
        })
    }

    pub fn from_id(id: &ModelId) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|model| model.id() == *id)
            .ok_or_else(|| FitError::ModelEvaluation(format!("unknown model '{}'", id)))
    }

    /// Parameter names in the order the model expects them.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            WellModel::RadialFlow => &["m", "b"],
            WellModel::WellboreStorage => &["c"],
            WellModel::LinearFlow => &["a"],
            WellModel::StorageRadial => &["m", "tau", "skin"],
            WellModel::PseudoSteadyState => &["m", "b", "c"],
        }
    }

    /// Initial guesses and bounds used when a model is first selected.
    pub fn default_parameters(&self) -> FitParameters {
        let params = match self {
            WellModel::RadialFlow => vec![
                bounded("m", 10.0, 1e-6, 1e6),
                FitParameter::new("b", 1.0),
            ],
            WellModel::WellboreStorage => vec![bounded("c", 1.0, 1e-9, 1e9)],
            WellModel::LinearFlow => vec![bounded("a", 1.0, 1e-9, 1e9)],
            WellModel::StorageRadial => vec![
                bounded("m", 10.0, 1e-6, 1e6),
                bounded("tau", 0.1, 1e-6, 1e4),
                bounded("skin", 0.0, -10.0, 100.0),
            ],
            WellModel::PseudoSteadyState => vec![
                bounded("m", 10.0, 1e-6, 1e6),
                FitParameter::new("b", 1.0),
                bounded("c", 0.01, 0.0, 1e6),
            ],
        };
        // Names are distinct literals above, so this cannot collide.
        FitParameters::from_vec(params).unwrap_or_default()
    }

    /// Evaluate this model with parameters looked up by name.
    pub fn evaluate(&self, params: &ParameterMap, time: &Array1<f64>) -> Result<ModelCurves> {
        let curves = match self {
            WellModel::RadialFlow => radial_flow(time, params.require("m")?, params.require("b")?),
            WellModel::WellboreStorage => wellbore_storage(time, params.require("c")?),
            WellModel::LinearFlow => linear_flow(time, params.require("a")?),
            WellModel::StorageRadial => storage_radial(
                time,
                params.require("m")?,
                params.require("tau")?,
                params.require("skin")?,
            ),
            WellModel::PseudoSteadyState => pseudo_steady_state(
                time,
                params.require("m")?,
                params.require("b")?,
                params.require("c")?,
            ),
        };
        Ok(curves)
    }
}

fn bounded(name: &str, value: f64, lower: f64, upper: f64) -> FitParameter {
    FitParameter::with_bounds(name, value, lower, upper).unwrap_or_else(|_| FitParameter::new(name, value))
}

/// Evaluator dispatching on [`WellModel`] ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowRegimeModels;

impl ModelEvaluator for FlowRegimeModels {
    fn evaluate(
        &self,
        model_id: &ModelId,
        params: &ParameterMap,
        time: &Array1<f64>,
    ) -> Result<ModelCurves> {
        let model = WellModel::from_id(model_id)?;
        model.evaluate(params, time).map_err(|err| match err {
            FitError::Parameter(inner) => {
                FitError::ModelEvaluation(format!("{}: {}", model_id, inner))
            }
            other => other,
        })
    }
}
