//! # wtfit-rs
//!
//! `wtfit-rs` fits analytical well-test models to observed pressure-change and
//! pressure-derivative curves with a Levenberg-Marquardt least-squares engine.
//!
//! The library provides:
//! - A damped Gauss-Newton driver over a weighted two-channel residual
//!   (pressure and log-derivative), with bounded and fixed parameters
//! - A background execution host with cancellation and progress events
//! - Built-in closed-form flow-regime models and a [`ModelEvaluator`] seam for
//!   external type-curve libraries
//! - JSON persistence of fit configurations and results, CSV data ingest
//!
//! ## Basic Usage
//!
//! ```no_run
//! use wtfit_rs::{FitConfiguration, FitEngine, WellModel};
//!
//! # fn main() -> wtfit_rs::Result<()> {
//! let observed = wtfit_rs::io::read_observed_csv("buildup.csv")?;
//! let model = WellModel::RadialFlow;
//! let configuration = FitConfiguration::new(model.id(), model.default_parameters(), 0.5);
//!
//! let engine = FitEngine::with_builtin_models();
//! let handle = engine.start_fit(configuration, observed)?;
//! let result = handle.wait()?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod io;
pub mod lm;
pub mod logger;
pub mod model;
pub mod models;
pub mod parameters;
pub mod result;
mod utils;

// Re-exports for convenience
pub use config::FitConfiguration;
pub use data::ObservedData;
pub use engine::{ChannelListener, FitEngine, FitEvent, FitHandle, FitListener};
pub use error::{FitError, Result};
pub use lm::{LevenbergMarquardt, LmConfig, TerminalState};
pub use logger::{init_logger, init_logger_with_level};
pub use model::{ModelCurves, ModelEvaluator, ModelId};
pub use models::{FlowRegimeModels, WellModel};
pub use parameters::{FitParameter, FitParameters, ParameterMap};
pub use result::{FitResult, ProgressEvent};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
