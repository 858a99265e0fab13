//! # Parameter System
//!
//! Named fit parameters with box bounds and a fixed/free flag.
//!
//! ## Core Components
//!
//! - [`FitParameter`]: a single parameter with value, bounds and `fixed` flag
//! - [`FitParameters`]: ordered, name-unique collection; knows which entries are free
//! - [`ParameterMap`]: insertion-ordered name → value view passed to model evaluators
//! - [`Bounds`]: clamping and bound checks
//!
//! ## Example Usage
//!
//! ```rust
//! use wtfit_rs::parameters::{FitParameter, FitParameters};
//!
//! let params = FitParameters::from_vec(vec![
//!     FitParameter::with_bounds("m", 12.0, 0.0, 1e4).unwrap(),
//!     FitParameter::new("b", 3.0).fixed(),
//! ])
//! .unwrap();
//!
//! assert_eq!(params.free_indices(), vec![0]);
//! assert_eq!(params.to_map().get("b"), Some(3.0));
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;


// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use parameter::{FitParameter, ParameterError};
pub use parameters::{FitParameters, ParameterMap};
