//! Dynamic material stock and flow accounting.
//!
//! Given a time series of inflows or of target stock levels and a lifetime
//! distribution per cohort, a [`DynamicStockModel`] tracks how much of each
//! cohort remains in use at every later time step and the outflow that its
//! retirement produces.
//!
//! ```
//! use dsm_core::{DynamicStockModel, LifetimeDistribution, LifetimeParameters, TimeAxis};
//! use ndarray::array;
//!
//! let time_axis = TimeAxis::from_values(array![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
//! let lifetime = LifetimeParameters::constant(LifetimeDistribution::Normal, 2.0, 0.5, 5);
//! let model = DynamicStockModel::compute_inflow_driven(
//!     time_axis,
//!     lifetime,
//!     array![10.0, 0.0, 0.0, 0.0, 0.0].view(),
//! )
//! .unwrap();
//!
//! assert_eq!(model.total_stock()[0], 10.0);
//! assert!(model.total_stock()[4] < 1e-3);
//! ```

pub mod cohort;
pub mod config;
pub mod errors;
pub mod lifetime;
pub mod model;
pub mod survival;
pub mod timeseries;

pub use cohort::{CohortFill, CohortMatrixBuilder};
pub use config::{LifetimeConfig, ModelConfig};
pub use errors::{DSMError, DSMResult};
pub use lifetime::{CohortLifetime, LifetimeParameters};
pub use model::{DrivingMode, DynamicStockModel, InfeasibleCohort};
pub use survival::LifetimeDistribution;
pub use timeseries::{FloatValue, Time, TimeAxis};
