//! Model configuration
//!
//! A model run is described by its driving mode and a lifetime schedule whose
//! mean moves linearly from the first cohort to the last with a constant
//! spread. Configurations are read from TOML:
//!
//! ```toml
//! driver = "Stock-driven"
//!
//! [lifetime]
//! distribution = "Normal"
//! mean_start = 15.0
//! mean_end = 25.0
//! spread = 5.0
//! ```
//!
//! Missing keys take the defaults of [`ModelConfig::default`].

use crate::errors::DSMResult;
use crate::lifetime::LifetimeParameters;
use crate::model::{DrivingMode, DynamicStockModel};
use crate::survival::LifetimeDistribution;
use crate::timeseries::{FloatValue, TimeAxis};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lifetime schedule applied across all cohorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifetimeConfig {
    /// Distribution family.
    /// default: Normal
    pub distribution: LifetimeDistribution,

    /// Mean lifetime of the first cohort (time steps).
    /// default: 15.0
    pub mean_start: FloatValue,

    /// Mean lifetime of the last cohort (time steps).
    /// default: 15.0
    pub mean_end: FloatValue,

    /// Standard deviation of the lifetime, shared by all cohorts (time steps).
    /// default: 5.0
    pub spread: FloatValue,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            distribution: LifetimeDistribution::Normal,
            mean_start: 15.0,
            mean_end: 15.0,
            spread: 5.0,
        }
    }
}

/// Configuration of a model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Which series drives the model.
    /// default: Inflow-driven
    pub driver: DrivingMode,

    pub lifetime: LifetimeConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            driver: DrivingMode::InflowDriven,
            lifetime: LifetimeConfig::default(),
        }
    }
}

impl ModelConfig {
    pub fn from_toml_str(content: &str) -> DSMResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> DSMResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Lifetime parameters for `n` cohorts following the configured schedule.
    pub fn lifetime_parameters(&self, n: usize) -> LifetimeParameters {
        LifetimeParameters::linear(
            self.lifetime.distribution,
            self.lifetime.mean_start,
            self.lifetime.mean_end,
            self.lifetime.spread,
            n,
        )
    }

    /// Build a model for `time_axis` from the configured mode and lifetimes.
    pub fn build(
        &self,
        time_axis: TimeAxis,
        driver: ArrayView1<FloatValue>,
    ) -> DSMResult<DynamicStockModel> {
        let lifetime = self.lifetime_parameters(time_axis.len());
        DynamicStockModel::compute(self.driver, time_axis, lifetime, driver)
    }
}
