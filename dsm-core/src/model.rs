//! Dynamic stock model
//!
//! A [`DynamicStockModel`] is built once from a time axis, per-cohort lifetime
//! parameters and a driver series. Building it runs the whole computation; the
//! resulting matrices and totals are immutable. Changing any input means
//! building a new model.
//!
//! # Driving modes
//!
//! - [`DrivingMode::InflowDriven`]: the driver is the inflow per time step.
//!   Stock and outflow follow from the survival of each cohort.
//! - [`DrivingMode::StockDriven`]: the driver is the total stock per time step.
//!   Inflow is back-solved so that the stock matches the target exactly. A
//!   target that falls faster than the cohorts retire needs a negative inflow;
//!   those cohorts are flagged rather than rejected.

use crate::cohort::{CohortFill, CohortMatrixBuilder};
use crate::errors::{check_length, DSMError, DSMResult};
use crate::lifetime::LifetimeParameters;
use crate::timeseries::{FloatValue, Time, TimeAxis};
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which series drives the model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DrivingMode {
    InflowDriven,
    StockDriven,
}

impl DrivingMode {
    pub fn name(&self) -> &'static str {
        match self {
            DrivingMode::InflowDriven => "Inflow-driven",
            DrivingMode::StockDriven => "Stock-driven",
        }
    }
}

impl fmt::Display for DrivingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrivingMode {
    type Err = DSMError;

    /// Accepts "Inflow-driven", "inflow_driven", "Inflow driven" and "InflowDriven"
    /// (and the stock equivalents).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalised.as_str() {
            "inflowdriven" => Ok(DrivingMode::InflowDriven),
            "stockdriven" => Ok(DrivingMode::StockDriven),
            _ => Err(DSMError::UnknownDrivingMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for DrivingMode {
    type Error = DSMError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DrivingMode> for String {
    fn from(value: DrivingMode) -> Self {
        value.name().to_string()
    }
}

/// A cohort whose back-solved inflow is negative.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfeasibleCohort {
    /// Position of the cohort on the time axis
    pub cohort: usize,
    /// Time at which the cohort enters
    pub time: Time,
    /// The negative inflow that was required
    pub inflow: FloatValue,
}

/// A fully computed dynamic stock model.
///
/// Only serializable: a model is always rebuilt from its inputs.
#[derive(Debug, Clone, Serialize)]
pub struct DynamicStockModel {
    time_axis: TimeAxis,
    lifetime: LifetimeParameters,
    driving_mode: DrivingMode,
    stock_by_cohort: Array2<FloatValue>,
    outflow_by_cohort: Array2<FloatValue>,
    stock: Array1<FloatValue>,
    inflow: Array1<FloatValue>,
    outflow: Array1<FloatValue>,
    negative_inflow: Vec<bool>,
}

impl DynamicStockModel {
    /// Build a model driven by the inflow per time step.
    ///
    /// NaN inflows are treated as zero. Negative or infinite inflows are
    /// rejected.
    pub fn compute_inflow_driven(
        time_axis: TimeAxis,
        lifetime: LifetimeParameters,
        inflow: ArrayView1<FloatValue>,
    ) -> DSMResult<Self> {
        Self::compute(DrivingMode::InflowDriven, time_axis, lifetime, inflow)
    }

    /// Build a model driven by the total stock per time step.
    ///
    /// NaN targets are treated as zero. Infinite targets are rejected.
    pub fn compute_stock_driven(
        time_axis: TimeAxis,
        lifetime: LifetimeParameters,
        target_stock: ArrayView1<FloatValue>,
    ) -> DSMResult<Self> {
        Self::compute(DrivingMode::StockDriven, time_axis, lifetime, target_stock)
    }

    /// Build a model using the given driving mode.
    ///
    /// All inputs are validated before any computation starts.
    pub fn compute(
        driving_mode: DrivingMode,
        time_axis: TimeAxis,
        lifetime: LifetimeParameters,
        driver: ArrayView1<FloatValue>,
    ) -> DSMResult<Self> {
        let n = time_axis.len();
        check_length("lifetime parameters", n, lifetime.len())?;
        check_length("driver series", n, driver.len())?;
        lifetime.validate()?;
        let driver = clean_driver(driving_mode, driver)?;

        debug!(
            "Computing {} model with {} time steps ({} lifetimes)",
            driving_mode,
            n,
            lifetime.distribution()
        );

        let builder = CohortMatrixBuilder::new(&lifetime);
        let fill = match driving_mode {
            DrivingMode::InflowDriven => builder.inflow_driven(driver.view())?,
            DrivingMode::StockDriven => builder.stock_driven(driver.view())?,
        };

        let model = Self::from_fill(driving_mode, time_axis, lifetime, fill);

        let infeasible = model.infeasible_cohorts();
        if !infeasible.is_empty() {
            let times: Vec<Time> = infeasible.iter().map(|c| c.time).collect();
            warn!(
                "Target stock is infeasible for the given lifetimes: {} cohort(s) need a negative inflow (times {:?})",
                infeasible.len(),
                times
            );
        }
        debug!("Finished {} model", driving_mode);

        Ok(model)
    }

    fn from_fill(
        driving_mode: DrivingMode,
        time_axis: TimeAxis,
        lifetime: LifetimeParameters,
        fill: CohortFill,
    ) -> Self {
        let stock = fill.stock_by_cohort.map_axis(ndarray::Axis(1), |row| row.sum());
        let outflow = fill
            .outflow_by_cohort
            .map_axis(ndarray::Axis(1), |row| row.sum());

        Self {
            time_axis,
            lifetime,
            driving_mode,
            stock_by_cohort: fill.stock_by_cohort,
            outflow_by_cohort: fill.outflow_by_cohort,
            stock,
            inflow: fill.inflow,
            outflow,
            negative_inflow: fill.negative_inflow,
        }
    }

    pub fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    pub fn lifetime_parameters(&self) -> &LifetimeParameters {
        &self.lifetime
    }

    pub fn driving_mode(&self) -> DrivingMode {
        self.driving_mode
    }

    /// Number of time steps (and cohorts)
    pub fn len(&self) -> usize {
        self.time_axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_axis.is_empty()
    }

    /// Stock by time (rows) and cohort (columns)
    pub fn stock_by_cohort(&self) -> &Array2<FloatValue> {
        &self.stock_by_cohort
    }

    /// Outflow by time (rows) and cohort (columns)
    pub fn outflow_by_cohort(&self) -> &Array2<FloatValue> {
        &self.outflow_by_cohort
    }

    /// Total stock per time step, $\sum_c S_{t,c}$
    pub fn total_stock(&self) -> &Array1<FloatValue> {
        &self.stock
    }

    /// Inflow per cohort
    pub fn total_inflow(&self) -> &Array1<FloatValue> {
        &self.inflow
    }

    /// Total outflow per time step, $\sum_c O_{t,c}$
    pub fn total_outflow(&self) -> &Array1<FloatValue> {
        &self.outflow
    }

    /// Net addition to stock per time step (inflow minus outflow)
    pub fn stock_change(&self) -> Array1<FloatValue> {
        &self.inflow - &self.outflow
    }

    /// Mass balance residual per time step.
    ///
    /// $$B_t = (I_t - O_t) - (S_t - S_{t-1}), \qquad S_{-1} = 0$$
    ///
    /// Zero up to rounding for any model built by this crate.
    pub fn stock_balance(&self) -> Array1<FloatValue> {
        let mut balance = self.stock_change();
        let mut previous = 0.0;
        for (b, &stock) in balance.iter_mut().zip(self.stock.iter()) {
            *b -= stock - previous;
            previous = stock;
        }
        balance
    }

    /// Per cohort, whether the back-solved inflow was negative.
    ///
    /// All `false` for inflow-driven models.
    pub fn negative_inflow_flags(&self) -> &[bool] {
        &self.negative_inflow
    }

    /// Cohorts whose back-solved inflow was negative.
    pub fn infeasible_cohorts(&self) -> Vec<InfeasibleCohort> {
        self.negative_inflow
            .iter()
            .enumerate()
            .filter(|&(_, &negative)| negative)
            .map(|(cohort, _)| InfeasibleCohort {
                cohort,
                time: self.time_axis.values()[cohort],
                inflow: self.inflow[cohort],
            })
            .collect()
    }

    /// True when no cohort needed a negative inflow.
    pub fn is_feasible(&self) -> bool {
        !self.negative_inflow.iter().any(|&negative| negative)
    }
}

/// Replace missing values with zero and reject values the mode cannot use.
fn clean_driver(
    driving_mode: DrivingMode,
    driver: ArrayView1<FloatValue>,
) -> DSMResult<Array1<FloatValue>> {
    let mut n_missing = 0;
    let mut cleaned = Array1::<FloatValue>::zeros(driver.len());

    for (index, (&value, target)) in driver.iter().zip(cleaned.iter_mut()).enumerate() {
        if value.is_nan() {
            n_missing += 1;
            continue;
        }
        if value.is_infinite() {
            return Err(DSMError::InvalidDriverValue {
                index,
                value,
                reason: "value must be finite",
            });
        }
        if driving_mode == DrivingMode::InflowDriven && value < 0.0 {
            return Err(DSMError::InvalidDriverValue {
                index,
                value,
                reason: "inflow must not be negative",
            });
        }
        *target = value;
    }

    if n_missing > 0 {
        debug!("Replaced {} missing driver value(s) with zero", n_missing);
    }
    Ok(cleaned)
}
