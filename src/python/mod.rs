use dsm_core::{
    DSMError, DrivingMode, DynamicStockModel, FloatValue, LifetimeDistribution,
    LifetimeParameters, ModelConfig, TimeAxis,
};
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err(err: DSMError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn prepare_inputs(
    time: PyReadonlyArray1<FloatValue>,
    mean: PyReadonlyArray1<FloatValue>,
    spread: PyReadonlyArray1<FloatValue>,
    distribution: Option<&str>,
) -> PyResult<(TimeAxis, LifetimeParameters)> {
    let distribution = match distribution {
        Some(name) => name.parse().map_err(to_py_err)?,
        None => LifetimeDistribution::default(),
    };
    let time_axis = TimeAxis::from_values(time.as_array().to_owned()).map_err(to_py_err)?;
    let lifetime = LifetimeParameters::from_arrays(
        distribution,
        &mean.as_array().to_vec(),
        &spread.as_array().to_vec(),
    )
    .map_err(to_py_err)?;
    Ok((time_axis, lifetime))
}

/// Python wrapper for DynamicStockModel
///
/// Instances are immutable. Build a new one for every change of inputs.
///
/// Example:
///     model = DynamicStockModel.compute(
///         "Inflow-driven", time, mean, spread, inflow, distribution="Normal"
///     )
///     model.s, model.i, model.o
#[pyclass(frozen)]
#[pyo3(name = "DynamicStockModel")]
#[derive(Debug, Clone)]
pub struct PyDynamicStockModel(pub DynamicStockModel);

#[pymethods]
impl PyDynamicStockModel {
    /// Build a model driven by the inflow per time step
    #[staticmethod]
    #[pyo3(signature = (time, mean, spread, inflow, distribution=None))]
    fn inflow_driven(
        time: PyReadonlyArray1<FloatValue>,
        mean: PyReadonlyArray1<FloatValue>,
        spread: PyReadonlyArray1<FloatValue>,
        inflow: PyReadonlyArray1<FloatValue>,
        distribution: Option<String>,
    ) -> PyResult<Self> {
        Self::compute(
            DrivingMode::InflowDriven.to_string(),
            time,
            mean,
            spread,
            inflow,
            distribution,
        )
    }

    /// Build a model driven by the total stock per time step
    #[staticmethod]
    #[pyo3(signature = (time, mean, spread, stock, distribution=None))]
    fn stock_driven(
        time: PyReadonlyArray1<FloatValue>,
        mean: PyReadonlyArray1<FloatValue>,
        spread: PyReadonlyArray1<FloatValue>,
        stock: PyReadonlyArray1<FloatValue>,
        distribution: Option<String>,
    ) -> PyResult<Self> {
        Self::compute(
            DrivingMode::StockDriven.to_string(),
            time,
            mean,
            spread,
            stock,
            distribution,
        )
    }

    /// Build a model with the driving mode given by name
    /// ("Inflow-driven" or "Stock-driven")
    #[staticmethod]
    #[pyo3(signature = (driver, time, mean, spread, series, distribution=None))]
    fn compute(
        driver: String,
        time: PyReadonlyArray1<FloatValue>,
        mean: PyReadonlyArray1<FloatValue>,
        spread: PyReadonlyArray1<FloatValue>,
        series: PyReadonlyArray1<FloatValue>,
        distribution: Option<String>,
    ) -> PyResult<Self> {
        let driving_mode: DrivingMode = driver.parse().map_err(to_py_err)?;
        let (time_axis, lifetime) = prepare_inputs(time, mean, spread, distribution.as_deref())?;
        DynamicStockModel::compute(driving_mode, time_axis, lifetime, series.as_array())
            .map(Self)
            .map_err(to_py_err)
    }

    /// Build a model from a TOML configuration file
    #[staticmethod]
    fn from_config(
        path: String,
        time: PyReadonlyArray1<FloatValue>,
        series: PyReadonlyArray1<FloatValue>,
    ) -> PyResult<Self> {
        let config = ModelConfig::from_file(path).map_err(to_py_err)?;
        let time_axis = TimeAxis::from_values(time.as_array().to_owned()).map_err(to_py_err)?;
        config
            .build(time_axis, series.as_array())
            .map(Self)
            .map_err(to_py_err)
    }

    #[getter]
    fn driver(&self) -> &'static str {
        self.0.driving_mode().name()
    }

    /// Time axis
    #[getter]
    fn t<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.time_axis().values().to_pyarray_bound(py)
    }

    /// Total stock per time step
    #[getter]
    fn s<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.total_stock().to_pyarray_bound(py)
    }

    /// Inflow per cohort
    #[getter]
    fn i<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.total_inflow().to_pyarray_bound(py)
    }

    /// Total outflow per time step
    #[getter]
    fn o<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.total_outflow().to_pyarray_bound(py)
    }

    /// Stock by time (rows) and cohort (columns)
    #[getter]
    fn s_c<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<FloatValue>> {
        self.0.stock_by_cohort().to_pyarray_bound(py)
    }

    /// Outflow by time (rows) and cohort (columns)
    #[getter]
    fn o_c<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<FloatValue>> {
        self.0.outflow_by_cohort().to_pyarray_bound(py)
    }

    #[getter]
    fn stock_change<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.stock_change().to_pyarray_bound(py)
    }

    #[getter]
    fn stock_balance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<FloatValue>> {
        self.0.stock_balance().to_pyarray_bound(py)
    }

    /// Indices of cohorts whose back-solved inflow was negative
    #[getter]
    fn infeasible_cohorts(&self) -> Vec<usize> {
        self.0
            .infeasible_cohorts()
            .iter()
            .map(|c| c.cohort)
            .collect()
    }

    fn is_feasible(&self) -> bool {
        self.0.is_feasible()
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "<DynamicStockModel driver='{}' n={} distribution='{}'>",
            self.0.driving_mode(),
            self.0.len(),
            self.0.lifetime_parameters().distribution()
        )
    }
}

/// Mean lifetimes interpolated linearly between the first and last cohort,
/// with a constant spread.
///
/// Returns a `(mean, spread)` tuple of arrays of length `n`.
#[pyfunction]
fn linear_lifetime<'py>(
    py: Python<'py>,
    mean_start: FloatValue,
    mean_end: FloatValue,
    spread: FloatValue,
    n: usize,
) -> (Bound<'py, PyArray1<FloatValue>>, Bound<'py, PyArray1<FloatValue>>) {
    let lifetime =
        LifetimeParameters::linear(LifetimeDistribution::Normal, mean_start, mean_end, spread, n);
    (
        PyArray1::from_vec_bound(py, lifetime.means()),
        PyArray1::from_vec_bound(py, lifetime.spreads()),
    )
}

#[pymodule]
pub fn dsm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDynamicStockModel>()?;
    m.add_function(wrap_pyfunction!(linear_lifetime, m)?)?;
    Ok(())
}
