//! Construction of the time-by-cohort stock and outflow matrices.
//!
//! Both matrices are dense `n x n` with rows indexing time and columns indexing
//! cohorts. Entry `[t, c]` of the stock matrix is the quantity that entered at
//! step `c` and is still present at step `t`; it is zero for `t < c`.
//!
//! # Algorithms
//!
//! **Inflow-driven.** Each column is independent:
//! $$S_{t,c} = I_c \, S(t - c; \mu_c, \sigma_c), \quad t \ge c$$
//! The survival curves are evaluated in parallel across cohorts.
//!
//! **Stock-driven.** The inflow is unknown and solved step by step. At step
//! $t$ every column $c < t$ is already final, so the carry-over
//! $\sum_{c<t} S_{t,c}$ is known and, since survival at age zero is one,
//! $$I_t = \hat{S}_t - \sum_{c<t} S_{t,c}$$
//! where $\hat{S}_t$ is the target stock. Column $t$ is then projected forward.
//! The steps must run in ascending time order.

use crate::errors::{check_length, DSMResult};
use crate::lifetime::LifetimeParameters;
use crate::timeseries::FloatValue;
use ndarray::{s, Array1, Array2, ArrayView1};
use rayon::prelude::*;

/// Relative tolerance below zero before a solved inflow counts as negative.
///
/// Back-solving a stock series that was itself produced by an inflow-driven
/// run leaves rounding residue of order `1e-15` relative to the stock.
pub const NEGATIVE_INFLOW_TOLERANCE: FloatValue = 1e-9;

/// Matrices and inflow produced by a single fill.
#[derive(Debug, Clone)]
pub struct CohortFill {
    /// Stock by time (rows) and cohort (columns)
    pub stock_by_cohort: Array2<FloatValue>,
    /// Outflow by time (rows) and cohort (columns)
    pub outflow_by_cohort: Array2<FloatValue>,
    /// Inflow per cohort. Equal to the driver in inflow-driven mode.
    pub inflow: Array1<FloatValue>,
    /// Cohorts whose solved inflow is negative. Always all `false` in
    /// inflow-driven mode.
    pub negative_inflow: Vec<bool>,
}

/// Fills cohort matrices for a fixed set of lifetime parameters.
///
/// Driver series must have one value per cohort. The lifetime parameters
/// themselves are not validated here; see [`LifetimeParameters::validate`].
pub struct CohortMatrixBuilder<'a> {
    lifetime: &'a LifetimeParameters,
}

impl<'a> CohortMatrixBuilder<'a> {
    pub fn new(lifetime: &'a LifetimeParameters) -> Self {
        Self { lifetime }
    }

    /// Fill the matrices from a known inflow per cohort.
    pub fn inflow_driven(&self, inflow: ArrayView1<FloatValue>) -> DSMResult<CohortFill> {
        let n = inflow.len();
        check_length("inflow", self.lifetime.len(), n)?;

        let columns: Vec<Array1<FloatValue>> = (0..n)
            .into_par_iter()
            .map(|c| Array1::from_vec(self.lifetime.survival_curve(c, n - c)) * inflow[c])
            .collect();

        let mut stock_by_cohort = Array2::<FloatValue>::zeros((n, n));
        for (c, column) in columns.iter().enumerate() {
            stock_by_cohort.slice_mut(s![c.., c]).assign(column);
        }

        let inflow = inflow.to_owned();
        let outflow_by_cohort = outflow_by_cohort(&stock_by_cohort, inflow.view());

        Ok(CohortFill {
            stock_by_cohort,
            outflow_by_cohort,
            inflow,
            negative_inflow: vec![false; n],
        })
    }

    /// Fill the matrices from a target total stock, solving for the inflow.
    ///
    /// A negative solved inflow is kept as-is so the total stock still
    /// matches the target, and the cohort is flagged in
    /// [`CohortFill::negative_inflow`].
    pub fn stock_driven(&self, target_stock: ArrayView1<FloatValue>) -> DSMResult<CohortFill> {
        let n = target_stock.len();
        check_length("target stock", self.lifetime.len(), n)?;

        let mut stock_by_cohort = Array2::<FloatValue>::zeros((n, n));
        let mut inflow = Array1::<FloatValue>::zeros(n);
        let mut negative_inflow = vec![false; n];

        for t in 0..n {
            let carry_over = stock_by_cohort.slice(s![t, ..t]).sum();
            let solved = target_stock[t] - carry_over;

            inflow[t] = solved;
            negative_inflow[t] = is_negative_inflow(solved, target_stock[t]);

            let curve = Array1::from_vec(self.lifetime.survival_curve(t, n - t));
            stock_by_cohort
                .slice_mut(s![t.., t])
                .assign(&(curve * solved));
        }

        let outflow_by_cohort = outflow_by_cohort(&stock_by_cohort, inflow.view());

        Ok(CohortFill {
            stock_by_cohort,
            outflow_by_cohort,
            inflow,
            negative_inflow,
        })
    }
}

/// Outflow by time and cohort derived from the stock matrix.
///
/// $$O_{c,c} = I_c - S_{c,c}, \qquad O_{t,c} = S_{t-1,c} - S_{t,c} \quad (t > c)$$
///
/// Entries above the diagonal (`t < c`) are zero.
pub fn outflow_by_cohort(
    stock_by_cohort: &Array2<FloatValue>,
    inflow: ArrayView1<FloatValue>,
) -> Array2<FloatValue> {
    let n = inflow.len();
    let mut outflow = Array2::<FloatValue>::zeros((n, n));

    for c in 0..n {
        outflow[[c, c]] = inflow[c] - stock_by_cohort[[c, c]];
        for t in (c + 1)..n {
            outflow[[t, c]] = stock_by_cohort[[t - 1, c]] - stock_by_cohort[[t, c]];
        }
    }
    outflow
}

fn is_negative_inflow(inflow: FloatValue, target: FloatValue) -> bool {
    inflow < -NEGATIVE_INFLOW_TOLERANCE * target.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DSMError;
    use crate::survival::LifetimeDistribution;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn normal(mean: FloatValue, spread: FloatValue, n: usize) -> LifetimeParameters {
        LifetimeParameters::constant(LifetimeDistribution::Normal, mean, spread, n)
    }

    #[test]
    fn inflow_driven_structure() {
        let lifetime = normal(3.0, 1.0, 6);
        let inflow = array![5.0, 2.0, 0.0, 7.0, 1.0, 3.0];
        let fill = CohortMatrixBuilder::new(&lifetime)
            .inflow_driven(inflow.view())
            .unwrap();

        for c in 0..6 {
            // Fully present in the entry step
            assert_eq!(fill.stock_by_cohort[[c, c]], inflow[c]);
            for t in 0..c {
                assert_eq!(fill.stock_by_cohort[[t, c]], 0.0);
                assert_eq!(fill.outflow_by_cohort[[t, c]], 0.0);
            }
            for t in (c + 1)..6 {
                assert!(fill.stock_by_cohort[[t, c]] <= fill.stock_by_cohort[[t - 1, c]]);
                assert!(fill.outflow_by_cohort[[t, c]] >= 0.0);
            }
        }
        assert_eq!(fill.inflow, inflow);
        assert!(fill.negative_inflow.iter().all(|flag| !flag));
    }

    #[test]
    fn inflow_driven_matches_survival() {
        let lifetime = normal(2.0, 0.5, 4);
        let fill = CohortMatrixBuilder::new(&lifetime)
            .inflow_driven(array![0.0, 4.0, 0.0, 0.0].view())
            .unwrap();

        assert_abs_diff_eq!(fill.stock_by_cohort[[2, 1]], 4.0 * 0.977_249_868, epsilon = 1e-7);
        assert_abs_diff_eq!(fill.stock_by_cohort[[3, 1]], 2.0, epsilon = 1e-12);
        assert_eq!(fill.stock_by_cohort.column(0).sum(), 0.0);
    }

    #[test]
    fn outflow_is_column_difference() {
        let stock = array![[10.0, 0.0, 0.0], [6.0, 5.0, 0.0], [1.0, 4.0, 2.0]];
        let outflow = outflow_by_cohort(&stock, array![10.0, 5.0, 2.0].view());
        assert_eq!(
            outflow,
            array![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [5.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn outflow_keeps_diagonal_residual() {
        // A survival below one at age zero shows up on the diagonal
        let stock = array![[8.0, 0.0], [5.0, 3.0]];
        let outflow = outflow_by_cohort(&stock, array![10.0, 3.0].view());
        assert_eq!(outflow[[0, 0]], 2.0);
        assert_eq!(outflow[[1, 0]], 3.0);
        assert_eq!(outflow[[1, 1]], 0.0);
    }

    #[test]
    fn stock_driven_constant_stock() {
        let lifetime = normal(4.0, 1.0, 10);
        let target = Array1::from_elem(10, 100.0);
        let fill = CohortMatrixBuilder::new(&lifetime)
            .stock_driven(target.view())
            .unwrap();

        assert_eq!(fill.inflow[0], 100.0);
        for t in 0..10 {
            assert_abs_diff_eq!(fill.stock_by_cohort.row(t).sum(), 100.0, epsilon = 1e-9);
            assert_eq!(fill.stock_by_cohort[[t, t]], fill.inflow[t]);
            assert!(fill.inflow[t] >= 0.0);
        }
        // Replacement inflow equals the outflow of the previous cohorts
        for t in 1..10 {
            assert_abs_diff_eq!(
                fill.inflow[t],
                fill.outflow_by_cohort.row(t).sum(),
                epsilon = 1e-9
            );
        }
        assert!(fill.negative_inflow.iter().all(|flag| !flag));
    }

    #[test]
    fn stock_driven_flags_negative_inflow() {
        // Stock collapses faster than the cohorts can retire
        let lifetime = normal(20.0, 2.0, 4);
        let target = array![10.0, 2.0, 2.0, 2.0];
        let fill = CohortMatrixBuilder::new(&lifetime)
            .stock_driven(target.view())
            .unwrap();

        assert_eq!(fill.negative_inflow, vec![false, true, false, false]);
        assert!(fill.inflow[1] < -7.9);
        for t in 0..4 {
            assert_abs_diff_eq!(fill.stock_by_cohort.row(t).sum(), target[t], epsilon = 1e-9);
        }
    }

    #[test]
    fn driver_length_must_match_cohorts() {
        let lifetime = normal(2.0, 0.5, 3);
        let builder = CohortMatrixBuilder::new(&lifetime);

        let res = builder.inflow_driven(array![1.0, 1.0, 1.0, 1.0].view());
        assert!(matches!(
            res,
            Err(DSMError::ShapeMismatch {
                expected: 3,
                actual: 4,
                ..
            })
        ));

        let res = builder.stock_driven(array![1.0, 1.0].view());
        assert!(matches!(
            res,
            Err(DSMError::ShapeMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn negative_inflow_tolerance() {
        assert!(!is_negative_inflow(-1e-14, 50.0));
        assert!(!is_negative_inflow(0.0, 0.0));
        assert!(is_negative_inflow(-1e-3, 50.0));
        assert!(is_negative_inflow(-1e-5, 0.0));
    }
}
