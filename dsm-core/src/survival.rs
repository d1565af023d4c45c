//! Survival functions for cohort lifetimes.
//!
//! A survival function gives the fraction of a cohort's entering quantity that
//! is still in use after a number of elapsed time steps (the cohort's age).
//!
//! # Contract
//!
//! For every distribution:
//!
//! - the fraction lies in $[0, 1]$,
//! - it is non-increasing in age,
//! - it is exactly $1$ for any age $\le 0$.
//!
//! The last point means a cohort is always fully present in the step it
//! enters, so its stock in that step equals its inflow.

use crate::errors::DSMError;
use crate::lifetime::CohortLifetime;
use crate::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;
use std::fmt;
use std::str::FromStr;

/// The family of lifetime distributions a model can use.
///
/// This is a closed set: adding a family means adding a variant here and a
/// branch in [`LifetimeDistribution::survival`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LifetimeDistribution {
    /// Normally distributed lifetime with the cohort's mean and standard deviation.
    ///
    /// $$S(a) = 1 - \Phi\left(\frac{a - \mu}{\sigma}\right)$$
    ///
    /// A spread of zero degenerates to [`LifetimeDistribution::Fixed`].
    #[default]
    Normal,
    /// Every unit of the cohort retires exactly when its age reaches the mean.
    /// The spread is ignored.
    Fixed,
}

impl LifetimeDistribution {
    /// Fraction of a cohort still present at `age` time steps after entry.
    pub fn survival(&self, age: FloatValue, lifetime: &CohortLifetime) -> FloatValue {
        match self {
            LifetimeDistribution::Normal => normal_survival(age, lifetime.mean, lifetime.spread),
            LifetimeDistribution::Fixed => fixed_survival(age, lifetime.mean),
        }
    }

    /// Survival fractions at the integer ages `0..n_ages`.
    pub fn survival_curve(&self, lifetime: &CohortLifetime, n_ages: usize) -> Vec<FloatValue> {
        (0..n_ages)
            .map(|age| self.survival(age as FloatValue, lifetime))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifetimeDistribution::Normal => "Normal",
            LifetimeDistribution::Fixed => "Fixed",
        }
    }
}

impl fmt::Display for LifetimeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LifetimeDistribution {
    type Err = DSMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(LifetimeDistribution::Normal),
            "fixed" => Ok(LifetimeDistribution::Fixed),
            _ => Err(DSMError::UnknownDistribution(s.to_string())),
        }
    }
}

/// Survival fraction of a normally distributed lifetime.
///
/// Uses the complementary error function so the upper tail keeps its
/// precision: $1 - \Phi(z) = \frac{1}{2}\,\mathrm{erfc}(z / \sqrt{2})$.
///
/// # Arguments
///
/// * `age` - Elapsed time steps since entry
/// * `mean` - Mean lifetime of the cohort (time steps)
/// * `spread` - Standard deviation of the lifetime (time steps, `>= 0`)
pub fn normal_survival(age: FloatValue, mean: FloatValue, spread: FloatValue) -> FloatValue {
    if age <= 0.0 {
        return 1.0;
    }
    if spread == 0.0 {
        return fixed_survival(age, mean);
    }

    let z = (age - mean) / spread;
    (0.5 * erfc(z / SQRT_2)).clamp(0.0, 1.0)
}

/// Step survival: fully present while `age < mean`, fully retired afterwards.
pub fn fixed_survival(age: FloatValue, mean: FloatValue) -> FloatValue {
    if age <= 0.0 || age < mean {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lifetime(mean: FloatValue, spread: FloatValue) -> CohortLifetime {
        CohortLifetime { mean, spread }
    }

    #[test]
    fn normal_known_values() {
        // Standard normal tail values at z = -2, 0, 2
        assert_abs_diff_eq!(normal_survival(1.0, 2.0, 0.5), 0.977_249_868, epsilon = 1e-8);
        assert_abs_diff_eq!(normal_survival(2.0, 2.0, 0.5), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(normal_survival(3.0, 2.0, 0.5), 0.022_750_132, epsilon = 1e-8);
        assert_abs_diff_eq!(normal_survival(4.0, 2.0, 0.5), 3.167_124e-5, epsilon = 1e-10);
    }

    #[test]
    fn age_zero_is_fully_present() {
        // Without the age clamp the normal tail would give ~0.84 here
        assert_eq!(normal_survival(0.0, 1.0, 1.0), 1.0);
        assert_eq!(normal_survival(0.0, 15.0, 5.0), 1.0);
        assert_eq!(fixed_survival(0.0, 1.0), 1.0);
    }

    #[test]
    fn negative_age_is_fully_present() {
        assert_eq!(normal_survival(-3.0, 2.0, 0.5), 1.0);
        assert_eq!(normal_survival(-3.0, 2.0, 0.0), 1.0);
        assert_eq!(
            LifetimeDistribution::Fixed.survival(-1.0, &lifetime(2.0, 0.0)),
            1.0
        );
    }

    #[test]
    fn zero_spread_is_a_step() {
        let curve = LifetimeDistribution::Normal.survival_curve(&lifetime(3.0, 0.0), 6);
        assert_eq!(curve, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn fixed_ignores_spread() {
        let curve = LifetimeDistribution::Fixed.survival_curve(&lifetime(2.0, 10.0), 4);
        assert_eq!(curve, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn fixed_with_fractional_mean() {
        let curve = LifetimeDistribution::Fixed.survival_curve(&lifetime(2.5, 0.0), 5);
        assert_eq!(curve, vec![1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn curve_is_bounded_and_non_increasing() {
        for (mean, spread) in [(15.0, 5.0), (2.0, 0.5), (1.0, 10.0), (40.0, 0.1)] {
            let curve = LifetimeDistribution::Normal.survival_curve(&lifetime(mean, spread), 80);
            assert_eq!(curve[0], 1.0);
            for pair in curve.windows(2) {
                assert!(pair[1] <= pair[0], "{:?} not monotonic", pair);
            }
            assert!(curve.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn parse_distribution() {
        assert_eq!(
            "Normal".parse::<LifetimeDistribution>().unwrap(),
            LifetimeDistribution::Normal
        );
        assert_eq!(
            " fixed ".parse::<LifetimeDistribution>().unwrap(),
            LifetimeDistribution::Fixed
        );
        assert!(matches!(
            "Weibull".parse::<LifetimeDistribution>(),
            Err(DSMError::UnknownDistribution(name)) if name == "Weibull"
        ));
        assert_eq!(LifetimeDistribution::Fixed.to_string(), "Fixed");
    }
}
