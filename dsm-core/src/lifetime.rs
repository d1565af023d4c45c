//! Per-cohort lifetime parameters.
//!
//! Every cohort (one per position on the time axis) carries its own mean and
//! spread, so lifetimes can change over the modelled period. All cohorts of a
//! model share one [`LifetimeDistribution`] family.

use crate::errors::{DSMError, DSMResult};
use crate::survival::LifetimeDistribution;
use crate::timeseries::FloatValue;
use serde::{Deserialize, Serialize};

/// Lifetime of a single cohort.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortLifetime {
    /// Mean lifetime in time steps. Must be `> 0`.
    pub mean: FloatValue,
    /// Standard deviation of the lifetime in time steps. Must be `>= 0`,
    /// zero meaning a deterministic lifetime.
    pub spread: FloatValue,
}

impl CohortLifetime {
    pub fn new(mean: FloatValue, spread: FloatValue) -> Self {
        Self { mean, spread }
    }
}

/// Lifetime parameters for every cohort of a model, aligned with the time axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifetimeParameters {
    distribution: LifetimeDistribution,
    cohorts: Vec<CohortLifetime>,
}

impl LifetimeParameters {
    pub fn new(distribution: LifetimeDistribution, cohorts: Vec<CohortLifetime>) -> Self {
        Self {
            distribution,
            cohorts,
        }
    }

    /// Build the parameters from separate mean and spread arrays.
    pub fn from_arrays(
        distribution: LifetimeDistribution,
        mean: &[FloatValue],
        spread: &[FloatValue],
    ) -> DSMResult<Self> {
        if mean.len() != spread.len() {
            return Err(DSMError::ShapeMismatch {
                name: "lifetime spread".to_string(),
                expected: mean.len(),
                actual: spread.len(),
            });
        }

        let cohorts = mean
            .iter()
            .zip(spread)
            .map(|(&mean, &spread)| CohortLifetime::new(mean, spread))
            .collect();
        Ok(Self::new(distribution, cohorts))
    }

    /// The same lifetime for each of `n` cohorts.
    pub fn constant(
        distribution: LifetimeDistribution,
        mean: FloatValue,
        spread: FloatValue,
        n: usize,
    ) -> Self {
        Self::new(distribution, vec![CohortLifetime::new(mean, spread); n])
    }

    /// Mean lifetime interpolated linearly from the first to the last cohort,
    /// with a constant spread.
    ///
    /// A single cohort takes `mean_start`.
    pub fn linear(
        distribution: LifetimeDistribution,
        mean_start: FloatValue,
        mean_end: FloatValue,
        spread: FloatValue,
        n: usize,
    ) -> Self {
        let step = if n > 1 {
            (mean_end - mean_start) / (n - 1) as FloatValue
        } else {
            0.0
        };
        let cohorts = (0..n)
            .map(|c| {
                // Pin the last value so it is not subject to accumulated rounding
                let mean = if n > 1 && c == n - 1 {
                    mean_end
                } else {
                    mean_start + step * c as FloatValue
                };
                CohortLifetime::new(mean, spread)
            })
            .collect();
        Self::new(distribution, cohorts)
    }

    /// Check that every cohort has a finite mean `> 0` and a finite spread `>= 0`.
    pub fn validate(&self) -> DSMResult<()> {
        for (cohort, lifetime) in self.cohorts.iter().enumerate() {
            let reason = if !lifetime.mean.is_finite() || !lifetime.spread.is_finite() {
                Some("values must be finite")
            } else if lifetime.mean <= 0.0 {
                Some("mean must be greater than zero")
            } else if lifetime.spread < 0.0 {
                Some("spread must not be negative")
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(DSMError::InvalidLifetimeParameter {
                    cohort,
                    mean: lifetime.mean,
                    spread: lifetime.spread,
                    reason,
                });
            }
        }
        Ok(())
    }

    pub fn distribution(&self) -> LifetimeDistribution {
        self.distribution
    }

    pub fn cohorts(&self) -> &[CohortLifetime] {
        &self.cohorts
    }

    pub fn cohort(&self, index: usize) -> Option<&CohortLifetime> {
        self.cohorts.get(index)
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn means(&self) -> Vec<FloatValue> {
        self.cohorts.iter().map(|l| l.mean).collect()
    }

    pub fn spreads(&self) -> Vec<FloatValue> {
        self.cohorts.iter().map(|l| l.spread).collect()
    }

    /// Survival fractions of cohort `cohort` at the integer ages `0..n_ages`.
    pub fn survival_curve(&self, cohort: usize, n_ages: usize) -> Vec<FloatValue> {
        self.distribution
            .survival_curve(&self.cohorts[cohort], n_ages)
    }
}
