//! Time axis shared by every vector and matrix of a model.
//!
//! Positions on the axis index cohorts and time steps alike: cohort `c` is the
//! set of units entering at position `c`, and the age of that cohort at
//! position `t` is `t - c` steps regardless of the calendar spacing.

use crate::errors::{DSMError, DSMResult};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub type FloatValue = f64;
pub type Time = f64;

/// An ordered, strictly increasing sequence of time points.
///
/// Serialized as the plain array of values. Deserializing runs the same checks
/// as [`TimeAxis::from_values`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Array1<Time>", into = "Array1<Time>")]
pub struct TimeAxis {
    values: Array1<Time>,
}

impl TimeAxis {
    /// Create a time axis from a set of time points.
    ///
    /// Fails if the axis is empty or if the values are not finite and strictly
    /// increasing.
    pub fn from_values(values: Array1<Time>) -> DSMResult<Self> {
        if values.is_empty() {
            return Err(DSMError::InvalidTimeAxis(
                "time axis must contain at least one value".to_string(),
            ));
        }
        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(DSMError::InvalidTimeAxis(format!(
                "non-finite value {} at index {}",
                value, index
            )));
        }
        if let Some(index) = values
            .iter()
            .zip(values.iter().skip(1))
            .position(|(previous, next)| next <= previous)
        {
            return Err(DSMError::InvalidTimeAxis(format!(
                "values must be strictly increasing, got {} followed by {} at index {}",
                values[index],
                values[index + 1],
                index + 1
            )));
        }

        Ok(Self { values })
    }

    /// Create a time axis from a plain vector of time points.
    pub fn from_vec(values: Vec<Time>) -> DSMResult<Self> {
        Self::from_values(Array1::from_vec(values))
    }

    pub fn values(&self) -> &Array1<Time> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<Time> {
        self.values.get(index).copied()
    }

    pub fn first(&self) -> Time {
        self.values[0]
    }

    pub fn last(&self) -> Time {
        self.values[self.values.len() - 1]
    }
}

impl TryFrom<Array1<Time>> for TimeAxis {
    type Error = DSMError;

    fn try_from(values: Array1<Time>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<TimeAxis> for Array1<Time> {
    fn from(value: TimeAxis) -> Self {
        value.values
    }
}
