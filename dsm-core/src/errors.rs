use thiserror::Error;

use crate::timeseries::FloatValue;

/// Error type for invalid model inputs.
///
/// Every variant describes a property of the input; re-running the same call
/// reproduces the same error.
#[derive(Error, Debug)]
pub enum DSMError {
    #[error("Shape mismatch for {name}. Expected length {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid lifetime parameter for cohort {cohort}: mean={mean}, spread={spread} ({reason})")]
    InvalidLifetimeParameter {
        cohort: usize,
        mean: FloatValue,
        spread: FloatValue,
        reason: &'static str,
    },
    #[error("Unknown driving mode {0:?}. Expected one of \"Inflow-driven\" or \"Stock-driven\"")]
    UnknownDrivingMode(String),
    #[error("Unknown lifetime distribution {0:?}. Expected one of \"Normal\" or \"Fixed\"")]
    UnknownDistribution(String),
    #[error("Invalid time axis: {0}")]
    InvalidTimeAxis(String),
    #[error("Invalid driver value at index {index}: {value} ({reason})")]
    InvalidDriverValue {
        index: usize,
        value: FloatValue,
        reason: &'static str,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, DSMError>`.
pub type DSMResult<T> = Result<T, DSMError>;

/// Fail with [`DSMError::ShapeMismatch`] unless `actual == expected`.
pub(crate) fn check_length(name: &str, expected: usize, actual: usize) -> DSMResult<()> {
    if expected != actual {
        return Err(DSMError::ShapeMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
