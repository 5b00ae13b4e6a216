//! ## Custom Errors for Taxi Transform
//!
//! This module defines the error type returned by every fallible operation in the crate.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! Schema problems (a configured column that is absent, or a column holding values of the
//! wrong type) fail fast and always name the offending column. Numeric edge cases such as
//! NaN inputs, zero variance, or values outside the analyzed range are handled by policy in
//! the transformers and never surface here.
//!
//! ### Example
//!
//! ```rust
//! use taxi_transform::exceptions::{TaxiTransformError, TaxiTransformResult};
//!
//! fn lookup_fare() -> TaxiTransformResult<f64> {
//!     Err(TaxiTransformError::MissingColumn("fare".into()))
//! }
//! ```

use thiserror::Error;

/// Errors specific to the Taxi Transform library.
#[derive(Debug, Error)]
pub enum TaxiTransformError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Indicates that an invalid parameter was provided (e.g., an empty column list or a zero bucket count).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that a configured column does not exist in the record or DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates that a column holds values of a type its transform rule cannot consume.
    #[error("Type mismatch in column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// Indicates that the analyzed statistics carry nothing for a configured column.
    #[error("Missing statistic: {0}")]
    MissingStatistic(String),

    /// Indicates the transform method was called before calling fit.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,
}

impl TaxiTransformError {
    /// Shorthand for building a [`TaxiTransformError::TypeMismatch`].
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// A convenient result type for Taxi Transform operations.
pub type TaxiTransformResult<T> = std::result::Result<T, TaxiTransformError>;
