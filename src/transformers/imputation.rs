//! ## Missing-value fill
//!
//! Every transform rule starts by turning a possibly-missing value into a dense one:
//!
//! - string columns default to `""`,
//! - integer columns default to `0`,
//! - floating point columns default to `0.0`.
//!
//! Present values pass through unchanged. Both defaults are valid operands for the statistics
//! that follow (mean and variance, quantile boundaries, vocabulary lookup).
//!
//! The same rule is available as a DataFusion expression for the analyze pass over DataFrames.

use crate::exceptions::{TaxiTransformError, TaxiTransformResult};
use crate::record::{RawValue, ValueKind};
use arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, col, lit, not, Case as DFCase, Expr};

/// A dense value produced by [`fill_in_missing`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilledValue {
    Float(f64),
    Int(i64),
    Str(String),
}

impl FilledValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FilledValue::Float(_) => ValueKind::Float,
            FilledValue::Int(_) => ValueKind::Int,
            FilledValue::Str(_) => ValueKind::Str,
        }
    }

    /// Reads the value as a float for the numeric rules. Integers are widened.
    pub fn as_f64(&self, column: &str) -> TaxiTransformResult<f64> {
        match self {
            FilledValue::Float(v) => Ok(*v),
            FilledValue::Int(v) => Ok(*v as f64),
            FilledValue::Str(_) => Err(TaxiTransformError::type_mismatch(
                column,
                "numeric",
                ValueKind::Str,
            )),
        }
    }

    /// Reads the value as a string for the vocabulary rule.
    pub fn into_string(self, column: &str) -> TaxiTransformResult<String> {
        match self {
            FilledValue::Str(v) => Ok(v),
            other => Err(TaxiTransformError::type_mismatch(
                column,
                ValueKind::Str,
                other.kind(),
            )),
        }
    }
}

/// Replaces a missing value with the default of its type.
pub fn fill_in_missing(value: &RawValue) -> FilledValue {
    match value {
        RawValue::Float(v) => FilledValue::Float(v.unwrap_or(0.0)),
        RawValue::Int(v) => FilledValue::Int(v.unwrap_or(0)),
        RawValue::Str(v) => FilledValue::Str(v.clone().unwrap_or_default()),
    }
}

/// Fills `value` and reads it as a float, failing with the column name on a string value.
pub fn fill_numeric(column: &str, value: &RawValue) -> TaxiTransformResult<f64> {
    fill_in_missing(value).as_f64(column)
}

/// Fills `value` and reads it as a string, failing with the column name on a numeric value.
pub fn fill_string(column: &str, value: &RawValue) -> TaxiTransformResult<String> {
    fill_in_missing(value).into_string(column)
}

/// Constructs an expression equivalent to SQL COALESCE(expr, fallback).
/// This is implemented as a CASE expression: if `expr` is not null then return it, otherwise return `fallback`.
fn coalesce_expr(expr: Expr, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(expr.clone().is_null())), Box::new(expr))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// The filled numeric column `name` as a Float64 expression.
pub fn filled_numeric_expr(name: &str) -> Expr {
    coalesce_expr(cast(col(name), DataType::Float64), lit(0.0_f64))
}

/// The filled string column `name` as a Utf8 expression.
pub fn filled_string_expr(name: &str) -> Expr {
    coalesce_expr(cast(col(name), DataType::Utf8), lit(""))
}
