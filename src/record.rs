//! ## Raw and Transformed Records
//!
//! A [`RawRecord`] maps column names to [`RawValue`]s. Each value is a possibly-missing typed
//! scalar, the per-row view of a sparse input column. A [`TransformedRecord`] maps
//! transformed column names to [`TransformedValue`]s and is ordered by name, so two runs over
//! the same input produce identical output.

use crate::exceptions::{TaxiTransformError, TaxiTransformResult};
use datafusion::scalar::ScalarValue;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The type of a raw column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Float => write!(f, "float"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Str => write!(f, "string"),
        }
    }
}

/// A possibly-missing scalar for one column of one example.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Float(Option<f64>),
    Int(Option<i64>),
    Str(Option<String>),
}

impl RawValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RawValue::Float(_) => ValueKind::Float,
            RawValue::Int(_) => ValueKind::Int,
            RawValue::Str(_) => ValueKind::Str,
        }
    }

    /// True if the example carries no value for this column.
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Float(v) => v.is_none(),
            RawValue::Int(v) => v.is_none(),
            RawValue::Str(v) => v.is_none(),
        }
    }

    /// Converts one cell of an Arrow column into a raw value.
    ///
    /// Floating point and integer scalars of any width are accepted, as are the three Arrow
    /// string layouts. Anything else is a type mismatch for `column`.
    pub fn try_from_scalar(column: &str, scalar: ScalarValue) -> TaxiTransformResult<Self> {
        let value = match scalar {
            ScalarValue::Float64(v) => RawValue::Float(v),
            ScalarValue::Float32(v) => RawValue::Float(v.map(f64::from)),
            ScalarValue::Float16(v) => RawValue::Float(v.map(f64::from)),
            ScalarValue::Int64(v) => RawValue::Int(v),
            ScalarValue::Int32(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::Int16(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::Int8(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::UInt32(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::UInt16(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::UInt8(v) => RawValue::Int(v.map(i64::from)),
            ScalarValue::UInt64(v) => match v {
                Some(n) => RawValue::Int(Some(i64::try_from(n).map_err(|_| {
                    TaxiTransformError::InvalidParameter(format!(
                        "Value {} in column '{}' does not fit in a 64-bit signed integer",
                        n, column
                    ))
                })?)),
                None => RawValue::Int(None),
            },
            ScalarValue::Utf8(v) | ScalarValue::LargeUtf8(v) | ScalarValue::Utf8View(v) => {
                RawValue::Str(v)
            }
            other => {
                return Err(TaxiTransformError::type_mismatch(
                    column,
                    "float, int or string",
                    other.data_type(),
                ))
            }
        };
        Ok(value)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(Some(v))
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(Some(v))
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Str(Some(v.to_string()))
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Str(Some(v))
    }
}

/// One raw example: column name to possibly-missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    values: HashMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`, replacing any previous value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Declares `column` as present in the schema but missing for this example.
    pub fn with_missing(mut self, column: impl Into<String>, kind: ValueKind) -> Self {
        let value = match kind {
            ValueKind::Float => RawValue::Float(None),
            ValueKind::Int => RawValue::Int(None),
            ValueKind::Str => RawValue::Str(None),
        };
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.values.get(column)
    }

    /// Looks up a column that the schema must contain.
    pub fn require(&self, column: &str) -> TaxiTransformResult<&RawValue> {
        self.values.get(column).ok_or_else(|| {
            TaxiTransformError::MissingColumn(format!("Column '{}' not found in record", column))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A transformed column value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformedValue {
    /// Standardized columns.
    Float(f64),
    /// Vocabulary indices, bucket indices, and the label.
    Int(i64),
}

impl TransformedValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TransformedValue::Float(v) => Some(*v),
            TransformedValue::Int(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TransformedValue::Float(_) => None,
            TransformedValue::Int(v) => Some(*v),
        }
    }
}

/// One transformed example, keyed by transformed column name.
pub type TransformedRecord = BTreeMap<String, TransformedValue>;
