use crate::catalog::DataType;
use crate::error::{PlumeDBError, PlumeDBResult};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// A typed attribute value used as an index key.
///
/// Each index is constructed with a declared [`DataType`]; textual
/// predicate values are parsed once via [`ScalarValue::from_string`]
/// and compared via [`ScalarValue::compare`], so the index structures
/// themselves never inspect the runtime type per call.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    Int32(i32),
    Float64(f64),
    Varchar(String),
    Date(NaiveDate),
}

impl ScalarValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Varchar(_) => DataType::Varchar,
            ScalarValue::Date(_) => DataType::Date,
        }
    }

    /// Parse a textual predicate value as `data_type`.
    /// Dates use the ISO-8601 `YYYY-MM-DD` form.
    pub fn from_string(string: &str, data_type: DataType) -> PlumeDBResult<Self> {
        match data_type {
            DataType::Int32 => {
                let v = string.parse::<i32>().map_err(|_| {
                    PlumeDBError::TypeMismatch(format!("Cannot parse '{string}' as Int32"))
                })?;
                Ok(ScalarValue::Int32(v))
            }
            DataType::Float64 => {
                let v = string.parse::<f64>().map_err(|_| {
                    PlumeDBError::TypeMismatch(format!("Cannot parse '{string}' as Float64"))
                })?;
                Ok(ScalarValue::Float64(v))
            }
            DataType::Varchar => Ok(ScalarValue::Varchar(string.to_string())),
            DataType::Date => {
                let v = NaiveDate::parse_from_str(string, "%Y-%m-%d").map_err(|_| {
                    PlumeDBError::TypeMismatch(format!("Cannot parse '{string}' as Date"))
                })?;
                Ok(ScalarValue::Date(v))
            }
        }
    }

    /// Total ordering between two values of the same type.
    /// Floats compare by `total_cmp`. Cross-type comparison is an error.
    pub fn compare(&self, other: &Self) -> PlumeDBResult<Ordering> {
        use ScalarValue::*;
        match (self, other) {
            (Int32(a), Int32(b)) => Ok(a.cmp(b)),
            (Float64(a), Float64(b)) => Ok(a.total_cmp(b)),
            (Varchar(a), Varchar(b)) => Ok(a.cmp(b)),
            (Date(a), Date(b)) => Ok(a.cmp(b)),
            _ => Err(PlumeDBError::TypeMismatch(format!(
                "Cannot compare {} with {}",
                self.data_type(),
                other.data_type()
            ))),
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        use ScalarValue::*;
        match (self, other) {
            (Int32(a), Int32(b)) => a.eq(b),
            (Float64(a), Float64(b)) => a.to_bits() == b.to_bits(),
            (Varchar(a), Varchar(b)) => a.eq(b),
            (Date(a), Date(b)) => a.eq(b),
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl std::hash::Hash for ScalarValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use ScalarValue::*;
        match self {
            Int32(v) => v.hash(state),
            Float64(v) => state.write(&v.to_ne_bytes()),
            Varchar(v) => v.hash(state),
            Date(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ScalarValue::Int32(v) => write!(f, "{v}"),
            ScalarValue::Float64(v) => write!(f, "{v}"),
            ScalarValue::Varchar(v) => write!(f, "{v}"),
            ScalarValue::Date(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_for_scalar {
    ($ty:ty, $scalar:tt) => {
        impl From<$ty> for ScalarValue {
            fn from(value: $ty) -> Self {
                ScalarValue::$scalar(value)
            }
        }
    };
}

impl_from_for_scalar!(i32, Int32);
impl_from_for_scalar!(f64, Float64);
impl_from_for_scalar!(String, Varchar);
impl_from_for_scalar!(NaiveDate, Date);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Varchar(value.to_string())
    }
}
