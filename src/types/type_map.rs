//! Mapping from driver type codes to API type codes and bind targets.
//!
//! The mapping is decided once per column when the result set is described.
//! [`TypeCode`] is what the description reports; [`TargetType`] is the memory
//! layout the driver is asked to materialize values in and what the decoder
//! dispatches on.

use crate::driver::constants::*;
use crate::decode::{DateStruct, NumericStruct, TimestampStruct};

/// API-level type of a column, as reported in the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    String,
    Bool,
    Integer,
    Float,
    Decimal,
    Date,
    DateTime,
}

impl std::fmt::Display for TypeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeCode::String => "STRING",
            TypeCode::Bool => "BOOL",
            TypeCode::Integer => "INTEGER",
            TypeCode::Float => "FLOAT",
            TypeCode::Decimal => "DECIMAL",
            TypeCode::Date => "DATE",
            TypeCode::DateTime => "DATETIME",
        };
        f.write_str(name)
    }
}

/// In-memory layout a column is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit IEEE float.
    Double,
    /// `DATE_STRUCT`.
    Date,
    /// `TIMESTAMP_STRUCT`.
    Timestamp,
    /// `SQL_NUMERIC_STRUCT`.
    FixedPoint,
    /// Single-byte text with a terminator slot.
    NarrowText,
    /// UTF-16 text, two bytes per code unit.
    WideText,
}

impl TargetType {
    /// Bytes one row of this column occupies in the bound buffer.
    pub fn stride(self, display_size: usize) -> usize {
        match self {
            TargetType::Integer => std::mem::size_of::<i64>(),
            TargetType::Double => std::mem::size_of::<f64>(),
            TargetType::Date => DateStruct::SIZE,
            TargetType::Timestamp => TimestampStruct::SIZE,
            TargetType::FixedPoint => NumericStruct::SIZE,
            TargetType::NarrowText => display_size + 1,
            TargetType::WideText => display_size * 2,
        }
    }

    /// C data type code the column is bound with.
    pub fn c_type(self) -> i16 {
        match self {
            TargetType::Integer => SQL_C_SBIGINT,
            TargetType::Double => SQL_C_DOUBLE,
            TargetType::Date => SQL_C_TYPE_DATE,
            TargetType::Timestamp => SQL_C_TYPE_TIMESTAMP,
            TargetType::FixedPoint => SQL_C_NUMERIC,
            TargetType::NarrowText => SQL_C_CHAR,
            TargetType::WideText => SQL_C_WCHAR,
        }
    }

    /// Whether values are materialized as character data.
    pub fn is_text(self) -> bool {
        matches!(self, TargetType::NarrowText | TargetType::WideText)
    }
}

/// Look up the type code and bind target for a driver type code.
///
/// Unknown codes are fetched as narrow text.
pub fn lookup(data_type: i16) -> (TypeCode, TargetType) {
    match data_type {
        SQL_WCHAR | SQL_WVARCHAR | SQL_WLONGVARCHAR => (TypeCode::String, TargetType::WideText),
        SQL_BIT => (TypeCode::Bool, TargetType::Integer),
        SQL_TINYINT | SQL_SMALLINT | SQL_INTEGER | SQL_BIGINT => {
            (TypeCode::Integer, TargetType::Integer)
        }
        SQL_FLOAT | SQL_REAL | SQL_DOUBLE => (TypeCode::Float, TargetType::Double),
        SQL_NUMERIC | SQL_DECIMAL => (TypeCode::Decimal, TargetType::FixedPoint),
        SQL_TYPE_DATE => (TypeCode::Date, TargetType::Date),
        SQL_DATETIME | SQL_TIMESTAMP | SQL_TYPE_TIMESTAMP => {
            (TypeCode::DateTime, TargetType::Timestamp)
        }
        _ => (TypeCode::String, TargetType::NarrowText),
    }
}

/// Display size for a column of the given target and declared size.
pub fn display_size(target: TargetType, column_size: usize) -> usize {
    match target {
        // One extra character for the decimal point.
        TargetType::FixedPoint => column_size + 1,
        text if text.is_text() => {
            if column_size == 0 || column_size > MAX_TEXT_DISPLAY_SIZE {
                MAX_TEXT_DISPLAY_SIZE
            } else {
                column_size
            }
        }
        _ => column_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_text() {
        assert_eq!(lookup(SQL_CHAR), (TypeCode::String, TargetType::NarrowText));
        assert_eq!(lookup(SQL_VARCHAR), (TypeCode::String, TargetType::NarrowText));
        assert_eq!(lookup(SQL_WCHAR), (TypeCode::String, TargetType::WideText));
        assert_eq!(lookup(SQL_WVARCHAR), (TypeCode::String, TargetType::WideText));
        assert_eq!(
            lookup(SQL_WLONGVARCHAR),
            (TypeCode::String, TargetType::WideText)
        );
    }

    #[test]
    fn test_lookup_numbers() {
        assert_eq!(lookup(SQL_BIT), (TypeCode::Bool, TargetType::Integer));
        assert_eq!(lookup(SQL_TINYINT), (TypeCode::Integer, TargetType::Integer));
        assert_eq!(lookup(SQL_BIGINT), (TypeCode::Integer, TargetType::Integer));
        assert_eq!(lookup(SQL_INTEGER), (TypeCode::Integer, TargetType::Integer));
        assert_eq!(lookup(SQL_REAL), (TypeCode::Float, TargetType::Double));
        assert_eq!(lookup(SQL_DOUBLE), (TypeCode::Float, TargetType::Double));
        assert_eq!(lookup(SQL_NUMERIC), (TypeCode::Decimal, TargetType::FixedPoint));
        assert_eq!(lookup(SQL_DECIMAL), (TypeCode::Decimal, TargetType::FixedPoint));
    }

    #[test]
    fn test_lookup_dates() {
        assert_eq!(lookup(SQL_TYPE_DATE), (TypeCode::Date, TargetType::Date));
        assert_eq!(
            lookup(SQL_DATETIME),
            (TypeCode::DateTime, TargetType::Timestamp)
        );
        assert_eq!(
            lookup(SQL_TYPE_TIMESTAMP),
            (TypeCode::DateTime, TargetType::Timestamp)
        );
    }

    #[test]
    fn test_lookup_unknown_falls_back_to_text() {
        assert_eq!(lookup(SQL_TYPE_TIME), (TypeCode::String, TargetType::NarrowText));
        assert_eq!(lookup(SQL_VARBINARY), (TypeCode::String, TargetType::NarrowText));
        assert_eq!(lookup(12345), (TypeCode::String, TargetType::NarrowText));
    }

    #[test]
    fn test_stride() {
        assert_eq!(TargetType::NarrowText.stride(20), 21);
        assert_eq!(TargetType::WideText.stride(20), 40);
        assert_eq!(TargetType::Integer.stride(10), 8);
        assert_eq!(TargetType::Double.stride(53), 8);
        assert_eq!(TargetType::Date.stride(10), 6);
        assert_eq!(TargetType::Timestamp.stride(23), 16);
        assert_eq!(TargetType::FixedPoint.stride(39), 19);
    }

    #[test]
    fn test_c_type() {
        assert_eq!(TargetType::Integer.c_type(), SQL_C_SBIGINT);
        assert_eq!(TargetType::FixedPoint.c_type(), SQL_C_NUMERIC);
        assert_eq!(TargetType::NarrowText.c_type(), SQL_C_CHAR);
        assert_eq!(TargetType::WideText.c_type(), SQL_C_WCHAR);
        assert!(TargetType::WideText.is_text());
        assert!(!TargetType::Timestamp.is_text());
    }

    #[test]
    fn test_display_size() {
        assert_eq!(display_size(TargetType::FixedPoint, 5), 6);
        assert_eq!(display_size(TargetType::FixedPoint, 38), 39);
        assert_eq!(display_size(TargetType::NarrowText, 3), 3);
        assert_eq!(display_size(TargetType::WideText, 0), MAX_TEXT_DISPLAY_SIZE);
        assert_eq!(
            display_size(TargetType::NarrowText, 1 << 30),
            MAX_TEXT_DISPLAY_SIZE
        );
        assert_eq!(display_size(TargetType::Integer, 10), 10);
        assert_eq!(display_size(TargetType::Timestamp, 23), 23);
    }
}
