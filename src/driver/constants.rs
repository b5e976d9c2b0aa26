//! Driver-layer constants.
//!
//! Values follow the ODBC 3.x headers (`sql.h`, `sqlext.h`, `sqlucode.h`).

// Return codes
pub const SQL_SUCCESS: i16 = 0;
pub const SQL_SUCCESS_WITH_INFO: i16 = 1;
pub const SQL_NO_DATA: i16 = 100;
pub const SQL_ERROR: i16 = -1;

// SQL data types
pub const SQL_CHAR: i16 = 1;
pub const SQL_NUMERIC: i16 = 2;
pub const SQL_DECIMAL: i16 = 3;
pub const SQL_INTEGER: i16 = 4;
pub const SQL_SMALLINT: i16 = 5;
pub const SQL_FLOAT: i16 = 6;
pub const SQL_REAL: i16 = 7;
pub const SQL_DOUBLE: i16 = 8;
pub const SQL_DATETIME: i16 = 9;
pub const SQL_TIMESTAMP: i16 = 11;
pub const SQL_VARCHAR: i16 = 12;
pub const SQL_TYPE_DATE: i16 = 91;
pub const SQL_TYPE_TIME: i16 = 92;
pub const SQL_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_LONGVARCHAR: i16 = -1;
pub const SQL_VARBINARY: i16 = -3;
pub const SQL_BIGINT: i16 = -5;
pub const SQL_TINYINT: i16 = -6;
pub const SQL_BIT: i16 = -7;
pub const SQL_WCHAR: i16 = -8;
pub const SQL_WVARCHAR: i16 = -9;
pub const SQL_WLONGVARCHAR: i16 = -10;

// C data types used as bind targets
pub const SQL_C_CHAR: i16 = 1;
pub const SQL_C_WCHAR: i16 = -8;
pub const SQL_C_SBIGINT: i16 = -25;
pub const SQL_C_DOUBLE: i16 = 8;
pub const SQL_C_NUMERIC: i16 = 2;
pub const SQL_C_TYPE_DATE: i16 = 91;
pub const SQL_C_TYPE_TIMESTAMP: i16 = 93;

// Length/indicator sentinels
pub const SQL_NULL_DATA: isize = -1;
pub const SQL_NO_TOTAL: isize = -4;

// Nullability
pub const SQL_NO_NULLS: i16 = 0;
pub const SQL_NULLABLE: i16 = 1;
pub const SQL_NULLABLE_UNKNOWN: i16 = 2;

/// Capacity, in code units, of the column name buffer filled by `describe_col`.
pub const NAME_CAPACITY: usize = 255;

/// Maximum display size a text column is bound with.
///
/// Unbounded columns (`VARCHAR(MAX)` and friends) report a size of 0; they are
/// bound at this size and longer values come back truncated.
pub const MAX_TEXT_DISPLAY_SIZE: usize = 4000;
