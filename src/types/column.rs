//! Column descriptors and the user-facing column description.
//!
//! A [`ColumnDescriptor`] is built once per result column at execute time from
//! what the driver reports and carries everything the decoder needs. The
//! [`ColumnDescription`] is the 7-field view of it exposed by
//! `Cursor::description`.

use crate::decode::text::decode_column_name;
use crate::driver::constants::{SQL_NO_NULLS, SQL_NULLABLE};
use crate::driver::{ColumnBinding, DescribedColumn};

use super::type_map::{self, TargetType, TypeCode};

/// Whether a column admits NULL values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl Nullability {
    /// Convert a raw nullability code; unknown codes map to `Unknown`.
    pub fn from_raw(raw: i16) -> Self {
        match raw {
            SQL_NO_NULLS => Nullability::NoNulls,
            SQL_NULLABLE => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

/// Per-column metadata of the current result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// 1-based column ordinal.
    pub ordinal: u16,
    pub name: String,
    /// Driver type code.
    pub data_type: i16,
    pub type_code: TypeCode,
    pub target: TargetType,
    pub column_size: usize,
    pub display_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

impl ColumnDescriptor {
    /// Build a descriptor from the driver's description of column `ordinal`.
    pub fn from_described(ordinal: u16, described: &DescribedColumn) -> Self {
        let (type_code, target) = type_map::lookup(described.data_type);
        Self {
            ordinal,
            name: decode_column_name(described),
            data_type: described.data_type,
            type_code,
            target,
            column_size: described.column_size,
            display_size: type_map::display_size(target, described.column_size),
            decimal_digits: described.decimal_digits,
            nullable: Nullability::from_raw(described.nullable),
        }
    }

    /// Bytes one row of this column occupies in its bound buffer.
    pub fn stride(&self) -> usize {
        self.target.stride(self.display_size)
    }

    /// Binding request for this column.
    pub fn binding(&self) -> ColumnBinding {
        ColumnBinding {
            column: self.ordinal,
            target: self.target,
            c_type: self.target.c_type(),
            stride: self.stride(),
            precision: self.column_size.min(u8::MAX as usize) as u8,
            scale: self.decimal_digits,
        }
    }

    /// The 7-field description of this column.
    pub fn description(&self) -> ColumnDescription {
        let (precision, scale) = if self.type_code == TypeCode::Decimal {
            (Some(self.column_size), Some(self.decimal_digits))
        } else {
            (None, None)
        };
        ColumnDescription {
            name: self.name.clone(),
            type_code: self.type_code,
            display_size: self.display_size,
            internal_size: self.column_size,
            precision,
            scale,
            null_ok: self.nullable != Nullability::NoNulls,
        }
    }
}

/// Description of one result column:
/// name, type, display size, internal size, precision, scale, null_ok.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: TypeCode,
    pub display_size: usize,
    pub internal_size: usize,
    /// Only set for decimal columns.
    pub precision: Option<usize>,
    /// Only set for decimal columns.
    pub scale: Option<i16>,
    pub null_ok: bool,
}

/// Find a column index by name (case-insensitive).
pub(crate) fn find_by_name(columns: &[ColumnDescription], name: &str) -> Option<usize> {
    let name_upper = name.to_uppercase();
    columns
        .iter()
        .position(|c| c.name.to_uppercase() == name_upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::constants::*;

    fn described(
        name: &str,
        data_type: i16,
        size: usize,
        digits: i16,
        nullable: i16,
    ) -> DescribedColumn {
        let mut buf = vec![0u16; NAME_CAPACITY];
        let units: Vec<u16> = name.encode_utf16().collect();
        buf[..units.len()].copy_from_slice(&units);
        DescribedColumn {
            name: buf,
            name_length: units.len() as i16,
            data_type,
            column_size: size,
            decimal_digits: digits,
            nullable,
        }
    }

    #[test]
    fn test_descriptor_from_described() {
        let col = ColumnDescriptor::from_described(
            4,
            &described("col4", SQL_DECIMAL, 5, 2, SQL_NULLABLE),
        );

        assert_eq!(col.ordinal, 4);
        assert_eq!(col.name, "col4");
        assert_eq!(col.type_code, TypeCode::Decimal);
        assert_eq!(col.target, TargetType::FixedPoint);
        assert_eq!(col.display_size, 6);
        assert_eq!(col.stride(), 19);

        let binding = col.binding();
        assert_eq!(binding.column, 4);
        assert_eq!(binding.c_type, SQL_C_NUMERIC);
        assert_eq!(binding.precision, 5);
        assert_eq!(binding.scale, 2);
    }

    #[test]
    fn test_description_decimal_has_precision_and_scale() {
        let col = ColumnDescriptor::from_described(
            1,
            &described("col5", SQL_DECIMAL, 38, 10, SQL_NULLABLE),
        );
        assert_eq!(
            col.description(),
            ColumnDescription {
                name: "col5".to_string(),
                type_code: TypeCode::Decimal,
                display_size: 39,
                internal_size: 38,
                precision: Some(38),
                scale: Some(10),
                null_ok: true,
            }
        );
    }

    #[test]
    fn test_description_other_types() {
        let col = ColumnDescriptor::from_described(
            1,
            &described("col1", SQL_VARCHAR, 3, 0, SQL_NO_NULLS),
        );
        let desc = col.description();
        assert_eq!(desc.type_code, TypeCode::String);
        assert_eq!(desc.display_size, 3);
        assert_eq!(desc.internal_size, 3);
        assert_eq!(desc.precision, None);
        assert_eq!(desc.scale, None);
        assert!(!desc.null_ok);
        assert_eq!(col.stride(), 4);

        let col = ColumnDescriptor::from_described(
            2,
            &described("col7", SQL_TYPE_TIMESTAMP, 23, 3, SQL_NULLABLE_UNKNOWN),
        );
        let desc = col.description();
        assert_eq!(desc.type_code, TypeCode::DateTime);
        assert_eq!(desc.display_size, 23);
        assert!(desc.null_ok);
    }

    #[test]
    fn test_find_by_name() {
        let columns: Vec<ColumnDescription> = ["ID", "name"]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                ColumnDescriptor::from_described(
                    i as u16 + 1,
                    &described(n, SQL_INTEGER, 10, 0, SQL_NULLABLE),
                )
                .description()
            })
            .collect();

        assert_eq!(find_by_name(&columns, "id"), Some(0));
        assert_eq!(find_by_name(&columns, "NAME"), Some(1));
        assert_eq!(find_by_name(&columns, "UNKNOWN"), None);
    }
}
