//! Row-buffer decoding.
//!
//! After a block fetch every bound column holds `row_array_size` cells of
//! `stride` bytes plus one indicator per row. [`decode_value`] turns the cell of
//! one row into a [`Value`], dispatching on the column's bind target. The
//! indicator is checked for NULL before the cell contents are looked at.

pub mod datetime;
pub mod numeric;
pub mod text;

pub use datetime::{DateStruct, TimestampStruct, NANOS_PER_MICRO};
pub use numeric::NumericStruct;

use bytes::Buf;

use crate::driver::constants::{SQL_NO_TOTAL, SQL_NULL_DATA};
use crate::driver::ColumnView;
use crate::error::{Error, Result};
use crate::types::{ColumnDescriptor, TargetType, Value};

/// Decode the value of `column` at block position `row`.
pub fn decode_value(column: &ColumnDescriptor, view: &ColumnView<'_>, row: usize) -> Result<Value> {
    let indicator = *view.indicators.get(row).ok_or_else(|| {
        Error::interface(format!(
            "Row {} is outside the {}-row block bound for column {}",
            row,
            view.rows(),
            column.ordinal
        ))
    })?;
    if indicator == SQL_NULL_DATA {
        return Ok(Value::Null);
    }

    let stride = column.stride();
    let start = row * stride;
    let cell = view.data.get(start..start + stride).ok_or_else(|| {
        Error::interface(format!(
            "Buffer of column {} holds {} bytes, row {} needs bytes {}..{}",
            column.ordinal,
            view.data.len(),
            row,
            start,
            start + stride
        ))
    })?;

    match column.target {
        TargetType::Integer => {
            let mut buf = cell;
            Ok(Value::Integer(buf.get_i64_ne()))
        }
        TargetType::Double => {
            let mut buf = cell;
            Ok(Value::Double(buf.get_f64_ne()))
        }
        TargetType::Date => DateStruct::read(cell).to_date().map(Value::Date),
        TargetType::Timestamp => TimestampStruct::read(cell)
            .to_datetime()
            .map(Value::Timestamp),
        TargetType::FixedPoint => Ok(Value::Decimal(NumericStruct::read(cell).to_decimal())),
        TargetType::NarrowText => {
            // The last byte of the cell is the terminator slot.
            let len = text_length(column, indicator, stride.saturating_sub(1))?;
            Ok(Value::Text(text::decode_narrow(&cell[..len])))
        }
        TargetType::WideText => {
            let len = text_length(column, indicator, stride)? & !1;
            text::decode_wide(&cell[..len]).map(Value::Text)
        }
    }
}

/// Number of bytes of a text cell that hold the value.
fn text_length(column: &ColumnDescriptor, indicator: isize, capacity: usize) -> Result<usize> {
    if indicator == SQL_NO_TOTAL {
        return Ok(capacity);
    }
    if indicator < 0 {
        return Err(Error::interface(format!(
            "Invalid length indicator {} for column {}",
            indicator, column.ordinal
        )));
    }
    let len = indicator as usize;
    if len > capacity {
        log::debug!(
            "Value of column {} ({}) truncated from {} to {} bytes",
            column.ordinal,
            column.name,
            len,
            capacity
        );
        return Ok(capacity);
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::constants::*;
    use crate::driver::DescribedColumn;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn column(data_type: i16, size: usize, digits: i16) -> ColumnDescriptor {
        ColumnDescriptor::from_described(
            1,
            &DescribedColumn {
                name: "c".encode_utf16().collect(),
                name_length: 1,
                data_type,
                column_size: size,
                decimal_digits: digits,
                nullable: SQL_NULLABLE,
            },
        )
    }

    #[test]
    fn test_null_indicator_for_every_target() {
        let columns = [
            column(SQL_INTEGER, 10, 0),
            column(SQL_DOUBLE, 53, 0),
            column(SQL_TYPE_DATE, 10, 0),
            column(SQL_TYPE_TIMESTAMP, 23, 3),
            column(SQL_DECIMAL, 5, 2),
            column(SQL_VARCHAR, 3, 0),
            column(SQL_WVARCHAR, 3, 0),
        ];
        for col in &columns {
            // Garbage in the cell must not matter.
            let data = vec![0xFFu8; col.stride() * 2];
            let indicators = [SQL_NULL_DATA, SQL_NULL_DATA];
            let view = ColumnView::new(&data, &indicators);
            assert_eq!(decode_value(col, &view, 1).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_integer_row_offset() {
        let col = column(SQL_INTEGER, 10, 0);
        let mut data = Vec::new();
        for v in [11i64, -22, 33] {
            data.extend_from_slice(&v.to_ne_bytes());
        }
        let indicators = [8, 8, 8];
        let view = ColumnView::new(&data, &indicators);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::Integer(11));
        assert_eq!(decode_value(&col, &view, 1).unwrap(), Value::Integer(-22));
        assert_eq!(decode_value(&col, &view, 2).unwrap(), Value::Integer(33));
    }

    #[test]
    fn test_bit_column_decodes_as_integer() {
        let col = column(SQL_BIT, 1, 0);
        let data = 1i64.to_ne_bytes();
        let view = ColumnView::new(&data, &[8]);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_double() {
        let col = column(SQL_DOUBLE, 53, 0);
        let data = 3.25f64.to_ne_bytes();
        let view = ColumnView::new(&data, &[8]);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::Double(3.25));
    }

    #[test]
    fn test_narrow_text_uses_indicator_length() {
        let col = column(SQL_VARCHAR, 3, 0);
        assert_eq!(col.stride(), 4);
        let data = *b"ab\0Xfoo\0";
        let indicators = [2, 3];
        let view = ColumnView::new(&data, &indicators);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from("ab"));
        assert_eq!(decode_value(&col, &view, 1).unwrap(), Value::from("foo"));
    }

    #[test]
    fn test_narrow_text_truncated() {
        let col = column(SQL_VARCHAR, 3, 0);
        let data = *b"abc\0";
        let view = ColumnView::new(&data, &[10]);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from("abc"));

        let view = ColumnView::new(&data, &[SQL_NO_TOTAL]);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_empty_text_is_not_null() {
        let col = column(SQL_VARCHAR, 3, 0);
        let data = [0u8; 4];
        let view = ColumnView::new(&data, &[0]);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from(""));
    }

    #[test]
    fn test_wide_text() {
        let col = column(SQL_WVARCHAR, 2, 0);
        assert_eq!(col.stride(), 4);
        let mut data = text::encode_wide("\u{1F600}");
        data.extend(text::encode_wide("a"));
        data.extend([0, 0]);
        let indicators = [4, 2];
        let view = ColumnView::new(&data, &indicators);
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from("\u{1F600}"));
        assert_eq!(decode_value(&col, &view, 1).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_wide_text_indicator_beyond_cell() {
        let col = column(SQL_WVARCHAR, 3, 0);
        assert_eq!(col.stride(), 6);
        let mut data = text::encode_wide("abc");
        data.extend(text::encode_wide("xyz"));
        data.extend(text::encode_wide("ab"));
        data.extend([0x63, 0]);
        let indicators = [8, SQL_NO_TOTAL, 5];
        let view = ColumnView::new(&data, &indicators);

        // Longer than the cell: clamped to the cell.
        assert_eq!(decode_value(&col, &view, 0).unwrap(), Value::from("abc"));
        // Unknown total: the whole cell.
        assert_eq!(decode_value(&col, &view, 1).unwrap(), Value::from("xyz"));
        // Odd byte count: rounded down to whole code units.
        assert_eq!(decode_value(&col, &view, 2).unwrap(), Value::from("ab"));
    }

    #[test]
    fn test_fixed_point() {
        let col = column(SQL_DECIMAL, 5, 2);
        let mut data = vec![0u8; col.stride()];
        NumericStruct {
            precision: 5,
            scale: 2,
            sign: 0,
            val: 31415u128.to_le_bytes(),
        }
        .write(&mut data);
        let view = ColumnView::new(&data, &[19]);
        assert_eq!(
            decode_value(&col, &view, 0).unwrap(),
            Value::Decimal(BigDecimal::from_str("-314.15").unwrap())
        );
    }

    #[test]
    fn test_date_and_timestamp() {
        let date_col = column(SQL_TYPE_DATE, 10, 0);
        let mut data = vec![0u8; 6];
        DateStruct {
            year: 2020,
            month: 2,
            day: 29,
        }
        .write(&mut data);
        let view = ColumnView::new(&data, &[6]);
        assert_eq!(
            decode_value(&date_col, &view, 0).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())
        );

        let ts_col = column(SQL_TYPE_TIMESTAMP, 23, 3);
        let mut data = vec![0u8; 16];
        TimestampStruct {
            year: 2020,
            month: 2,
            day: 29,
            hour: 1,
            minute: 2,
            second: 3,
            fraction: 777_000_000,
        }
        .write(&mut data);
        let view = ColumnView::new(&data, &[16]);
        let expected = NaiveDate::from_ymd_opt(2020, 2, 29)
            .unwrap()
            .and_hms_micro_opt(1, 2, 3, 777_000)
            .unwrap();
        assert_eq!(
            decode_value(&ts_col, &view, 0).unwrap(),
            Value::Timestamp(expected)
        );
    }

    #[test]
    fn test_row_outside_block() {
        let col = column(SQL_INTEGER, 10, 0);
        let data = [0u8; 8];
        let view = ColumnView::new(&data, &[8]);
        assert!(matches!(
            decode_value(&col, &view, 1),
            Err(Error::Interface { .. })
        ));

        let view = ColumnView::new(&data[..4], &[8]);
        assert!(matches!(
            decode_value(&col, &view, 0),
            Err(Error::Interface { .. })
        ));
    }

    #[test]
    fn test_invalid_indicator() {
        let col = column(SQL_VARCHAR, 3, 0);
        let data = [0u8; 4];
        let view = ColumnView::new(&data, &[-7]);
        assert!(matches!(
            decode_value(&col, &view, 0),
            Err(Error::Interface { .. })
        ));
    }
}
