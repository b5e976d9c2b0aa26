//! Date and timestamp struct decoders.
//!
//! Both structs are laid out in native byte order:
//!
//! `DATE_STRUCT` (6 bytes):
//! - year: i16
//! - month: u16
//! - day: u16
//!
//! `TIMESTAMP_STRUCT` (16 bytes):
//! - year: i16
//! - month, day, hour, minute, second: u16
//! - 2 bytes padding
//! - fraction: u32, nanoseconds
//!
//! Timestamps decode to microsecond precision: the nanosecond fraction is
//! divided by [`NANOS_PER_MICRO`] and the remainder is dropped.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Conversion factor from the driver's fraction unit to the decoded one.
pub const NANOS_PER_MICRO: u32 = 1_000;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Native date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateStruct {
    pub year: i16,
    pub month: u16,
    pub day: u16,
}

impl DateStruct {
    /// Size of the struct in bytes.
    pub const SIZE: usize = 6;

    /// Read from the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn read(cell: &[u8]) -> Self {
        let mut buf = cell;
        Self {
            year: buf.get_i16_ne(),
            month: buf.get_u16_ne(),
            day: buf.get_u16_ne(),
        }
    }

    /// Write into the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn write(&self, cell: &mut [u8]) {
        let mut buf = cell;
        buf.put_i16_ne(self.year);
        buf.put_u16_ne(self.month);
        buf.put_u16_ne(self.day);
    }

    /// Build the struct from a date.
    pub fn from_date(date: &NaiveDate) -> Self {
        Self {
            year: date.year() as i16,
            month: date.month() as u16,
            day: date.day() as u16,
        }
    }

    /// Convert to a date, failing on out-of-range fields.
    pub fn to_date(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32).ok_or_else(
            || {
                Error::data(format!(
                    "Invalid DATE: year={}, month={}, day={}",
                    self.year, self.month, self.day
                ))
            },
        )
    }
}

/// Native timestamp layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimestampStruct {
    pub year: i16,
    pub month: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    /// Fractional second in nanoseconds.
    pub fraction: u32,
}

impl TimestampStruct {
    /// Size of the struct in bytes, padding included.
    pub const SIZE: usize = 16;

    /// Read from the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn read(cell: &[u8]) -> Self {
        let mut buf = cell;
        let year = buf.get_i16_ne();
        let month = buf.get_u16_ne();
        let day = buf.get_u16_ne();
        let hour = buf.get_u16_ne();
        let minute = buf.get_u16_ne();
        let second = buf.get_u16_ne();
        buf.advance(2);
        let fraction = buf.get_u32_ne();
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            fraction,
        }
    }

    /// Write into the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn write(&self, cell: &mut [u8]) {
        let mut buf = cell;
        buf.put_i16_ne(self.year);
        buf.put_u16_ne(self.month);
        buf.put_u16_ne(self.day);
        buf.put_u16_ne(self.hour);
        buf.put_u16_ne(self.minute);
        buf.put_u16_ne(self.second);
        buf.put_bytes(0, 2);
        buf.put_u32_ne(self.fraction);
    }

    /// Build the struct from a timestamp.
    pub fn from_datetime(ts: &NaiveDateTime) -> Self {
        Self {
            year: ts.year() as i16,
            month: ts.month() as u16,
            day: ts.day() as u16,
            hour: ts.hour() as u16,
            minute: ts.minute() as u16,
            second: ts.second() as u16,
            fraction: ts.nanosecond(),
        }
    }

    /// Convert to a timestamp, truncated to microseconds.
    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        if self.fraction >= NANOS_PER_SECOND {
            return Err(Error::data(format!(
                "Invalid TIMESTAMP fraction: {} ns",
                self.fraction
            )));
        }
        let date = DateStruct {
            year: self.year,
            month: self.month,
            day: self.day,
        }
        .to_date()?;
        let micros = self.fraction / NANOS_PER_MICRO;
        date.and_hms_micro_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            micros,
        )
        .ok_or_else(|| {
            Error::data(format!(
                "Invalid TIME: hour={}, minute={}, second={}",
                self.hour, self.minute, self.second
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp(fraction: u32) -> TimestampStruct {
        TimestampStruct {
            year: 2016,
            month: 12,
            day: 25,
            hour: 14,
            minute: 42,
            second: 7,
            fraction,
        }
    }

    #[test]
    fn test_decode_date() {
        let mut cell = [0u8; DateStruct::SIZE];
        DateStruct {
            year: 1986,
            month: 1,
            day: 28,
        }
        .write(&mut cell);

        let date = DateStruct::read(&cell).to_date().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1986, 1, 28).unwrap());
    }

    #[test]
    fn test_decode_date_invalid_month() {
        let ds = DateStruct {
            year: 2024,
            month: 13,
            day: 1,
        };
        assert!(matches!(ds.to_date(), Err(Error::Data { .. })));
    }

    #[test]
    fn test_decode_timestamp_milliseconds() {
        // 777 ms arrive as 777_000_000 ns and must come out as 777_000 us.
        let mut cell = [0u8; TimestampStruct::SIZE];
        timestamp(777_000_000).write(&mut cell);

        let ts = TimestampStruct::read(&cell).to_datetime().unwrap();
        let expected = NaiveDate::from_ymd_opt(2016, 12, 25)
            .unwrap()
            .and_hms_micro_opt(14, 42, 7, 777_000)
            .unwrap();
        assert_eq!(ts, expected);
        assert_eq!(ts.nanosecond() / NANOS_PER_MICRO, 777_000);
    }

    #[test]
    fn test_decode_timestamp_truncates_below_microseconds() {
        let ts = timestamp(123_456_789).to_datetime().unwrap();
        assert_eq!(ts.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_decode_timestamp_whole_seconds() {
        let ts = timestamp(0).to_datetime().unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2016, 12, 25)
                .unwrap()
                .and_hms_opt(14, 42, 7)
                .unwrap()
        );
    }

    #[test]
    fn test_decode_timestamp_invalid() {
        assert!(timestamp(NANOS_PER_SECOND).to_datetime().is_err());

        let mut ts = timestamp(0);
        ts.hour = 24;
        assert!(matches!(ts.to_datetime(), Err(Error::Data { .. })));
    }

    #[test]
    fn test_timestamp_layout() {
        let mut cell = [0xAAu8; TimestampStruct::SIZE];
        timestamp(1).write(&mut cell);
        assert_eq!(&cell[12..16], &1u32.to_ne_bytes());
        assert_eq!(&cell[10..12], &7u16.to_ne_bytes());
        assert_eq!(&cell[0..2], &2016i16.to_ne_bytes());
    }
}
