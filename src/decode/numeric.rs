//! `SQL_NUMERIC_STRUCT` decoder.
//!
//! Layout (19 bytes):
//! - precision: u8
//! - scale: i8
//! - sign: u8, 1 = positive, 0 = negative
//! - val: 16 bytes, little-endian unsigned magnitude
//!
//! The value is `(-1)^(1 - sign) * val * 10^(-scale)`. Decoding goes straight to
//! a [`BigDecimal`], so the full 38 digits a driver can deliver survive.

use bigdecimal::BigDecimal;
use bytes::{Buf, BufMut};
use num_bigint::{BigInt, Sign};

/// Native fixed-point layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericStruct {
    pub precision: u8,
    pub scale: i8,
    pub sign: u8,
    pub val: [u8; 16],
}

impl NumericStruct {
    /// Size of the struct in bytes.
    pub const SIZE: usize = 19;

    /// Read from the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn read(cell: &[u8]) -> Self {
        let mut buf = cell;
        let precision = buf.get_u8();
        let scale = buf.get_i8();
        let sign = buf.get_u8();
        let mut val = [0u8; 16];
        buf.copy_to_slice(&mut val);
        Self {
            precision,
            scale,
            sign,
            val,
        }
    }

    /// Write into the start of `cell`, which must hold at least [`Self::SIZE`] bytes.
    pub fn write(&self, cell: &mut [u8]) {
        let mut buf = cell;
        buf.put_u8(self.precision);
        buf.put_i8(self.scale);
        buf.put_u8(self.sign);
        buf.put_slice(&self.val);
    }

    /// Encode `value` at the given scale. Digits beyond the scale are cut off.
    ///
    /// Returns `None` when the magnitude does not fit into 16 bytes.
    pub fn from_decimal(value: &BigDecimal, precision: u8, scale: i8) -> Option<Self> {
        let (digits, _) = value.with_scale(scale as i64).as_bigint_and_exponent();
        let magnitude = digits.magnitude().to_bytes_le();
        if magnitude.len() > 16 {
            return None;
        }
        let mut val = [0u8; 16];
        val[..magnitude.len()].copy_from_slice(&magnitude);
        Some(Self {
            precision,
            scale,
            sign: if digits.sign() == Sign::Minus { 0 } else { 1 },
            val,
        })
    }

    /// Convert to a decimal with the struct's scale.
    pub fn to_decimal(&self) -> BigDecimal {
        let sign = if self.sign == 0 { Sign::Minus } else { Sign::Plus };
        let digits = BigInt::from_bytes_le(sign, &self.val);
        BigDecimal::new(digits, self.scale as i64)
    }
}
