//! Narrow and wide text decoders.
//!
//! Lengths always come from the driver (indicator or reported name length);
//! buffers are never scanned for a terminator, since wide text can contain zero
//! code units that are not terminators.

use crate::driver::DescribedColumn;
use crate::error::{Error, Result};
use bytes::Buf;
use widestring::U16Str;

/// Decode single-byte text, one character per byte (ISO-8859-1).
pub fn decode_narrow(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode UTF-16 text stored as native-endian code units.
///
/// A trailing odd byte is ignored.
pub fn decode_wide(bytes: &[u8]) -> Result<String> {
    let mut buf = bytes;
    let mut units = Vec::with_capacity(bytes.len() / 2);
    while buf.remaining() >= 2 {
        units.push(buf.get_u16_ne());
    }
    U16Str::from_slice(&units)
        .to_string()
        .map_err(|e| Error::data(format!("Invalid UTF-16 text: {}", e)))
}

/// Encode text as native-endian UTF-16 bytes.
pub fn encode_wide(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_ne_bytes).collect()
}

/// Decode a column name from the driver's fixed-capacity name buffer.
///
/// The reported length decides how many code units belong to the name. When it
/// exceeds the buffer the name was truncated by the driver.
pub fn decode_column_name(described: &DescribedColumn) -> String {
    let capacity = described.name.len();
    let reported = described.name_length.max(0) as usize;
    if reported > capacity {
        log::warn!(
            "Column name was truncated from {} to {} characters",
            reported,
            capacity
        );
    }
    U16Str::from_slice(&described.name[..reported.min(capacity)]).to_string_lossy()
}
