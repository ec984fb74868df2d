//! EBML variable-length integers.
//!
//! The first byte carries a length marker: the position of its highest set
//! bit gives the total length in bytes.
//!
//! ```text
//! 1xxx xxxx                      1 byte,  7 data bits
//! 01xx xxxx xxxx xxxx            2 bytes, 14 data bits
//! 001x xxxx ...                  3 bytes, 21 data bits
//! 0000 0001 xxxx ... (7 more)    8 bytes, 56 data bits
//! ```
//!
//! Element IDs keep the marker bit. Sizes strip it, and a size whose data
//! bits are all ones means "unknown". Signed var-ints (EBML lace deltas)
//! are stored with a bias of `2^(7·len − 1) − 1`.

use crate::error::{EbmlError, Result};

/// Longest var-int EBML allows.
pub const MAX_VAR_INT_LEN: usize = 8;

/// A decoded var-int and the number of bytes it occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt {
    /// Decoded value; `None` is the reserved "unknown size" pattern.
    pub value: Option<i64>,
    /// Encoded length in bytes.
    pub len: usize,
}

/// Total var-int length announced by a leading byte.
pub fn var_int_len(first: u8) -> Result<usize> {
    match first.leading_zeros() as usize {
        n if n < MAX_VAR_INT_LEN => Ok(n + 1),
        _ => Err(EbmlError::InvalidVarInt(first)),
    }
}

/// Read one var-int from the front of `data`.
///
/// `keep_marker_bits` leaves the length marker in the value (element IDs).
/// `signed` applies the EBML signed bias instead of the unknown-size check.
/// Asking for both is an error.
pub fn read_var_int(data: &[u8], signed: bool, keep_marker_bits: bool) -> Result<VarInt> {
    if signed && keep_marker_bits {
        return Err(EbmlError::ContradictoryVarInt);
    }

    let first = *data.first().ok_or(EbmlError::Incomplete { needed: 1 })?;
    let len = var_int_len(first)?;
    if data.len() < len {
        return Err(EbmlError::Incomplete {
            needed: len - data.len(),
        });
    }

    let lead = if keep_marker_bits {
        first
    } else {
        first & !(0x80u8 >> (len - 1))
    };
    let raw = data[1..len]
        .iter()
        .fold(lead as u64, |acc, &b| (acc << 8) | b as u64);

    let data_bits = 7 * len as u32;
    let value = if signed {
        let bias = (1i64 << (data_bits - 1)) - 1;
        Some(raw as i64 - bias)
    } else if !keep_marker_bits && raw == (1u64 << data_bits) - 1 {
        None
    } else {
        Some(raw as i64)
    };

    Ok(VarInt { value, len })
}

/// Read an element ID (marker bits kept). IDs are at most 4 bytes.
pub fn read_element_id(data: &[u8]) -> Result<(u32, usize)> {
    let vint = read_var_int(data, false, true)?;
    if vint.len > 4 {
        return Err(EbmlError::IdTooLong(vint.len));
    }
    // A marker-kept value is never the unknown pattern.
    Ok((vint.value.unwrap_or_default() as u32, vint.len))
}

/// Read an element data size. `None` means unknown size.
pub fn read_element_size(data: &[u8]) -> Result<(Option<u64>, usize)> {
    let vint = read_var_int(data, false, false)?;
    Ok((vint.value.map(|v| v as u64), vint.len))
}

/// Read an unsigned var-int that may not use the unknown pattern.
pub fn read_unsigned_var_int(data: &[u8]) -> Result<(u64, usize)> {
    let vint = read_var_int(data, false, false)?;
    match vint.value {
        Some(v) => Ok((v as u64, vint.len)),
        None => Err(EbmlError::malformed_block("reserved var-int value")),
    }
}

/// Read a bias-corrected signed var-int.
pub fn read_signed_var_int(data: &[u8]) -> Result<(i64, usize)> {
    let vint = read_var_int(data, true, false)?;
    Ok((vint.value.unwrap_or_default(), vint.len))
}

/// Smallest length that can hold `value` as a size without hitting the
/// unknown pattern.
pub fn size_len(value: u64) -> usize {
    (1..=MAX_VAR_INT_LEN)
        .find(|&len| value < (1u64 << (7 * len)) - 1)
        .unwrap_or(MAX_VAR_INT_LEN)
}

/// Encode `raw` as a var-int of exactly `len` bytes (marker added).
pub fn encode_var_int(raw: u64, len: usize) -> Vec<u8> {
    debug_assert!((1..=MAX_VAR_INT_LEN).contains(&len));
    let marked = raw | (1u64 << (7 * len));
    marked.to_be_bytes()[MAX_VAR_INT_LEN - len..].to_vec()
}

/// Encode an element size using the shortest length.
pub fn encode_size(value: u64) -> Vec<u8> {
    encode_var_int(value, size_len(value))
}

/// The unknown-size pattern of the given length.
pub fn encode_unknown_size(len: usize) -> Vec<u8> {
    encode_var_int((1u64 << (7 * len)) - 1, len)
}

/// Encode a signed value as a biased var-int of `len` bytes.
pub fn encode_signed(value: i64, len: usize) -> Vec<u8> {
    let bias = (1i64 << (7 * len - 1)) - 1;
    encode_var_int((value + bias) as u64, len)
}

/// Encode an element ID (IDs already contain their marker).
pub fn encode_id(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = (id.leading_zeros() / 8).min(3) as usize;
    bytes[skip..].to_vec()
}
