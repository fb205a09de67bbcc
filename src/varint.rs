// VCDIFF variable-length integer decoding (RFC 3284, Section 2).
//
// Base-128, big-endian: most-significant group first.  Each byte has bit 7
// set except the final byte.  This crate targets the 32-bit format profile,
// so a value occupies at most five groups.

/// Maximum encoded length for a 32-bit value (ceil(32/7) = 5).
pub const MAX_VARINT_LEN: usize = 5;

/// Overflow guard for the 32-bit accumulator: if any of these bits are set
/// before a shift, the next `<< 7` would carry past bit 31.
pub(crate) const U32_OVERFLOW_MASK: u32 = 0xFE00_0000;

/// Outcome of a slice decode that could not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The slice ended before a byte with the continuation bit clear.
    Underflow,
    /// More than five groups, or the accumulated value carried into bit 32.
    Overflow,
}

/// Decode a `u32` from a byte slice.
///
/// Returns `(value, bytes_consumed)`.  Overflow is detected incrementally:
/// the accumulator is masked before every shift, and a sixth continuation
/// group fails without being consumed.
pub fn decode_u32(data: &[u8]) -> Result<(u32, usize), VarintError> {
    let mut val: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        if val & U32_OVERFLOW_MASK != 0 {
            return Err(VarintError::Overflow);
        }
        val = (val << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }
    // Ran out of bytes. Five full continuation groups is an overflow (a
    // sixth group would be required); anything shorter is a truncation.
    if data.len() >= MAX_VARINT_LEN {
        Err(VarintError::Overflow)
    } else {
        Err(VarintError::Underflow)
    }
}
