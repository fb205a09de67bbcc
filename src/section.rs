// Cursor over one window section buffer.
//
// The three section buffers (data, instructions, addresses) are fully read
// into memory by the window parser; the interpreter then walks them with
// these cursors so every bounds check stays local to the section.

use crate::error::DecodeError;
use crate::varint::{self, VarintError};

/// Byte cursor over a single section slice.
pub struct SectionReader<'a> {
    name: &'static str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn new(name: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            bytes,
            pos: 0,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Read one raw byte.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| self.underflow())?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a contiguous run of `len` bytes.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.underflow())?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Decode a base-128 `u32` from the section.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        match varint::decode_u32(&self.bytes[self.pos..]) {
            Ok((val, used)) => {
                self.pos += used;
                Ok(val)
            }
            Err(VarintError::Overflow) => Err(DecodeError::IntegerOverflow),
            Err(VarintError::Underflow) => Err(self.underflow()),
        }
    }

    fn underflow(&self) -> DecodeError {
        DecodeError::MalformedInstructionStream(format!("{} section underflow", self.name))
    }
}
