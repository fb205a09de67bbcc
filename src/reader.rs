// Byte cursor over the patch stream.
//
// Every patch field is pulled through this reader: raw bytes, base-128
// integers, and the big-endian window checksum.  Bounds and overflow
// violations surface as typed `DecodeError`s rather than raw I/O errors.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::DecodeError;
use crate::varint::{MAX_VARINT_LEN, U32_OVERFLOW_MASK};

/// Largest byte count a single `read_bytes` call may request.
const MAX_READ_BYTES: u32 = i32::MAX as u32;

/// Cursor-style reader for VCDIFF fields.
///
/// Wraps any `Read + Seek` stream; pass `&mut stream` to keep ownership at
/// the call site.  The reader never closes the underlying stream.
pub struct VcdReader<S> {
    stream: S,
}

impl<S: Read + Seek> VcdReader<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read the next byte, failing on end-of-data.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let mut buf = [0u8; 1];
        self.stream.read_exact(&mut buf).map_err(map_eof)?;
        Ok(buf[0])
    }

    /// Read exactly `count` raw bytes.
    ///
    /// Counts above the representable maximum are rejected before the
    /// stream is touched.
    pub fn read_bytes(&mut self, count: u32) -> Result<Vec<u8>, DecodeError> {
        if count > MAX_READ_BYTES {
            return Err(DecodeError::InvalidLength);
        }
        let mut buf = vec![0u8; count as usize];
        self.stream.read_exact(&mut buf).map_err(map_eof)?;
        Ok(buf)
    }

    /// Decode a base-128 unsigned integer (at most five groups).
    ///
    /// Overflow is checked incrementally: a fifth byte whose top bits would
    /// carry into bit 32 fails on that byte, and a sixth group fails before
    /// it is read from the stream.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut val: u32 = 0;
        let mut groups = 0usize;
        loop {
            if groups == MAX_VARINT_LEN {
                return Err(DecodeError::IntegerOverflow);
            }
            groups += 1;
            let byte = self.read_byte()?;
            if val & U32_OVERFLOW_MASK != 0 {
                return Err(DecodeError::IntegerOverflow);
            }
            val = (val << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(val);
            }
        }
    }

    /// Read a big-endian `u32` (window checksum field).
    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        self.stream.read_exact(&mut buf).map_err(map_eof)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Whether any bytes remain before end-of-stream.
    pub fn has_remaining(&mut self) -> Result<bool, DecodeError> {
        let pos = self.stream.stream_position()?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        if pos != end {
            self.stream.seek(SeekFrom::Start(pos))?;
        }
        Ok(pos < end)
    }

    /// Current stream position.
    pub fn position(&mut self) -> Result<u64, DecodeError> {
        Ok(self.stream.stream_position()?)
    }
}

fn map_eof(e: io::Error) -> DecodeError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEndOfData
    } else {
        DecodeError::Io(e)
    }
}
