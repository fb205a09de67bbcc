// Per-window parsing (RFC 3284, Section 4.2).
//
// A window is one self-contained unit of the patch: its header fields plus
// the three raw section buffers (data, instructions, addresses).  All
// cross-validation between length fields happens here, before a single
// instruction is interpreted.

use std::io::{Read, Seek};

use bitflags::bitflags;

use crate::error::DecodeError;
use crate::reader::VcdReader;

/// Maximum decoded window size (matches xdelta3's hard limit).
pub const HARD_MAX_WINDOW_SIZE: u32 = 1 << 24; // 16 MiB

bitflags! {
    /// Window indicator bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowFields: u8 {
        /// Copy window taken from the source input stream.
        const SOURCE = 0x01;
        /// Copy window taken from bytes already emitted to the output.
        const TARGET = 0x02;
        /// A 4-byte Adler-32 checksum is present.
        const ADLER32 = 0x04;
    }
}

bitflags! {
    /// Delta indicator bits: per-section secondary compression.
    ///
    /// Always empty in practice — any set bit is rejected during parsing
    /// because compressed sections are not supported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompressedFields: u8 {
        const DATA = 0x01;
        const INSTRUCTIONS = 0x02;
        const ADDRESSES = 0x04;
    }
}

/// One parsed patch window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    /// Window indicator flags.
    pub fields: WindowFields,
    /// Length of the source segment COPY instructions may reference.
    pub source_segment_length: u32,
    /// Offset of the source segment in the input (or prior output).
    pub source_segment_offset: u32,
    /// Declared length of the delta encoding.  Retained for diagnostics;
    /// the original decoder does not cross-check it.
    pub delta_length: u32,
    /// Number of target bytes this window reconstructs.
    pub target_window_length: u32,
    /// Per-section compression flags (always empty).
    pub compressed_fields: CompressedFields,
    /// ADD/RUN literal bytes.
    pub data: Vec<u8>,
    /// Instruction opcodes and inline size varints.
    pub instructions: Vec<u8>,
    /// COPY address varints and SAME-cache bytes.
    pub addresses: Vec<u8>,
    /// Adler-32 of the reconstructed window, when present.
    pub checksum: Option<u32>,
}

impl Window {
    #[inline]
    pub fn has_source(&self) -> bool {
        self.fields.contains(WindowFields::SOURCE)
    }

    #[inline]
    pub fn has_target(&self) -> bool {
        self.fields.contains(WindowFields::TARGET)
    }

    #[inline]
    pub fn has_checksum(&self) -> bool {
        self.fields.contains(WindowFields::ADLER32)
    }

    /// Parse one window from the patch cursor.
    ///
    /// `output_len` is the number of bytes already emitted to the output
    /// stream; `Target`-relative segments must lie entirely within it.
    pub fn read<S: Read + Seek>(
        reader: &mut VcdReader<S>,
        output_len: u64,
    ) -> Result<Self, DecodeError> {
        let indicator = reader.read_byte()?;
        let fields = WindowFields::from_bits(indicator).ok_or(DecodeError::MalformedWindow(
            "unrecognized window indicator bits set",
        ))?;
        if fields.contains(WindowFields::SOURCE | WindowFields::TARGET) {
            return Err(DecodeError::MalformedWindow(
                "unrecognized window indicator bits set",
            ));
        }

        let (source_segment_length, source_segment_offset) =
            if fields.intersects(WindowFields::SOURCE | WindowFields::TARGET) {
                let len = reader.read_u32()?;
                let offset = reader.read_u32()?;
                let end = u64::from(offset) + u64::from(len);
                if end > u64::from(u32::MAX) {
                    return Err(DecodeError::OffsetOverflow);
                }
                if fields.contains(WindowFields::TARGET) && end > output_len {
                    return Err(DecodeError::TargetWindowOutOfBounds);
                }
                (len, offset)
            } else {
                (0, 0)
            };

        let delta_length = reader.read_u32()?;

        let target_window_length = reader.read_u32()?;
        if u64::from(source_segment_length) + u64::from(target_window_length)
            > u64::from(u32::MAX)
        {
            return Err(DecodeError::TargetOverflow);
        }
        if target_window_length > HARD_MAX_WINDOW_SIZE {
            return Err(DecodeError::HardWindowSizeExceeded);
        }

        let delta_indicator = reader.read_byte()?;
        let compressed_fields =
            CompressedFields::from_bits(delta_indicator).ok_or(DecodeError::MalformedWindow(
                "unrecognized delta indicator bits set",
            ))?;
        if !compressed_fields.is_empty() {
            return Err(DecodeError::UnsupportedFeature(
                "invalid delta indicator bits set",
            ));
        }

        let data_length = reader.read_u32()?;
        let instructions_length = reader.read_u32()?;
        let addresses_length = reader.read_u32()?;

        // The checksum precedes the section buffers in the wire layout.
        let checksum = if fields.contains(WindowFields::ADLER32) {
            Some(reader.read_u32_be()?)
        } else {
            None
        };

        let data = reader.read_bytes(data_length)?;
        let instructions = reader.read_bytes(instructions_length)?;
        let addresses = reader.read_bytes(addresses_length)?;

        Ok(Self {
            fields,
            source_segment_length,
            source_segment_offset,
            delta_length,
            target_window_length,
            compressed_fields,
            data,
            instructions,
            addresses,
            checksum,
        })
    }
}
