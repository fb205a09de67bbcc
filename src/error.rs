// Decoder error type.
//
// One closed enum for everything that can go wrong while applying a patch.
// The `Display` strings for format violations are a stable contract: tests
// (and callers that relay diagnostics) match on them verbatim.

use std::io;

use thiserror::Error;

/// Errors raised while decoding a VCDIFF patch.
///
/// Two families: *malformed input* (the patch violates the format) and
/// *unsupported features* (the patch is legal VCDIFF but uses something
/// this decoder does not implement — see [`DecodeError::is_unsupported`]).
/// Both are unrecoverable for the current decode; no variant is retryable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The first three bytes are not the VCDIFF magic `D6 C3 C4`.
    #[error("not a VCDIFF input")]
    BadMagic,

    /// The version byte after the magic is nonzero.
    #[error("VCDIFF input version > 0 is not supported")]
    UnsupportedVersion,

    /// The header indicator byte has bits outside `0x01 | 0x02 | 0x04` set.
    #[error("unrecognized header indicator bits set")]
    MalformedHeader,

    /// A window or delta indicator byte has unrecognized bits set, or the
    /// window indicator combines mutually exclusive bits.
    #[error("{0}")]
    MalformedWindow(&'static str),

    /// `source_segment_offset + source_segment_length` exceeds a 32-bit
    /// file offset.
    #[error("decoder copy window overflows a file offset")]
    OffsetOverflow,

    /// A `Target`-relative segment references bytes past what has been
    /// emitted to the output stream.
    #[error("VCD_TARGET window out of bounds")]
    TargetWindowOutOfBounds,

    /// `source_segment_length + target_window_length` exceeds `u32::MAX`.
    #[error("decoder target window overflows a UInt32")]
    TargetOverflow,

    /// `target_window_length` exceeds the hard decoder limit.
    #[error("Hard window size exceeded")]
    HardWindowSizeExceeded,

    /// A base-128 integer used more than five groups or carried into bit 32.
    #[error("overflow in decode_integer")]
    IntegerOverflow,

    /// A raw-byte read was requested with an unrepresentable count.
    #[error("trying to read more than the maximum representable byte count")]
    InvalidLength,

    /// The patch stream ended in the middle of a field.
    #[error("unexpected end of data")]
    UnexpectedEndOfData,

    /// An instruction's size or address reads past its section buffer, or
    /// a COPY resolves to an invalid address.
    #[error("malformed instruction stream: {0}")]
    MalformedInstructionStream(String),

    /// The instructions of a window did not produce exactly
    /// `target_window_length` bytes.
    #[error("target window length mismatch: expected {expected}, produced {actual}")]
    WindowLengthMismatch { expected: u32, actual: u64 },

    /// The window's Adler-32 checksum does not match the reconstructed bytes.
    #[error("checksum mismatch: expected {expected:#010X}, got {actual:#010X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Legal VCDIFF feature this decoder does not implement (secondary
    /// compression, custom code tables, compressed window sections).
    #[error("{0}")]
    UnsupportedFeature(&'static str),

    /// Underlying stream failure other than a clean end-of-data.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// True for patches that are valid VCDIFF but exceed this decoder's
    /// feature set, as opposed to byte-level corruption.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DecodeError::UnsupportedFeature(_))
    }
}
