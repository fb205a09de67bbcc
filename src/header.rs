// VCDIFF file header parsing (RFC 3284, Section 4.1).
//
// The header is parsed eagerly when a `Decoder` is constructed; any
// violation fails before the first window is looked at.

use std::io::{Read, Seek};

use crate::error::DecodeError;
use crate::reader::VcdReader;

/// VCDIFF magic bytes followed by the version byte.
pub const VCDIFF_MAGIC: [u8; 4] = [0xD6, 0xC3, 0xC4, 0x00];

/// Header indicator: a secondary compressor is in use.
pub const VCD_SECONDARY: u8 = 1 << 0;
/// Header indicator: an application-defined code table follows.
pub const VCD_CODETABLE: u8 = 1 << 1;
/// Header indicator: an application data blob follows.
pub const VCD_APPHEADER: u8 = 1 << 2;
/// Mask of invalid header indicator bits.
const VCD_INVHDR: u8 = !(VCD_SECONDARY | VCD_CODETABLE | VCD_APPHEADER);

/// Parsed patch header.
///
/// Immutable once built.  Patches declaring a secondary compressor or a
/// custom code table never produce a `Header` — parsing fails first — so
/// the only payload is the optional application data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Application-defined data blob, decoded as text.
    pub application_data: Option<String>,
}

impl Header {
    /// Parse the 4-byte magic/version prefix, the indicator byte, and the
    /// optional application data.
    pub fn read<S: Read + Seek>(reader: &mut VcdReader<S>) -> Result<Self, DecodeError> {
        let magic = reader.read_bytes(4)?;
        if magic[..3] != VCDIFF_MAGIC[..3] {
            return Err(DecodeError::BadMagic);
        }
        if magic[3] != 0x00 {
            return Err(DecodeError::UnsupportedVersion);
        }

        let indicator = reader.read_byte()?;
        if indicator & VCD_INVHDR != 0 {
            return Err(DecodeError::MalformedHeader);
        }
        if indicator & VCD_SECONDARY != 0 {
            return Err(DecodeError::UnsupportedFeature(
                "unavailable secondary compressor",
            ));
        }
        if indicator & VCD_CODETABLE != 0 {
            return Err(DecodeError::UnsupportedFeature(
                "compressed code table not implemented",
            ));
        }

        let application_data = if indicator & VCD_APPHEADER != 0 {
            let len = reader.read_u32()?;
            let data = reader.read_bytes(len)?;
            Some(String::from_utf8_lossy(&data).into_owned())
        } else {
            None
        };

        Ok(Self { application_data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(bytes: &[u8]) -> Result<Header, DecodeError> {
        Header::read(&mut VcdReader::new(Cursor::new(bytes)))
    }

    #[test]
    fn minimal_header() {
        let hdr = parse(&[0xD6, 0xC3, 0xC4, 0x00, 0x00]).unwrap();
        assert_eq!(hdr.application_data, None);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = parse(&[0x00, 0xAA, 0xBB, 0xCC]).unwrap_err();
        assert_eq!(err.to_string(), "not a VCDIFF input");
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = parse(&[0xD6, 0xC3, 0xC4, 0x01]).unwrap_err();
        assert_eq!(err.to_string(), "VCDIFF input version > 0 is not supported");
    }

    #[test]
    fn rejects_invalid_indicator_bits() {
        for indicator in [0xF8u8, 0x48] {
            let err = parse(&[0xD6, 0xC3, 0xC4, 0x00, indicator]).unwrap_err();
            assert_eq!(err.to_string(), "unrecognized header indicator bits set");
        }
    }

    #[test]
    fn rejects_secondary_compressor() {
        let err = parse(&[0xD6, 0xC3, 0xC4, 0x00, 0x01]).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "unavailable secondary compressor");
    }

    #[test]
    fn rejects_code_table() {
        let err = parse(&[0xD6, 0xC3, 0xC4, 0x00, 0x02]).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "compressed code table not implemented");
    }

    #[test]
    fn reads_application_data() {
        let mut bytes = vec![0xD6, 0xC3, 0xC4, 0x00, 0x04, 0x07];
        bytes.extend_from_slice(b"patched");
        let hdr = parse(&bytes).unwrap();
        assert_eq!(hdr.application_data.as_deref(), Some("patched"));
    }

    #[test]
    fn truncated_application_data() {
        let bytes = [0xD6, 0xC3, 0xC4, 0x00, 0x04, 0x07, b'x'];
        assert!(matches!(
            parse(&bytes),
            Err(DecodeError::UnexpectedEndOfData)
        ));
    }

    #[test]
    fn parsing_is_idempotent() {
        let mut bytes = vec![0xD6, 0xC3, 0xC4, 0x00, 0x04, 0x05];
        bytes.extend_from_slice(b"hello");
        assert_eq!(parse(&bytes).unwrap(), parse(&bytes).unwrap());
    }
}
