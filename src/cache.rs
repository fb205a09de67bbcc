// VCDIFF address cache (RFC 3284, Section 5.3).
//
// COPY addresses are compressed with two complementary caches: NEAR holds
// the last four resolved addresses in a round-robin ring, SAME maps each
// address into one of 3*256 low-byte buckets.  Together with the SELF and
// HERE modes this gives the nine address modes of the default code table.
//
// The cache lives on the decoder and accumulates across windows; it is
// zeroed once at construction, not per window.

use crate::error::DecodeError;
use crate::section::SectionReader;

/// Absolute address follows as a varint.
pub const MODE_SELF: u8 = 0;
/// Distance back from the current position follows as a varint.
pub const MODE_HERE: u8 = 1;

/// NEAR ring size for the default code table.
const NEAR_SLOTS: usize = 4;
/// SAME bucket groups for the default code table.
const SAME_GROUPS: usize = 3;

/// NEAR/SAME cache state for COPY address decoding.
#[derive(Clone)]
pub struct AddressCache {
    near: [u32; NEAR_SLOTS],
    same: Vec<u32>,
    next_slot: usize,
}

impl AddressCache {
    pub fn new() -> Self {
        Self {
            near: [0; NEAR_SLOTS],
            same: vec![0; SAME_GROUPS * 256],
            next_slot: 0,
        }
    }

    /// First SAME mode index.
    #[inline]
    fn same_start() -> u8 {
        (2 + NEAR_SLOTS) as u8
    }

    /// Total number of address modes (2 + near + same).
    #[inline]
    pub fn mode_count() -> u8 {
        (2 + NEAR_SLOTS + SAME_GROUPS) as u8
    }

    /// Record a resolved address in both caches.
    #[inline]
    pub fn update(&mut self, addr: u32) {
        self.near[self.next_slot] = addr;
        self.next_slot = (self.next_slot + 1) % NEAR_SLOTS;
        let idx = addr as usize % (SAME_GROUPS * 256);
        self.same[idx] = addr;
    }

    /// Resolve one COPY address.
    ///
    /// `here` is the current position in the window's address space: the
    /// source segment length plus the target bytes produced so far.  The
    /// resolved address is always strictly below `here`.
    pub fn decode(
        &mut self,
        mode: u8,
        addresses: &mut SectionReader<'_>,
        here: u32,
    ) -> Result<u32, DecodeError> {
        let addr = match mode {
            MODE_SELF => addresses.read_u32()?,
            MODE_HERE => {
                let distance = addresses.read_u32()?;
                here.checked_sub(distance).ok_or_else(|| invalid_addr(mode))?
            }
            _ if mode < Self::same_start() => {
                let delta = addresses.read_u32()?;
                self.near[usize::from(mode - 2)]
                    .checked_add(delta)
                    .ok_or_else(|| invalid_addr(mode))?
            }
            _ if mode < Self::mode_count() => {
                let group = usize::from(mode - Self::same_start());
                let byte = usize::from(addresses.read_byte()?);
                self.same[group * 256 + byte]
            }
            _ => return Err(invalid_addr(mode)),
        };

        if addr >= here {
            return Err(invalid_addr(mode));
        }

        self.update(addr);
        Ok(addr)
    }
}

impl Default for AddressCache {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_addr(mode: u8) -> DecodeError {
    DecodeError::MalformedInstructionStream(format!("invalid COPY address (mode {mode})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(cache: &mut AddressCache, mode: u8, bytes: &[u8], here: u32) -> u32 {
        let mut section = SectionReader::new("addresses", bytes);
        cache.decode(mode, &mut section, here).unwrap()
    }

    #[test]
    fn default_mode_layout() {
        assert_eq!(AddressCache::mode_count(), 9);
        assert_eq!(AddressCache::same_start(), 6);
    }

    #[test]
    fn self_mode_is_absolute() {
        let mut c = AddressCache::new();
        assert_eq!(decode_one(&mut c, MODE_SELF, &[0x2A], 1000), 42);
    }

    #[test]
    fn here_mode_subtracts_distance() {
        let mut c = AddressCache::new();
        assert_eq!(decode_one(&mut c, MODE_HERE, &[0x0A], 1000), 990);
    }

    #[test]
    fn here_mode_rejects_distance_past_start() {
        let mut c = AddressCache::new();
        let mut section = SectionReader::new("addresses", &[0x7F]);
        assert!(c.decode(MODE_HERE, &mut section, 10).is_err());
    }

    #[test]
    fn near_mode_adds_to_cached_slot() {
        let mut c = AddressCache::new();
        c.update(500_000); // lands in near slot 0
        // Mode 2 reads slot 0; delta 5 -> 500_005.
        let addr = decode_one(&mut c, 2, &[0x05], 1_000_000);
        assert_eq!(addr, 500_005);
    }

    #[test]
    fn same_mode_reads_single_raw_byte() {
        let mut c = AddressCache::new();
        c.update(100); // same bucket 100, group 0
        let mut section = SectionReader::new("addresses", &[100]);
        let addr = c.decode(6, &mut section, 1000).unwrap();
        assert_eq!(addr, 100);
        assert_eq!(section.remaining(), 0);
    }

    #[test]
    fn same_mode_upper_groups() {
        let mut c = AddressCache::new();
        c.update(256 + 7); // group 1, bucket 7
        assert_eq!(decode_one(&mut c, 7, &[7], 1000), 263);
    }

    #[test]
    fn near_ring_is_circular() {
        let mut c = AddressCache::new();
        for i in 0..5u32 {
            c.update(i * 100);
        }
        assert_eq!(c.near, [400, 100, 200, 300]);
    }

    #[test]
    fn resolved_address_must_precede_here() {
        let mut c = AddressCache::new();
        let mut section = SectionReader::new("addresses", &[0x2A]);
        let err = c.decode(MODE_SELF, &mut section, 42).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedInstructionStream(_)));
    }

    #[test]
    fn decode_updates_both_caches() {
        let mut c = AddressCache::new();
        decode_one(&mut c, MODE_SELF, &[0x64], 1000); // 100
        assert_eq!(c.near[0], 100);
        assert_eq!(c.same[100], 100);
        // The next decode can reach 100 through the SAME cache.
        assert_eq!(decode_one(&mut c, 6, &[100], 1000), 100);
    }

    #[test]
    fn empty_address_section_is_malformed() {
        let mut c = AddressCache::new();
        let mut section = SectionReader::new("addresses", &[]);
        assert!(matches!(
            c.decode(MODE_SELF, &mut section, 10),
            Err(DecodeError::MalformedInstructionStream(_))
        ));
    }
}
