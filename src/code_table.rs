// VCDIFF default code table (RFC 3284, Section 5.6).
//
// Maps each of the 256 opcode bytes to one or two instruction slots.
// Custom and compressed tables are rejected at the header stage, so this
// table is the only one the interpreter ever consults.

use std::sync::LazyLock;

/// Instruction type tags.  COPY modes are folded into the type byte as
/// `INST_COPY + mode` (modes 0..8 for the default table).
pub const INST_NOOP: u8 = 0;
pub const INST_ADD: u8 = 1;
pub const INST_RUN: u8 = 2;
pub const INST_COPY: u8 = 3;

/// Minimum COPY match length encodable with an implicit size.
const MIN_COPY_SIZE: u8 = 4;

/// One slot pair of the code table.
///
/// `type2 == INST_NOOP` means the opcode holds a single instruction.  A
/// size of 0 means the actual size follows as a varint in the instruction
/// stream; a nonzero size is used directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CodeTableEntry {
    pub type1: u8,
    pub size1: u8,
    pub type2: u8,
    pub size2: u8,
}

/// The complete 256-entry table.
pub type CodeTable = [CodeTableEntry; 256];

impl CodeTableEntry {
    const fn single(itype: u8, size: u8) -> Self {
        Self {
            type1: itype,
            size1: size,
            type2: INST_NOOP,
            size2: 0,
        }
    }

    const fn double(type1: u8, size1: u8, type2: u8, size2: u8) -> Self {
        Self {
            type1,
            size1,
            type2,
            size2,
        }
    }
}

/// Build the default RFC 3284 code table.
///
/// Layout: RUN, ADD(0..17), sixteen COPY entries per mode (size 0 then
/// 4..18), then the ADD+COPY and COPY+ADD double-instruction blocks.
fn build_default_table() -> CodeTable {
    const NEAR_MODES: u8 = 4;
    const SAME_MODES: u8 = 3;
    const COPY_MODES: u8 = 2 + NEAR_MODES + SAME_MODES; // 9

    let mut table = [CodeTableEntry::default(); 256];
    let mut idx = 0usize;

    table[idx] = CodeTableEntry::single(INST_RUN, 0);
    idx += 1;

    for size in 0..=17u8 {
        table[idx] = CodeTableEntry::single(INST_ADD, size);
        idx += 1;
    }

    for mode in 0..COPY_MODES {
        table[idx] = CodeTableEntry::single(INST_COPY + mode, 0);
        idx += 1;
        for size in MIN_COPY_SIZE..=18 {
            table[idx] = CodeTableEntry::single(INST_COPY + mode, size);
            idx += 1;
        }
    }

    // ADD(1..4) followed by a short COPY: sizes 4..6 for SELF/HERE/NEAR
    // modes, size 4 only for SAME modes.
    for mode in 0..COPY_MODES {
        let copy_max = if mode < 2 + NEAR_MODES { 6 } else { 4 };
        for add_size in 1..=4u8 {
            for copy_size in MIN_COPY_SIZE..=copy_max {
                table[idx] =
                    CodeTableEntry::double(INST_ADD, add_size, INST_COPY + mode, copy_size);
                idx += 1;
            }
        }
    }

    // COPY(4) followed by ADD(1).
    for mode in 0..COPY_MODES {
        table[idx] = CodeTableEntry::double(INST_COPY + mode, 4, INST_ADD, 1);
        idx += 1;
    }

    debug_assert_eq!(idx, 256, "code table must have exactly 256 entries");
    table
}

/// The process-wide default code table.
pub fn default_code_table() -> &'static CodeTable {
    static TABLE: LazyLock<CodeTable> = LazyLock::new(build_default_table);
    &TABLE
}
