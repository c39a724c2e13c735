//! Shared instruction set definitions.
//!
//! One data-driven table describes every implemented instruction: mnemonic,
//! opcode byte, format and operand arity. Both the assembler and the
//! execution engine consult this table, so the encode and decode sides
//! cannot drift apart.
//!
//! Opcode bytes always have their low two bits clear; in formats 3/4 those
//! bits carry the n/i addressing flags, so decoding masks them off first.

/// Instruction encoding format.
///
/// Format 1 is a single opcode byte (RSUB only). Format 2 adds one byte of
/// packed register nibbles. Formats 3 and 4 share an opcode class and are
/// told apart by the `e` flag at runtime (3 or 4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    One,
    Two,
    ThreeFour,
}

/// A single instruction descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDesc {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub format: Format,
    /// Number of operands the assembly syntax expects.
    pub operands: u8,
}

/// The complete instruction table.
pub const OPCODES: &[OpDesc] = &[
    // Format 1
    OpDesc { mnemonic: "RSUB", opcode: 0x4C, format: Format::One, operands: 0 },
    // Format 2
    OpDesc { mnemonic: "ADDR", opcode: 0x90, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "SUBR", opcode: 0x94, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "MULR", opcode: 0x98, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "DIVR", opcode: 0x9C, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "COMPR", opcode: 0xA0, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "SHIFTL", opcode: 0xA4, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "SHIFTR", opcode: 0xA8, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "RMO", opcode: 0xAC, format: Format::Two, operands: 2 },
    OpDesc { mnemonic: "CLEAR", opcode: 0xB4, format: Format::Two, operands: 1 },
    OpDesc { mnemonic: "TIXR", opcode: 0xB8, format: Format::Two, operands: 1 },
    // Format 3/4
    OpDesc { mnemonic: "LDA", opcode: 0x00, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDX", opcode: 0x04, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDL", opcode: 0x08, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STA", opcode: 0x0C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STX", opcode: 0x10, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STL", opcode: 0x14, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "ADD", opcode: 0x18, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "SUB", opcode: 0x1C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "MUL", opcode: 0x20, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "DIV", opcode: 0x24, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "COMP", opcode: 0x28, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "TIX", opcode: 0x2C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "JEQ", opcode: 0x30, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "JGT", opcode: 0x34, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "JLT", opcode: 0x38, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "J", opcode: 0x3C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "AND", opcode: 0x40, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "OR", opcode: 0x44, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "JSUB", opcode: 0x48, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDCH", opcode: 0x50, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STCH", opcode: 0x54, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDB", opcode: 0x68, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDS", opcode: 0x6C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "LDT", opcode: 0x74, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STB", opcode: 0x78, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STS", opcode: 0x7C, format: Format::ThreeFour, operands: 1 },
    OpDesc { mnemonic: "STT", opcode: 0x84, format: Format::ThreeFour, operands: 1 },
];

/// Looks up a descriptor by assembly mnemonic (without any `+` prefix).
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static OpDesc> {
    OPCODES.iter().find(|op| op.mnemonic == mnemonic)
}

/// Looks up a descriptor by opcode byte.
///
/// The low two bits (n/i flags in formats 3/4) are masked off before the
/// comparison, so any fetched byte can be passed directly.
pub fn by_opcode(byte: u8) -> Option<&'static OpDesc> {
    let class = byte & 0xFC;
    OPCODES.iter().find(|op| op.opcode == class)
}

/// Maps a register name to its architectural number.
///
/// F (6) is part of the numbering but the machine implements no F register;
/// using it assembles fine and halts the engine with an invalid-register
/// reason at runtime.
pub fn register_number(name: &str) -> Option<u8> {
    match name {
        "A" => Some(0),
        "X" => Some(1),
        "L" => Some(2),
        "B" => Some(3),
        "S" => Some(4),
        "T" => Some(5),
        "F" => Some(6),
        "PC" => Some(8),
        "SW" => Some(9),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_classes_are_unique() {
        for (i, a) in OPCODES.iter().enumerate() {
            for b in &OPCODES[i + 1..] {
                assert_ne!(a.opcode, b.opcode, "{} and {}", a.mnemonic, b.mnemonic);
            }
        }
    }

    #[test]
    fn opcode_low_bits_are_clear() {
        for op in OPCODES {
            assert_eq!(op.opcode & 0x03, 0, "{}", op.mnemonic);
        }
    }

    #[test]
    fn lookups_round_trip() {
        for op in OPCODES {
            assert_eq!(by_mnemonic(op.mnemonic).unwrap().opcode, op.opcode);
            assert_eq!(by_opcode(op.opcode).unwrap().mnemonic, op.mnemonic);
            // n/i flag bits must not confuse the decode lookup
            assert_eq!(by_opcode(op.opcode | 0x03).unwrap().mnemonic, op.mnemonic);
        }
    }

    #[test]
    fn unknown_lookups_fail() {
        assert!(by_mnemonic("NOP").is_none());
        assert!(by_opcode(0xFC).is_none());
        assert!(register_number("Q").is_none());
    }

    #[test]
    fn register_numbering() {
        assert_eq!(register_number("A"), Some(0));
        assert_eq!(register_number("T"), Some(5));
        assert_eq!(register_number("PC"), Some(8));
        assert_eq!(register_number("SW"), Some(9));
    }
}
