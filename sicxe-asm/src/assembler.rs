//! Two-pass assembler.
//!
//! Pass 1 walks the source once to size every statement and collect label
//! addresses; pass 2 emits object bytes against that symbol table, so
//! forward references cost nothing. Errors never abort assembly: each bad
//! line is recorded as a [`Diagnostic`] and contributes its pass-1 size as
//! zero fill, which keeps every later symbol address intact.
//!
//! Instruction encodings come from the same `sicxe_vm::isa` table the
//! engine decodes with.

use std::collections::HashMap;

use thiserror::Error;

use sicxe_vm::isa::{self, Format, OpDesc};

use crate::scanner::{self, LiteralError, SourceLine, parse_byte_literal, parse_number};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("unknown mnemonic {0:?}")]
    UnknownMnemonic(String),
    #[error("unresolved symbol {0:?}")]
    UnresolvedSymbol(String),
    #[error("target out of displacement range (offset {0})")]
    DispOutOfRange(i32),
    #[error(transparent)]
    MalformedLiteral(#[from] LiteralError),
    #[error("bad register name {0:?}")]
    BadRegister(String),
    #[error("missing or malformed operand")]
    BadOperand,
    #[error("duplicate label {0:?}")]
    DuplicateLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: AsmErrorKind,
}

/// The result of assembling one source text: a flat object byte image and
/// every problem found along the way. The image is present even when
/// diagnostics are; erroneous statements are zero-filled.
#[derive(Debug, Default)]
pub struct Assembly {
    pub object: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn assemble(source: &str) -> Assembly {
    let lines = scanner::scan_source(source);
    let mut assembler = Assembler::default();
    assembler.collect_symbols(&lines);
    assembler.emit(&lines)
}

#[derive(Debug, Default)]
struct Assembler {
    symbols: HashMap<String, i32>,
    diagnostics: Vec<Diagnostic>,
}

/// Number of object bytes a statement occupies. Both passes use this one
/// function, so addresses cannot drift between them.
fn size_of(line: &SourceLine) -> i32 {
    match line.mnemonic.as_str() {
        "START" | "END" | "BASE" | "NOBASE" => 0,
        "WORD" => 3,
        "RESW" => 3 * reservation_count(line),
        "RESB" => reservation_count(line),
        "BYTE" => line
            .operand
            .as_deref()
            .and_then(|text| parse_byte_literal(text).ok())
            .map_or(0, |bytes| bytes.len() as i32),
        mnemonic => {
            let (bare, extended) = match mnemonic.strip_prefix('+') {
                Some(rest) => (rest, true),
                None => (mnemonic, false),
            };
            match isa::by_mnemonic(bare).map(|desc| desc.format) {
                Some(Format::One) => 1,
                Some(Format::Two) => 2,
                Some(Format::ThreeFour) => {
                    if extended {
                        4
                    } else {
                        3
                    }
                }
                None => 0,
            }
        }
    }
}

fn reservation_count(line: &SourceLine) -> i32 {
    line.operand
        .as_deref()
        .and_then(parse_number)
        .unwrap_or(0)
        .max(0)
}

impl Assembler {
    fn report(&mut self, line: usize, kind: AsmErrorKind) {
        self.diagnostics.push(Diagnostic { line, kind });
    }

    fn define(&mut self, label: &str, address: i32, line: usize) {
        if self.symbols.contains_key(label) {
            self.report(line, AsmErrorKind::DuplicateLabel(label.to_string()));
        } else {
            self.symbols.insert(label.to_string(), address);
        }
    }

    /// Pass 1: location counting and the symbol table. `START` moves the
    /// location counter here too, not just in pass 2, so labels after it
    /// land on the same addresses pass 2 will emit against.
    fn collect_symbols(&mut self, lines: &[SourceLine]) {
        let mut locctr = 0i32;
        for line in lines {
            if line.mnemonic == "START" {
                if let Some(origin) = line.operand.as_deref().and_then(parse_number) {
                    locctr = origin;
                }
            }
            if let Some(label) = line.label.clone() {
                self.define(&label, locctr, line.number);
            }
            if line.mnemonic == "END" {
                break;
            }
            locctr += size_of(line);
        }
    }

    /// Pass 2: byte emission.
    fn emit(mut self, lines: &[SourceLine]) -> Assembly {
        let mut object = Vec::new();
        let mut locctr = 0i32;
        let mut base: Option<i32> = None;

        for line in lines {
            let size = size_of(line);
            let emitted_at = object.len();

            match line.mnemonic.as_str() {
                "START" => match line.operand.as_deref().and_then(parse_number) {
                    Some(origin) => locctr = origin,
                    None => self.report(line.number, AsmErrorKind::BadOperand),
                },
                "END" => break,
                "BASE" => match self.resolve(line.operand.as_deref()) {
                    Some(address) => base = Some(address),
                    None => self.report_unresolved(line),
                },
                "NOBASE" => base = None,
                // a WORD operand may name a symbol, yielding its address
                "WORD" => match self.resolve(line.operand.as_deref()) {
                    Some(value) => {
                        object.extend_from_slice(&word_bytes(value));
                    }
                    None => self.report_unresolved(line),
                },
                "BYTE" => match line.operand.as_deref().map(parse_byte_literal) {
                    Some(Ok(bytes)) => object.extend_from_slice(&bytes),
                    Some(Err(err)) => self.report(line.number, err.into()),
                    None => self.report(line.number, AsmErrorKind::BadOperand),
                },
                "RESW" | "RESB" => {
                    if line.operand.as_deref().and_then(parse_number).is_none() {
                        self.report(line.number, AsmErrorKind::BadOperand);
                    }
                    // the zero fill below reserves the space
                }
                mnemonic => self.emit_instruction(mnemonic, line, locctr, base, &mut object),
            }

            // zero-fill up to the pass-1 size on reservation and error paths
            object.resize(emitted_at + size as usize, 0);
            locctr += size;
        }

        Assembly {
            object,
            diagnostics: self.diagnostics,
        }
    }

    fn emit_instruction(
        &mut self,
        mnemonic: &str,
        line: &SourceLine,
        locctr: i32,
        base: Option<i32>,
        object: &mut Vec<u8>,
    ) {
        let (bare, extended) = match mnemonic.strip_prefix('+') {
            Some(rest) => (rest, true),
            None => (mnemonic, false),
        };
        let Some(desc) = isa::by_mnemonic(bare) else {
            self.report(line.number, AsmErrorKind::UnknownMnemonic(mnemonic.to_string()));
            return;
        };

        match desc.format {
            Format::One => object.push(desc.opcode),
            Format::Two => {
                if let Some(packed) = self.encode_registers(desc, line) {
                    object.push(desc.opcode);
                    object.push(packed);
                }
            }
            Format::ThreeFour => {
                let Some(target) = self.resolve(line.operand.as_deref()) else {
                    self.report_unresolved(line);
                    return;
                };
                if extended {
                    if !(0..=0xFFFFF).contains(&target) {
                        self.report(line.number, AsmErrorKind::DispOutOfRange(target));
                        return;
                    }
                    object.push(desc.opcode);
                    object.push(0x10 | ((target >> 16) & 0x0F) as u8);
                    object.push(((target >> 8) & 0xFF) as u8);
                    object.push((target & 0xFF) as u8);
                } else {
                    // PC-relative first; base-relative as the fallback
                    let pc_disp = target - (locctr + 3);
                    let (flags, disp) = if (-2048..=2047).contains(&pc_disp) {
                        (0x20u8, pc_disp)
                    } else if let Some(base) = base {
                        let base_disp = target - base;
                        if !(0..=4095).contains(&base_disp) {
                            self.report(line.number, AsmErrorKind::DispOutOfRange(pc_disp));
                            return;
                        }
                        (0x40, base_disp)
                    } else {
                        self.report(line.number, AsmErrorKind::DispOutOfRange(pc_disp));
                        return;
                    };
                    object.push(desc.opcode);
                    object.push(flags | ((disp >> 8) & 0x0F) as u8);
                    object.push((disp & 0xFF) as u8);
                }
            }
        }
    }

    /// Packs the register byte of a format 2 instruction.
    fn encode_registers(&mut self, desc: &OpDesc, line: &SourceLine) -> Option<u8> {
        let Some(operand) = line.operand.as_deref() else {
            self.report(line.number, AsmErrorKind::BadOperand);
            return None;
        };
        let mut fields = operand.split(',').map(str::trim);

        let n1 = self.register_field(fields.next().unwrap_or(""), line.number)?;
        let n2 = if desc.operands < 2 {
            0
        } else {
            self.register_field(fields.next().unwrap_or(""), line.number)?
        };

        Some((n1 << 4) | n2)
    }

    /// A format 2 operand token is a register name, or a literal decimal
    /// nibble when it starts with a digit; the shift instructions use the
    /// literal form for their count field.
    fn register_field(&mut self, text: &str, line: usize) -> Option<u8> {
        if let Some(num) = isa::register_number(text) {
            return Some(num);
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some(value) = parse_number(text) {
                if (0..=15).contains(&value) {
                    return Some(value as u8);
                }
            }
        }
        self.report(line, AsmErrorKind::BadRegister(text.to_string()));
        None
    }

    /// An operand is a symbol if the table knows it, a number otherwise.
    fn resolve(&self, operand: Option<&str>) -> Option<i32> {
        let text = operand?;
        self.symbols
            .get(text)
            .copied()
            .or_else(|| parse_number(text))
    }

    fn report_unresolved(&mut self, line: &SourceLine) {
        let kind = match line.operand.as_deref() {
            Some(text) => AsmErrorKind::UnresolvedSymbol(text.to_string()),
            None => AsmErrorKind::BadOperand,
        };
        self.report(line.number, kind);
    }
}

fn word_bytes(value: i32) -> [u8; 3] {
    [
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_references_resolve() {
        let assembly = assemble(
            "P     START 0\n      \
             LDA   DATA\n      \
             RSUB\n\
             DATA  WORD  7\n",
        );
        assert!(assembly.diagnostics.is_empty(), "{:?}", assembly.diagnostics);
        // LDA pc-relative disp 1, RSUB, the data word
        assert_eq!(
            assembly.object,
            vec![0x00, 0x20, 0x01, 0x4C, 0x00, 0x00, 0x07]
        );
    }

    #[test]
    fn start_offsets_the_symbol_table() {
        let assembly = assemble(
            "P     START 0x100\n      \
             +LDA  DATA\n      \
             RSUB\n\
             DATA  WORD  9\n",
        );
        assert!(assembly.diagnostics.is_empty());
        // DATA sits at 0x100 + 5 = 0x105, format 4 encodes it absolutely
        assert_eq!(
            assembly.object,
            vec![0x00, 0x10, 0x01, 0x05, 0x4C, 0x00, 0x00, 0x09]
        );
    }

    #[test]
    fn displacement_2047_fits() {
        let assembly = assemble(
            "P     START 0\n      \
             LDA   FAR\n      \
             RESB  2047\n\
             FAR   WORD  1\n",
        );
        assert!(assembly.diagnostics.is_empty());
        // disp = 2050 - 3 = 2047, the positive extreme
        assert_eq!(&assembly.object[0..3], &[0x00, 0x27, 0xFF]);
    }

    #[test]
    fn displacement_2048_is_rejected() {
        let assembly = assemble(
            "P     START 0\n      \
             LDA   FAR\n      \
             RESB  2048\n\
             FAR   WORD  1\n",
        );
        assert_eq!(assembly.diagnostics.len(), 1);
        assert_eq!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::DispOutOfRange(2048)
        );
        // the statement is zero-filled, later bytes keep their addresses
        assert_eq!(&assembly.object[0..3], &[0, 0, 0]);
        let far = 3 + 2048;
        assert_eq!(&assembly.object[far..far + 3], &[0, 0, 1]);
    }

    #[test]
    fn negative_displacement_encodes() {
        let assembly = assemble(
            "DATA  WORD  4\n\
             HERE  LDA   DATA\n",
        );
        assert!(assembly.diagnostics.is_empty());
        // disp = 0 - 6 = -6 = 0xFFA
        assert_eq!(&assembly.object[3..6], &[0x00, 0x2F, 0xFA]);
    }

    #[test]
    fn base_relative_fallback() {
        let assembly = assemble(
            "P     START 0\n      \
             BASE  TAB\n      \
             LDA   TAB\n      \
             RESB  4000\n\
             TAB   WORD  1\n",
        );
        assert!(assembly.diagnostics.is_empty(), "{:?}", assembly.diagnostics);
        // TAB is 4000 bytes ahead: out of pc range, base disp = 0
        assert_eq!(&assembly.object[0..3], &[0x00, 0x40, 0x00]);
    }

    #[test]
    fn out_of_range_without_base_is_rejected() {
        let assembly = assemble(
            "P     START 0\n      \
             LDA   TAB\n      \
             RESB  4000\n\
             TAB   WORD  1\n",
        );
        assert_eq!(assembly.diagnostics.len(), 1);
        assert!(matches!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::DispOutOfRange(_)
        ));
    }

    #[test]
    fn nobase_clears_the_base() {
        let assembly = assemble(
            "P     START 0\n      \
             BASE  TAB\n      \
             NOBASE\n      \
             LDA   TAB\n      \
             RESB  4000\n\
             TAB   WORD  1\n",
        );
        assert_eq!(assembly.diagnostics.len(), 1);
    }

    #[test]
    fn word_emits_twos_complement() {
        let assembly = assemble("N     WORD  -1\n");
        assert_eq!(assembly.object, vec![0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn word_takes_a_symbol_as_its_value() {
        let assembly = assemble(
            "PTR   WORD  TGT\n\
             TGT   WORD  1\n",
        );
        assert!(assembly.diagnostics.is_empty(), "{:?}", assembly.diagnostics);
        // PTR holds TGT's address
        assert_eq!(assembly.object, vec![0, 0, 3, 0, 0, 1]);
    }

    #[test]
    fn end_stops_both_passes() {
        let assembly = assemble(
            "      RSUB\n      \
             END\n      \
             WORD  5\n",
        );
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.object, vec![0x4C]);
    }

    #[test]
    fn byte_literals_emit_verbatim() {
        let assembly = assemble(
            "A     BYTE  C'EOF'\n\
             B     BYTE  X'F1'\n",
        );
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.object, vec![b'E', b'O', b'F', 0xF1]);
    }

    #[test]
    fn malformed_byte_literal_is_reported() {
        let assembly = assemble("A     BYTE  X'F'\n");
        assert!(matches!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::MalformedLiteral(_)
        ));
        assert!(assembly.object.is_empty());
    }

    #[test]
    fn reservations_zero_fill() {
        let assembly = assemble(
            "P     START 0\n      \
             RSUB\n\
             BUF   RESW  2\n\
             TAIL  WORD  5\n",
        );
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.object.len(), 1 + 6 + 3);
        assert_eq!(&assembly.object[1..7], &[0; 6]);
        assert_eq!(&assembly.object[7..], &[0, 0, 5]);
    }

    #[test]
    fn unknown_mnemonic_occupies_no_space() {
        let assembly = assemble(
            "      FROB  1\n\
             HERE  RSUB\n",
        );
        assert_eq!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::UnknownMnemonic("FROB".to_string())
        );
        // HERE still lands at address 0
        assert_eq!(assembly.object, vec![0x4C]);
    }

    #[test]
    fn format2_register_encodings() {
        let assembly = assemble(
            "      COMPR A,X\n      \
             CLEAR X\n      \
             SHIFTL A,4\n      \
             RMO   S,T\n",
        );
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(
            assembly.object,
            vec![0xA0, 0x01, 0xB4, 0x10, 0xA4, 0x04, 0xAC, 0x45]
        );
    }

    #[test]
    fn format2_digit_operands_are_literal_nibbles() {
        let assembly = assemble("      COMPR A,1\n");
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.object, vec![0xA0, 0x01]);

        let assembly = assemble("      COMPR A,99\n");
        assert_eq!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::BadRegister("99".to_string())
        );
    }

    #[test]
    fn bad_register_name_is_reported() {
        let assembly = assemble("      COMPR A,Q\n");
        assert_eq!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::BadRegister("Q".to_string())
        );
        assert_eq!(assembly.object, vec![0, 0]);
    }

    #[test]
    fn duplicate_labels_are_reported() {
        let assembly = assemble(
            "X     WORD  1\n\
             X     WORD  2\n",
        );
        assert_eq!(
            assembly.diagnostics[0].kind,
            AsmErrorKind::DuplicateLabel("X".to_string())
        );
    }

    #[test]
    fn missing_operand_is_reported() {
        let assembly = assemble("      LDA\n");
        assert_eq!(assembly.diagnostics[0].kind, AsmErrorKind::BadOperand);
        assert_eq!(assembly.object, vec![0, 0, 0]);
    }

    #[test]
    fn numeric_operands_are_absolute_targets() {
        // LDA 100 resolves 100 as a target address, pc-relative encoded
        let assembly = assemble("      LDA   100\n");
        assert!(assembly.diagnostics.is_empty());
        // disp = 100 - 3 = 97
        assert_eq!(assembly.object, vec![0x00, 0x20, 97]);
    }
}
