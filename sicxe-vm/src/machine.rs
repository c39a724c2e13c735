//! The machine: registers + memory + the fetch/decode/execute loop.
//!
//! Every fatal condition (bad opcode, out-of-range fetch, invalid register
//! number, division by zero) parks the machine in `State::Halted(reason)`;
//! `step()` and `run()` always return normally and callers inspect the
//! state. RSUB is the only way for a program to terminate on purpose: the
//! machine counts JSUB nesting, and an RSUB with no enclosing JSUB halts
//! with `Returned` instead of jumping to L.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{HaltReason, State};
use crate::isa::{self, Format};
use crate::memory::Memory;
use crate::registers::{Cond, Reg, Registers};

#[derive(Debug)]
pub struct Machine {
    memory: Memory,
    regs: Registers,
    state: State,
    sub_depth: u32,
}

impl Machine {
    /// A machine with the default memory capacity.
    pub fn new() -> Self {
        Self::with_memory_words(crate::memory::MEMORY_WORDS)
    }

    pub fn with_memory_words(words: usize) -> Self {
        Self {
            memory: Memory::with_words(words),
            regs: Registers::new(),
            state: State::Idle,
            sub_depth: 0,
        }
    }

    /// Copies an object byte sequence into memory starting at byte 0 and
    /// resets PC to 0. Other registers keep their values; object code is
    /// always loaded at address 0 regardless of any assembly-time origin.
    pub fn load(&mut self, object: &[u8]) {
        for (addr, &byte) in object.iter().enumerate() {
            self.memory.set_byte(addr, byte);
        }
        self.regs.pc = 0;
        self.sub_depth = 0;
        self.state = State::Idle;
    }

    /// Zeroes all memory and registers, sets SW to Equal and returns to
    /// the Idle state.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.regs.reset();
        self.sub_depth = 0;
        self.state = State::Idle;
    }

    /// Executes exactly one instruction. A halted machine stays halted.
    pub fn step(&mut self) -> State {
        if self.state.is_halted() {
            return self.state;
        }
        self.state = State::Running;
        if let Err(reason) = self.exec_one() {
            self.state = State::Halted(reason);
        }
        self.state
    }

    /// Steps until the machine halts.
    pub fn run(&mut self) -> State {
        while !self.state.is_halted() {
            self.step();
        }
        self.state
    }

    /// Like [`run`](Self::run), but polls `cancel` once per instruction and
    /// returns early (not halted, resumable) when it is set. Interactive
    /// front ends use this to stop a long run without corrupting state.
    pub fn run_with_cancel(&mut self, cancel: &AtomicBool) -> State {
        while !self.state.is_halted() {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            self.step();
        }
        self.state
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    // ------------------------------------------------------------------
    // Fetch helpers. Instruction and operand fetches are bounds-checked;
    // the lenient byte accessors are only used by stores and LDCH/STCH.

    fn fetch_byte(&self, byte_addr: usize) -> Result<u8, HaltReason> {
        if byte_addr >= self.memory.len_bytes() {
            return Err(HaltReason::OutOfBounds(byte_addr));
        }
        Ok(self.memory.get_byte(byte_addr))
    }

    /// Reads a 3-byte big-endian word starting at a byte address.
    fn read_word_at(&self, byte_addr: i32) -> Result<u32, HaltReason> {
        let addr = usize::try_from(byte_addr).map_err(|_| HaltReason::OutOfBounds(0))?;
        let b1 = self.fetch_byte(addr)? as u32;
        let b2 = self.fetch_byte(addr + 1)? as u32;
        let b3 = self.fetch_byte(addr + 2)? as u32;
        Ok((b1 << 16) | (b2 << 8) | b3)
    }

    /// Writes a 3-byte big-endian word starting at a byte address. Goes
    /// through the lenient byte store, so out-of-range writes are dropped.
    fn write_word_at(&mut self, byte_addr: i32, value: i32) {
        let Ok(addr) = usize::try_from(byte_addr) else {
            return;
        };
        self.memory.set_byte(addr, ((value >> 16) & 0xFF) as u8);
        self.memory.set_byte(addr + 1, ((value >> 8) & 0xFF) as u8);
        self.memory.set_byte(addr + 2, (value & 0xFF) as u8);
    }

    fn byte_at(&self, byte_addr: i32) -> u8 {
        usize::try_from(byte_addr)
            .map(|addr| self.memory.get_byte(addr))
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------

    fn exec_one(&mut self) -> Result<(), HaltReason> {
        let pc = usize::try_from(self.regs.pc).map_err(|_| HaltReason::OutOfBounds(0))?;
        let byte0 = self.fetch_byte(pc)?;
        let class = byte0 & 0xFC;

        let desc = isa::by_opcode(byte0).ok_or(HaltReason::UnimplementedOpcode(class))?;

        match desc.format {
            Format::One => {
                // RSUB: PC = L, even when this return terminates the
                // program (no enclosing JSUB).
                self.regs.pc = self.regs.l;
                if self.sub_depth == 0 {
                    return Err(HaltReason::Returned);
                }
                self.sub_depth -= 1;
                Ok(())
            }
            Format::Two => self.exec_format2(desc.mnemonic, pc, class),
            Format::ThreeFour => self.exec_format34(desc.mnemonic, byte0, pc, class),
        }
    }

    fn exec_format2(&mut self, mnemonic: &str, pc: usize, class: u8) -> Result<(), HaltReason> {
        let packed = self.fetch_byte(pc + 1)?;
        let n1 = packed >> 4;
        let n2 = packed & 0x0F;
        let next_pc = pc as i32 + 2;

        match mnemonic {
            "CLEAR" => {
                let r1 = Reg::from_number(n1)?;
                self.regs.pc = next_pc;
                self.regs.set(r1, 0);
            }
            "ADDR" | "SUBR" | "MULR" | "DIVR" => {
                let r1 = Reg::from_number(n1)?;
                let r2 = Reg::from_number(n2)?;
                let a = self.regs.get(r1);
                let b = self.regs.get(r2);
                let value = match mnemonic {
                    "ADDR" => b.wrapping_add(a),
                    "SUBR" => b.wrapping_sub(a),
                    "MULR" => b.wrapping_mul(a),
                    _ => {
                        if a == 0 {
                            return Err(HaltReason::DivisionByZero);
                        }
                        b.wrapping_div(a)
                    }
                };
                self.regs.pc = next_pc;
                self.regs.set(r2, value);
            }
            "RMO" => {
                let r1 = Reg::from_number(n1)?;
                let r2 = Reg::from_number(n2)?;
                self.regs.pc = next_pc;
                let value = self.regs.get(r1);
                self.regs.set(r2, value);
            }
            "COMPR" => {
                let r1 = Reg::from_number(n1)?;
                let r2 = Reg::from_number(n2)?;
                self.regs.pc = next_pc;
                self.regs.sw = Cond::compare(self.regs.get(r1), self.regs.get(r2));
            }
            // The second nibble is a shift count minus one, not a register.
            "SHIFTL" | "SHIFTR" => {
                let r1 = Reg::from_number(n1)?;
                let shift = n2 as u32 + 1;
                self.regs.pc = next_pc;
                let value = self.regs.get(r1);
                let shifted = if mnemonic == "SHIFTL" {
                    value.wrapping_shl(shift)
                } else {
                    value.wrapping_shr(shift)
                };
                self.regs.set(r1, shifted);
            }
            "TIXR" => {
                let r1 = Reg::from_number(n1)?;
                self.regs.pc = next_pc;
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.sw = Cond::compare(self.regs.x, self.regs.get(r1));
            }
            _ => return Err(HaltReason::UnimplementedOpcode(class)),
        }
        Ok(())
    }

    fn exec_format34(
        &mut self,
        mnemonic: &str,
        byte0: u8,
        pc: usize,
        class: u8,
    ) -> Result<(), HaltReason> {
        let n = byte0 & 0x02 != 0;
        let i = byte0 & 0x01 != 0;

        let byte1 = self.fetch_byte(pc + 1)?;
        let x = byte1 & 0x80 != 0;
        let b = byte1 & 0x40 != 0;
        let p = byte1 & 0x20 != 0;
        let e = byte1 & 0x10 != 0;

        let next_pc;
        let mut target;
        if e {
            // Format 4: 20-bit absolute address, no displacement arithmetic.
            let byte2 = self.fetch_byte(pc + 2)?;
            let byte3 = self.fetch_byte(pc + 3)?;
            next_pc = pc as i32 + 4;
            target = (((byte1 & 0x0F) as i32) << 16) | ((byte2 as i32) << 8) | byte3 as i32;
        } else {
            // Format 3: 12-bit signed displacement, relative to the
            // already-incremented PC when the p flag is set.
            let byte2 = self.fetch_byte(pc + 2)?;
            next_pc = pc as i32 + 3;
            let mut disp = (((byte1 & 0x0F) as i32) << 8) | byte2 as i32;
            if disp & 0x800 != 0 {
                disp -= 4096;
            }
            target = if p {
                next_pc.wrapping_add(disp)
            } else if b {
                self.regs.b.wrapping_add(disp)
            } else {
                disp
            };
        }
        if x {
            target = target.wrapping_add(self.regs.x);
        }

        match mnemonic {
            "LDA" | "LDX" | "LDL" | "LDB" | "LDS" | "LDT" => {
                let value = self.resolve_operand(n, i, target)?;
                let reg = match mnemonic {
                    "LDA" => Reg::A,
                    "LDX" => Reg::X,
                    "LDL" => Reg::L,
                    "LDB" => Reg::B,
                    "LDS" => Reg::S,
                    _ => Reg::T,
                };
                self.regs.pc = next_pc;
                self.regs.set(reg, value);
            }
            // Stores use the target address, never an operand fetch.
            "STA" | "STX" | "STL" | "STB" | "STS" | "STT" => {
                let reg = match mnemonic {
                    "STA" => Reg::A,
                    "STX" => Reg::X,
                    "STL" => Reg::L,
                    "STB" => Reg::B,
                    "STS" => Reg::S,
                    _ => Reg::T,
                };
                self.regs.pc = next_pc;
                let value = self.regs.get(reg);
                self.write_word_at(target, value);
            }
            "LDCH" => {
                let byte = self.byte_at(target) as i32;
                self.regs.pc = next_pc;
                self.regs.a = (self.regs.a & !0xFF) | byte;
            }
            "STCH" => {
                self.regs.pc = next_pc;
                let byte = (self.regs.a & 0xFF) as u8;
                if let Ok(addr) = usize::try_from(target) {
                    self.memory.set_byte(addr, byte);
                }
            }
            "ADD" | "SUB" | "MUL" | "DIV" => {
                let value = self.resolve_operand(n, i, target)?;
                let a = self.regs.a;
                let result = match mnemonic {
                    "ADD" => a.wrapping_add(value),
                    "SUB" => a.wrapping_sub(value),
                    "MUL" => a.wrapping_mul(value),
                    _ => {
                        if value == 0 {
                            return Err(HaltReason::DivisionByZero);
                        }
                        a.wrapping_div(value)
                    }
                };
                self.regs.pc = next_pc;
                self.regs.a = result;
            }
            "AND" | "OR" => {
                let value = self.resolve_operand(n, i, target)?;
                self.regs.pc = next_pc;
                if mnemonic == "AND" {
                    self.regs.a &= value;
                } else {
                    self.regs.a |= value;
                }
            }
            "COMP" => {
                let value = self.resolve_operand(n, i, target)?;
                self.regs.pc = next_pc;
                self.regs.sw = Cond::compare(self.regs.a, value);
            }
            "TIX" => {
                let value = self.resolve_operand(n, i, target)?;
                self.regs.pc = next_pc;
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.sw = Cond::compare(self.regs.x, value);
            }
            "J" => {
                self.regs.pc = target;
            }
            "JEQ" | "JGT" | "JLT" => {
                let wanted = match mnemonic {
                    "JEQ" => Cond::Equal,
                    "JGT" => Cond::Greater,
                    _ => Cond::Less,
                };
                self.regs.pc = if self.regs.sw == wanted { target } else { next_pc };
            }
            "JSUB" => {
                self.regs.l = next_pc;
                self.regs.pc = target;
                self.sub_depth += 1;
            }
            _ => return Err(HaltReason::UnimplementedOpcode(class)),
        }
        Ok(())
    }

    /// Resolves the operand for a format 3/4 instruction.
    ///
    /// i=1,n=0 is immediate (the target *is* the value); n=1,i=0 is
    /// indirect (one extra memory hop); everything else, including the
    /// otherwise-unused n=1,i=1 combination, is simple addressing.
    fn resolve_operand(&self, n: bool, i: bool, target: i32) -> Result<i32, HaltReason> {
        if i && !n {
            return Ok(target);
        }
        let addr = if n && !i {
            self.read_word_at(target)? as i32
        } else {
            target
        };
        Ok(self.read_word_at(addr)? as i32)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
