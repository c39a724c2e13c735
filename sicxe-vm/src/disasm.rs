//! Readable rendering of machine code, for the front end's dumps.

use crate::isa::{self, Format};
use crate::machine::Machine;
use crate::memory::Memory;
use crate::registers::Reg;

fn register_name(num: u8) -> String {
    match num {
        0 => "A".into(),
        1 => "X".into(),
        2 => "L".into(),
        3 => "B".into(),
        4 => "S".into(),
        5 => "T".into(),
        6 => "F".into(),
        8 => "PC".into(),
        9 => "SW".into(),
        other => format!("R{}", other),
    }
}

/// Renders the instruction at a byte address, returning the text and the
/// instruction size in bytes. Unknown opcode bytes render as raw hex with
/// size 1 so a dump can always make progress.
pub fn disasm_instruction(memory: &Memory, addr: usize) -> (String, usize) {
    let byte0 = memory.get_byte(addr);
    let Some(desc) = isa::by_opcode(byte0) else {
        return (format!("${:02X}", byte0), 1);
    };

    match desc.format {
        Format::One => (desc.mnemonic.to_string(), 1),
        Format::Two => {
            let packed = memory.get_byte(addr + 1);
            let n1 = packed >> 4;
            let n2 = packed & 0x0F;
            let text = match desc.operands {
                1 => format!("{} {}", desc.mnemonic, register_name(n1)),
                _ if desc.mnemonic.starts_with("SHIFT") => {
                    format!("{} {},{}", desc.mnemonic, register_name(n1), n2 + 1)
                }
                _ => format!(
                    "{} {},{}",
                    desc.mnemonic,
                    register_name(n1),
                    register_name(n2)
                ),
            };
            (text, 2)
        }
        Format::ThreeFour => {
            let n = byte0 & 0x02 != 0;
            let i = byte0 & 0x01 != 0;
            let byte1 = memory.get_byte(addr + 1);
            let x = byte1 & 0x80 != 0;
            let b = byte1 & 0x40 != 0;
            let p = byte1 & 0x20 != 0;
            let e = byte1 & 0x10 != 0;

            let (value, size, extended) = if e {
                let addr20 = ((byte1 as i32 & 0x0F) << 16)
                    | ((memory.get_byte(addr + 2) as i32) << 8)
                    | memory.get_byte(addr + 3) as i32;
                (addr20, 4, "+")
            } else {
                let mut disp =
                    ((byte1 as i32 & 0x0F) << 8) | memory.get_byte(addr + 2) as i32;
                if disp & 0x800 != 0 {
                    disp -= 4096;
                }
                (disp, 3, "")
            };

            let prefix = if i && !n {
                "#"
            } else if n && !i {
                "@"
            } else {
                ""
            };
            let mut operand = format!("{}{}", prefix, value);
            if p {
                operand.push_str(",PC");
            } else if b {
                operand.push_str(",B");
            }
            if x {
                operand.push_str(",X");
            }
            (format!("{}{} {}", extended, desc.mnemonic, operand), size)
        }
    }
}

/// Prints a disassembly listing of `[start, end)` byte addresses.
pub fn dump_memory(memory: &Memory, start: usize, end: usize) {
    let end = end.min(memory.len_bytes());
    let mut addr = start;
    while addr < end {
        let (text, size) = disasm_instruction(memory, addr);
        print!("{:06X}: ", addr);
        for offset in 0..size {
            if addr + offset < end {
                print!("{:02X} ", memory.get_byte(addr + offset));
            }
        }
        // pad so format 1/2/3 line up with format 4
        for _ in size..4 {
            print!("   ");
        }
        println!(" {}", text);
        addr += size;
    }
}

pub fn dump_registers(machine: &Machine) {
    let regs = machine.registers();
    for (name, reg) in [
        ("A", Reg::A),
        ("X", Reg::X),
        ("L", Reg::L),
        ("B", Reg::B),
        ("S", Reg::S),
        ("T", Reg::T),
    ] {
        println!("  {:<2} = {:8} (0x{:06X})", name, regs.get(reg), regs.get(reg) as u32 & 0xFFFFFF);
    }
    println!("  PC = {:8}", regs.pc());
    println!("  SW = {:?}", regs.cond());
    println!("  state: {:?}", machine.state());
}
