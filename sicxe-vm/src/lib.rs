//! Emulator for a small 24-bit-word accumulator machine.
//!
//! The crate is split along the architectural seams: [`memory`] is the
//! byte store with word helpers, [`registers`] the register file,
//! [`machine`] the fetch/decode/execute engine, [`isa`] the shared
//! instruction table (the assembler crate encodes against the same table
//! this engine decodes with), [`loader`] object-file reading and
//! [`disasm`] the listing renderer front ends print.

pub mod disasm;
pub mod errors;
pub mod isa;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod registers;

pub use errors::{HaltReason, LoadError, State};
pub use machine::Machine;
pub use memory::{MEMORY_WORDS, Memory};
pub use registers::{Cond, Reg, Registers};
