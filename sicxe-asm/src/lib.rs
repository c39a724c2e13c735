//! Two-pass assembler for the `sicxe-vm` machine.
//!
//! The instruction table lives in `sicxe_vm::isa`; this crate only adds
//! the source-text side: scanning lines and the two emission passes.

pub mod assembler;
pub mod scanner;

pub use assembler::{AsmErrorKind, Assembly, Diagnostic, assemble};
pub use scanner::SourceLine;
