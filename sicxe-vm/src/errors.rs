//! Error and machine-state types.

use thiserror::Error;

/// Why the machine stopped.
///
/// Every fatal condition inside the engine ends up here; `step()` and
/// `run()` never return an `Err` for execution faults, they park the
/// machine in [`State::Halted`] and return normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HaltReason {
    /// RSUB executed with no enclosing JSUB.
    #[error("program returned")]
    Returned,
    #[error("division by zero")]
    DivisionByZero,
    #[error("unimplemented opcode 0x{0:02X}")]
    UnimplementedOpcode(u8),
    /// A fetch or operand access past the end of memory.
    #[error("out-of-bounds access at byte address {0:#x}")]
    OutOfBounds(usize),
    /// A register number outside 0-5, 8, 9 in a decoded instruction.
    #[error("invalid register number {0}")]
    InvalidRegister(u8),
}

/// Execution state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Loaded (or freshly reset) and not yet stepped.
    Idle,
    Running,
    Halted(HaltReason),
}

impl State {
    pub fn is_halted(&self) -> bool {
        matches!(self, State::Halted(_))
    }
}

/// Failure to read an object file. The loader performs no partial load:
/// either the whole file is copied into memory or nothing is.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read object file: {0}")]
    Io(#[from] std::io::Error),
}
