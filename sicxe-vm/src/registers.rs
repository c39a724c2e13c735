//! The architectural register file and condition code.

use crate::errors::HaltReason;

/// The tri-state condition code set by comparisons and read by the
/// conditional jumps. Not a numeric register, although the architectural
/// numbering exposes it as number 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cond {
    Less,
    #[default]
    Equal,
    Greater,
}

impl Cond {
    pub fn compare(a: i32, b: i32) -> Cond {
        if a < b {
            Cond::Less
        } else if a == b {
            Cond::Equal
        } else {
            Cond::Greater
        }
    }

    fn to_i32(self) -> i32 {
        match self {
            Cond::Less => 0,
            Cond::Equal => 1,
            Cond::Greater => 2,
        }
    }

    fn from_i32(v: i32) -> Cond {
        match v {
            0 => Cond::Less,
            2 => Cond::Greater,
            _ => Cond::Equal,
        }
    }
}

/// A validated register identifier.
///
/// Decoded register numbers go through [`Reg::from_number`], which rejects
/// anything outside the architectural numbering instead of handing back a
/// dangling default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    A,
    X,
    L,
    B,
    S,
    T,
    Pc,
    Sw,
}

impl Reg {
    /// Maps an architectural register number to a register.
    ///
    /// Valid numbers are 0-5 (A, X, L, B, S, T), 8 (PC) and 9 (SW).
    /// Number 6 (F) is part of the numbering but not implemented here.
    pub fn from_number(num: u8) -> Result<Reg, HaltReason> {
        match num {
            0 => Ok(Reg::A),
            1 => Ok(Reg::X),
            2 => Ok(Reg::L),
            3 => Ok(Reg::B),
            4 => Ok(Reg::S),
            5 => Ok(Reg::T),
            8 => Ok(Reg::Pc),
            9 => Ok(Reg::Sw),
            other => Err(HaltReason::InvalidRegister(other)),
        }
    }
}

/// Plain value holder for the eight registers. Values are signed 32-bit,
/// semantically 24-bit; the upper byte is ignored by memory stores.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    pub(crate) a: i32,
    pub(crate) x: i32,
    pub(crate) l: i32,
    pub(crate) b: i32,
    pub(crate) s: i32,
    pub(crate) t: i32,
    pub(crate) pc: i32,
    pub(crate) sw: Cond,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Reg) -> i32 {
        match reg {
            Reg::A => self.a,
            Reg::X => self.x,
            Reg::L => self.l,
            Reg::B => self.b,
            Reg::S => self.s,
            Reg::T => self.t,
            Reg::Pc => self.pc,
            Reg::Sw => self.sw.to_i32(),
        }
    }

    pub fn set(&mut self, reg: Reg, value: i32) {
        match reg {
            Reg::A => self.a = value,
            Reg::X => self.x = value,
            Reg::L => self.l = value,
            Reg::B => self.b = value,
            Reg::S => self.s = value,
            Reg::T => self.t = value,
            Reg::Pc => self.pc = value,
            Reg::Sw => self.sw = Cond::from_i32(value),
        }
    }

    pub fn cond(&self) -> Cond {
        self.sw
    }

    pub fn pc(&self) -> i32 {
        self.pc
    }

    /// Back to the all-zero / Equal state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
