use std::io;

use thiserror::Error;

use crate::memory::TypeAddr;

/// Reasons a ROM could not be placed in memory. The engine never starts
/// after one of these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM is empty")]
    EmptyRom,

    #[error("ROM does not fit in memory (max {max} bytes)")]
    RomTooLarge { max: usize },

    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),
}

/// Fatal execution faults. Every one of these stops the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unimplemented opcode {opcode:#06X} at pc {pc:#05X}")]
    UnimplementedOpcode { opcode: u16, pc: TypeAddr },

    #[error("stack overflow on opcode {opcode:#06X} at pc {pc:#05X}")]
    StackOverflow { opcode: u16, pc: TypeAddr },

    #[error("return with empty call stack at pc {pc:#05X}")]
    StackUnderflow { opcode: u16, pc: TypeAddr },

    #[error("program counter {pc:#05X} is misaligned or outside program memory")]
    MisalignedProgramCounter { pc: TypeAddr },

    #[error("opcode {opcode:#06X} at pc {pc:#05X} touched memory at {addr:#06X}")]
    MemoryOutOfBounds {
        opcode: u16,
        pc: TypeAddr,
        addr: usize,
    },
}

impl Fault {
    pub fn pc(&self) -> TypeAddr {
        match *self {
            Fault::UnimplementedOpcode { pc, .. }
            | Fault::StackOverflow { pc, .. }
            | Fault::StackUnderflow { pc, .. }
            | Fault::MisalignedProgramCounter { pc }
            | Fault::MemoryOutOfBounds { pc, .. } => pc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("call stack is full")]
    Overflow,

    #[error("call stack is empty")]
    Underflow,
}

/// Failures raised by the window, terminal and audio collaborators.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("window: {0}")]
    Window(#[from] minifb::Error),

    #[error("audio: {0}")]
    Audio(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
