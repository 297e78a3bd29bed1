use std::io::Read;

use crate::error::{LoadError, StackError};
use crate::registers::{IndexRegister, ProgramCounter};

pub type TypeAddr = u16; // in reality u12
type FontBytes = [u8; 5 * 16];

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: TypeAddr = 0x200;
pub const BYTES_PER_GLYPH: u8 = 5;
pub const STACK_DEPTH: usize = 16;

/// Largest ROM that fits between `PROGRAM_START` and the top of memory.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

const DEFAULT_FONT: FontBytes = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub struct Memory {
    // 4k bytes
    // font data stored from 000 -> 04F, programs from 200
    bytes: [u8; MEMORY_SIZE],
    pub pc: ProgramCounter,
    pub index: IndexRegister,
    pub stack: Stack,
}

impl Memory {
    pub fn new() -> Self {
        let mut mem = Self {
            bytes: [0; MEMORY_SIZE],
            pc: ProgramCounter(PROGRAM_START),
            index: IndexRegister(0x0),
            stack: Stack::new(),
        };
        mem.reset();
        mem
    }

    /// Zero everything, seed the font table and point pc at the program.
    pub fn reset(&mut self) {
        self.bytes = [0; MEMORY_SIZE];
        self.bytes[..DEFAULT_FONT.len()].copy_from_slice(&DEFAULT_FONT);
        self.pc = ProgramCounter(PROGRAM_START);
        self.index = IndexRegister(0x0);
        self.stack.clear();
    }

    pub fn set(&mut self, addr: TypeAddr, val: u8) {
        self.bytes[Self::mask(addr)] = val;
    }

    pub fn get(&self, addr: TypeAddr) -> u8 {
        self.bytes[Self::mask(addr)]
    }

    /// Big-endian word at `addr`.
    pub fn word(&self, addr: TypeAddr) -> u16 {
        let (l, r) = (self.get(addr), self.get(addr.wrapping_add(1)));
        ((l as u16) << 8) | r as u16
    }

    /// `len` bytes starting at `start`, or the end of the requested range
    /// when it runs past the top of memory.
    pub fn range(&self, start: usize, len: usize) -> Result<&[u8], usize> {
        Self::check(start, len)?;
        Ok(&self.bytes[start..start + len])
    }

    pub fn range_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8], usize> {
        Self::check(start, len)?;
        Ok(&mut self.bytes[start..start + len])
    }

    /// Copy a ROM in at `PROGRAM_START`, returning how many bytes were
    /// loaded.
    pub fn load_rom(&mut self, reader: &mut impl Read) -> Result<usize, LoadError> {
        // one byte more than fits tells us whether the stream ended in time
        let mut program = Vec::with_capacity(MAX_ROM_SIZE + 1);
        reader
            .take(MAX_ROM_SIZE as u64 + 1)
            .read_to_end(&mut program)?;

        if program.is_empty() {
            return Err(LoadError::EmptyRom);
        }
        if program.len() > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge { max: MAX_ROM_SIZE });
        }

        let start = PROGRAM_START as usize;
        self.bytes[start..start + program.len()].copy_from_slice(&program);
        Ok(program.len())
    }

    fn check(start: usize, len: usize) -> Result<(), usize> {
        match start.checked_add(len) {
            Some(end) if end <= MEMORY_SIZE => Ok(()),
            _ => Err(start.saturating_add(len).max(MEMORY_SIZE)),
        }
    }

    fn mask(addr: TypeAddr) -> usize {
        addr as usize & (MEMORY_SIZE - 1)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity return address stack.
#[derive(Debug)]
pub struct Stack {
    addresses: [TypeAddr; STACK_DEPTH],
    depth: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            addresses: [0; STACK_DEPTH],
            depth: 0,
        }
    }

    pub fn push(&mut self, addr: TypeAddr) -> Result<(), StackError> {
        if self.depth == STACK_DEPTH {
            return Err(StackError::Overflow);
        }
        self.addresses[self.depth] = addr;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<TypeAddr, StackError> {
        if self.depth == 0 {
            return Err(StackError::Underflow);
        }
        self.depth -= 1;
        Ok(self.addresses[self.depth])
    }

    pub fn len(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    pub fn clear(&mut self) {
        self.addresses = [0; STACK_DEPTH];
        self.depth = 0;
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
