use crate::memory::TypeAddr;

pub const REGISTER_COUNT: usize = 16;
pub const FLAG: u8 = 0xF;

/// V0..VF. Arithmetic wraps modulo 256.
#[derive(Debug, Default)]
pub struct Registers {
    registers: [u8; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
        }
    }

    pub fn set_register(&mut self, reg_num: u8, value: u8) {
        self.registers[Self::slot(reg_num)] = value;
    }

    pub fn add_to_register(&mut self, reg_num: u8, value: u8) {
        let slot = Self::slot(reg_num);
        self.registers[slot] = self.registers[slot].wrapping_add(value);
    }

    pub fn get(&self, reg_num: u8) -> u8 {
        self.registers[Self::slot(reg_num)]
    }

    pub fn set_flag(&mut self, on: bool) {
        self.set_register(FLAG, on as u8);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.registers
    }

    pub fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
    }

    // register numbers come from a single nibble
    fn slot(reg_num: u8) -> usize {
        (reg_num & 0xF) as usize
    }
}

// Special registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter(pub TypeAddr);

impl ProgramCounter {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(2);
    }

    pub fn skip(&mut self) {
        self.0 = self.0.wrapping_add(4);
    }

    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }
}

/// Only the low 12 bits are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRegister(pub TypeAddr);

impl IndexRegister {
    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr & 0x0FFF;
    }
}
