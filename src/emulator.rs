use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    decode::OpCodes,
    display::{FrameBuffer, HEIGHT, WIDTH},
    error::{Fault, LoadError, StackError},
    keyboard::Keypad,
    memory::{Memory, TypeAddr, BYTES_PER_GLYPH, MEMORY_SIZE, PROGRAM_START},
    registers::Registers,
    timer::Timers,
    trace::{LogTrace, Trace},
};

/// Outcome of a single `cycle()` that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    Executed,
    /// Parked on FX0A; no instruction was consumed.
    AwaitingKey,
    /// `1NNN` jumped to itself.
    Halted,
}

// FX0A in progress. `held` is the set of keys that were already down, which
// must be released before they count as a new press.
#[derive(Debug, Clone, Copy)]
struct KeyWait {
    register: u8,
    held: u16,
}

pub struct Emulator {
    fb: FrameBuffer,
    pub regs: Registers,
    pub mem: Memory,
    pub timers: Timers,
    keypad: Keypad,
    key_wait: Option<KeyWait>,
    rom_bytes: usize,
    rng: StdRng,
    trace: Box<dyn Trace>,
}

impl Emulator {
    pub fn init() -> Self {
        Self::with_trace(LogTrace)
    }

    pub fn with_trace(trace: impl Trace + 'static) -> Self {
        let mut emu = Self {
            fb: FrameBuffer::new(),
            regs: Registers::new(),
            mem: Memory::new(),
            timers: Timers::default(),
            keypad: Keypad::new(),
            key_wait: None,
            rom_bytes: 0,
            rng: StdRng::from_entropy(),
            trace: Box::new(trace),
        };
        emu.reset();
        emu
    }

    /// Make `CXNN` deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn reset(&mut self) {
        log::debug!("resetting machine state");
        self.regs.reset();
        self.mem.reset();
        self.fb.reset();
        self.timers.reset();
        self.keypad = Keypad::new();
        self.key_wait = None;
        self.rom_bytes = 0;
    }

    /// Copy a program in at 0x200. Returns the number of bytes loaded.
    pub fn load_rom(&mut self, reader: &mut impl Read) -> Result<usize, LoadError> {
        let loaded = self.mem.load_rom(reader)?;
        self.rom_bytes = loaded;
        Ok(loaded)
    }

    pub fn load_rom_by_file(&mut self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let loaded = self.load_rom(&mut reader)?;
        log::info!("loaded {} ({loaded} bytes)", path.display());
        Ok(loaded)
    }

    pub fn rom_bytes(&self) -> usize {
        self.rom_bytes
    }

    pub fn pc(&self) -> TypeAddr {
        self.mem.pc.0
    }

    pub fn index(&self) -> TypeAddr {
        self.mem.index.0
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.fb
    }

    /// The framebuffer if it changed since the last call.
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.fb.take_dirty() {
            Some(&self.fb)
        } else {
            None
        }
    }

    pub fn set_keypad(&mut self, keypad: Keypad) {
        self.keypad = keypad;
    }

    pub fn is_awaiting_key(&self) -> bool {
        self.key_wait.is_some()
    }

    pub fn sound_active(&self) -> bool {
        self.timers.sound.is_active()
    }

    pub fn sync_timers(&mut self) {
        self.timers.tick();
    }

    /// Run one instruction, or re-check the keypad while parked on FX0A.
    pub fn cycle(&mut self) -> Result<CycleResult, Fault> {
        if let Some(wait) = self.key_wait {
            return Ok(self.resolve_key_wait(wait));
        }

        let result = self
            .fetch_decode()
            .and_then(|(pc, opcode, operation)| {
                self.trace.instruction(pc, opcode, &operation);
                self.execute_ins(pc, opcode, operation)
            });
        if let Err(fault) = &result {
            self.trace.fault(fault);
        }
        result
    }

    /// Fetch the word at pc, step pc past it and decode.
    pub fn fetch_decode(&mut self) -> Result<(TypeAddr, u16, OpCodes), Fault> {
        let pc = self.mem.pc.0;
        if pc % 2 != 0 || pc < PROGRAM_START || pc as usize + 1 >= MEMORY_SIZE {
            return Err(Fault::MisalignedProgramCounter { pc });
        }
        let ins = self.mem.word(pc);
        self.mem.pc.increment();
        Ok((pc, ins, OpCodes::decode_raw(ins)))
    }

    /// Apply a decoded instruction fetched from `pc`. On entry the program
    /// counter already points past it.
    pub fn execute_ins(
        &mut self,
        pc: TypeAddr,
        opcode: u16,
        ins: OpCodes,
    ) -> Result<CycleResult, Fault> {
        let out_of_bounds = |addr: usize| Fault::MemoryOutOfBounds { opcode, pc, addr };

        match ins {
            OpCodes::ClearScreen => {
                self.fb.clear_buffer();
            }
            OpCodes::Jump(addr) => {
                self.mem.pc.set_addr(addr);
                if addr == pc {
                    log::info!("self-loop at {pc:#05X}, halting");
                    return Ok(CycleResult::Halted);
                }
            }
            OpCodes::SetRegister(vx, nn) => {
                self.regs.set_register(vx, nn);
            }
            OpCodes::AddToRegister(vx, nn) => {
                self.regs.add_to_register(vx, nn);
            }
            OpCodes::SetIndexRegister(addr) => self.mem.index.set_addr(addr),
            OpCodes::Display(reg_x, reg_y, height) => {
                let (x, y) = (self.regs.get(reg_x), self.regs.get(reg_y));
                // off-grid origins skip the draw before any sprite memory is read
                if x as usize >= WIDTH || y as usize >= HEIGHT {
                    self.regs.set_flag(false);
                    return Ok(CycleResult::Executed);
                }
                let start = self.mem.index.0 as usize;
                let sprite = self
                    .mem
                    .range(start, height as usize)
                    .map_err(out_of_bounds)?;
                let vf = self.fb.paint(x, y, sprite);
                self.regs.set_flag(vf);
            }
            OpCodes::PushSubroutine(addr) => {
                // pc already holds the return address
                self.mem
                    .stack
                    .push(self.mem.pc.0)
                    .map_err(|_| Fault::StackOverflow { opcode, pc })?;
                self.mem.pc.set_addr(addr);
            }
            OpCodes::PopSubroutine => {
                let addr = self.mem.stack.pop().map_err(|err| match err {
                    StackError::Underflow => Fault::StackUnderflow { opcode, pc },
                    StackError::Overflow => Fault::StackOverflow { opcode, pc },
                })?;
                self.mem.pc.set_addr(addr);
            }
            OpCodes::CopyRegister(vx, vy) => {
                self.regs.set_register(vx, self.regs.get(vy));
            }
            OpCodes::Or(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vy) | self.regs.get(vx));
            }
            OpCodes::And(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vy) & self.regs.get(vx));
            }
            OpCodes::XOr(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vy) ^ self.regs.get(vx));
            }
            OpCodes::Add(vx, vy) => {
                let (sum, carry) = self.regs.get(vx).overflowing_add(self.regs.get(vy));
                self.regs.set_register(vx, sum);
                self.regs.set_flag(carry);
            }
            OpCodes::SubtractForward(vx, vy) => {
                let (diff, borrow) = self.regs.get(vx).overflowing_sub(self.regs.get(vy));
                self.regs.set_register(vx, diff);
                self.regs.set_flag(!borrow); // 1 means no borrow
            }
            OpCodes::SubtractBackward(vx, vy) => {
                let (diff, borrow) = self.regs.get(vy).overflowing_sub(self.regs.get(vx));
                self.regs.set_register(vx, diff);
                self.regs.set_flag(!borrow);
            }
            OpCodes::LeftShift(vx, _) => {
                let vx_value = self.regs.get(vx);
                self.regs.set_register(vx, vx_value << 1);
                self.regs.set_register(0xF, vx_value >> 7);
            }
            OpCodes::RightShift(vx, _) => {
                let vx_value = self.regs.get(vx);
                self.regs.set_register(vx, vx_value >> 1);
                self.regs.set_register(0xF, vx_value & 1);
            }
            OpCodes::Random(vx, nn) => {
                let ransuu: u8 = self.rng.gen();
                self.regs.set_register(vx, nn & ransuu);
            }
            OpCodes::JumpWithOffset(addr) => {
                self.mem.pc.set_addr(addr + self.regs.get(0) as u16);
            }
            OpCodes::AddToIndex(vx) => {
                let index = self.mem.index.0 + self.regs.get(vx) as u16;
                self.mem.index.set_addr(index);
            }
            OpCodes::SkipEqualConstant(vx, nn) => {
                if self.regs.get(vx) == nn {
                    self.mem.pc.increment();
                }
            }
            OpCodes::SkipNotEqualConstant(vx, nn) => {
                if self.regs.get(vx) != nn {
                    self.mem.pc.increment();
                }
            }
            OpCodes::SkipEqualRegister(vx, vy) => {
                if self.regs.get(vx) == self.regs.get(vy) {
                    self.mem.pc.increment();
                }
            }
            OpCodes::SkipNotEqualRegister(vx, vy) => {
                if self.regs.get(vx) != self.regs.get(vy) {
                    self.mem.pc.increment();
                }
            }
            OpCodes::PointChar(vx) => {
                let glyph = self.regs.get(vx) as u16;
                self.mem.index.set_addr(glyph * BYTES_PER_GLYPH as u16);
            }
            OpCodes::ToDecimal(vx) => {
                let value = self.regs.get(vx);
                let start = self.mem.index.0 as usize;
                let digits = self.mem.range_mut(start, 3).map_err(out_of_bounds)?;
                digits.copy_from_slice(&[value / 100, value / 10 % 10, value % 10]);
            }
            OpCodes::SkipIfPressed(vx) => {
                if self.keypad.is_pressed(self.regs.get(vx)) {
                    self.mem.pc.increment();
                }
            }
            OpCodes::SkipIfNotPressed(vx) => {
                if !self.keypad.is_pressed(self.regs.get(vx)) {
                    self.mem.pc.increment();
                }
            }
            OpCodes::CopyDelayToRegister(vx) => self.regs.set_register(vx, self.timers.delay.count),
            OpCodes::CopyRegisterToDelay(vx) => self.timers.delay.set(self.regs.get(vx)),
            OpCodes::CopyRegisterToSound(vx) => self.timers.sound.set(self.regs.get(vx)),
            OpCodes::GetKey(vx) => {
                // stay on this instruction until a key arrives
                self.mem.pc.set_addr(pc);
                self.key_wait = Some(KeyWait {
                    register: vx,
                    held: self.keypad.mask(),
                });
                return Ok(CycleResult::AwaitingKey);
            }
            OpCodes::LoadRegisterFromMemory(vx) => {
                let start = self.mem.index.0 as usize;
                let values = self
                    .mem
                    .range(start, vx as usize + 1)
                    .map_err(out_of_bounds)?;
                for (reg, reg_val) in values.iter().enumerate() {
                    self.regs.set_register(reg as u8, *reg_val);
                }
            }
            OpCodes::StoreRegisterToMemory(vx) => {
                let start = self.mem.index.0 as usize;
                let count = vx as usize + 1;
                let dest = self.mem.range_mut(start, count).map_err(out_of_bounds)?;
                dest.copy_from_slice(&self.regs.as_slice()[..count]);
            }
            OpCodes::Unimplemented(ins) => {
                return Err(Fault::UnimplementedOpcode { opcode: ins, pc });
            }
        }
        Ok(CycleResult::Executed)
    }

    fn resolve_key_wait(&mut self, mut wait: KeyWait) -> CycleResult {
        let pressed = self.keypad.mask();
        wait.held &= pressed;
        let fresh = pressed & !wait.held;
        if fresh == 0 {
            self.key_wait = Some(wait);
            return CycleResult::AwaitingKey;
        }

        let key = fresh.trailing_zeros() as u8;
        log::debug!("key {key:X} satisfied wait on V{:X}", wait.register);
        self.regs.set_register(wait.register, key);
        self.key_wait = None;
        self.mem.pc.increment();
        CycleResult::Executed
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::init()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::memory::STACK_DEPTH;
    use crate::trace::NullTrace;

    fn emu_with(rom: &[u8]) -> Emulator {
        let mut emu = Emulator::with_trace(NullTrace).with_seed(7);
        emu.load_rom(&mut &rom[..]).unwrap();
        emu
    }

    fn run(emu: &mut Emulator, cycles: usize) {
        for _ in 0..cycles {
            assert_eq!(emu.cycle(), Ok(CycleResult::Executed));
        }
    }

    #[test]
    fn test_two_instruction_program() {
        let mut emu = emu_with(&[0x60, 0x0A, 0x70, 0x05]);
        run(&mut emu, 2);
        assert_eq!(emu.regs.get(0), 15);
        assert_eq!(emu.pc(), 0x204);
        assert_eq!(emu.rom_bytes(), 4);
    }

    #[test]
    fn test_set_every_register() {
        for x in 0..16u8 {
            let mut emu = emu_with(&[0x60 | x, 0xA5]);
            run(&mut emu, 1);
            assert_eq!(emu.regs.get(x), 0xA5);
        }
    }

    #[test]
    fn test_add_immediate_wraps_without_flag() {
        let mut emu = emu_with(&[0x70, 0xC8, 0x70, 0xC8]);
        emu.regs.set_register(0xF, 0x42);
        run(&mut emu, 2);
        assert_eq!(emu.regs.get(0), ((200u16 + 200) % 256) as u8);
        assert_eq!(emu.regs.get(0xF), 0x42);
    }

    #[test]
    fn test_self_loop_halts() {
        let mut emu = emu_with(&[0x12, 0x00]);
        assert_eq!(emu.cycle(), Ok(CycleResult::Halted));
        assert_eq!(emu.pc(), 0x200);
    }

    #[test]
    fn test_jump_elsewhere_does_not_halt() {
        let mut emu = emu_with(&[0x12, 0x04, 0x00, 0x00, 0x12, 0x04]);
        assert_eq!(emu.cycle(), Ok(CycleResult::Executed));
        assert_eq!(emu.pc(), 0x204);
        assert_eq!(emu.cycle(), Ok(CycleResult::Halted));
    }

    #[test]
    fn test_add_sets_carry_iff_overflow() {
        for (vx, vy) in [(0u8, 0u8), (255, 1), (128, 127), (128, 128), (200, 100), (255, 255)] {
            let mut emu = emu_with(&[0x81, 0x24]);
            emu.regs.set_register(1, vx);
            emu.regs.set_register(2, vy);
            run(&mut emu, 1);
            assert_eq!(emu.regs.get(1), vx.wrapping_add(vy));
            assert_eq!(emu.regs.get(0xF), (vx as u16 + vy as u16 > 255) as u8);
        }
    }

    #[test]
    fn test_subtract_borrow_flag() {
        for (vx, vy) in [(5u8, 3u8), (3, 5), (7, 7), (0, 255)] {
            let mut emu = emu_with(&[0x81, 0x25]);
            emu.regs.set_register(1, vx);
            emu.regs.set_register(2, vy);
            run(&mut emu, 1);
            assert_eq!(emu.regs.get(1), vx.wrapping_sub(vy));
            assert_eq!(emu.regs.get(0xF), if vy > vx { 0 } else { 1 });
        }
    }

    #[test]
    fn test_subtract_backward() {
        let mut emu = emu_with(&[0x81, 0x27, 0x83, 0x47]);
        emu.regs.set_register(1, 3);
        emu.regs.set_register(2, 10);
        emu.regs.set_register(3, 10);
        emu.regs.set_register(4, 3);
        run(&mut emu, 1);
        assert_eq!((emu.regs.get(1), emu.regs.get(0xF)), (7, 1));
        run(&mut emu, 1);
        assert_eq!((emu.regs.get(3), emu.regs.get(0xF)), (249, 0));
    }

    #[test]
    fn test_logic_ops() {
        let mut emu = emu_with(&[0x81, 0x21, 0x83, 0x22, 0x85, 0x23, 0x86, 0x20]);
        for (reg, value) in [(1, 0b1100), (2, 0b1010), (3, 0b1100), (5, 0b1100)] {
            emu.regs.set_register(reg, value);
        }
        run(&mut emu, 4);
        assert_eq!(emu.regs.get(1), 0b1110);
        assert_eq!(emu.regs.get(3), 0b1000);
        assert_eq!(emu.regs.get(5), 0b0110);
        assert_eq!(emu.regs.get(6), 0b1010);
    }

    #[test]
    fn test_shifts_operate_on_vx() {
        let mut emu = emu_with(&[0x81, 0x26, 0x83, 0x4E]);
        emu.regs.set_register(1, 0b0000_0101);
        emu.regs.set_register(2, 0xFF);
        emu.regs.set_register(3, 0b1000_0001);
        run(&mut emu, 1);
        assert_eq!((emu.regs.get(1), emu.regs.get(0xF)), (0b10, 1));
        run(&mut emu, 1);
        assert_eq!((emu.regs.get(3), emu.regs.get(0xF)), (0b10, 1));
        assert_eq!(emu.regs.get(2), 0xFF);
    }

    #[test]
    fn test_flag_register_as_operand_ends_with_flag() {
        let mut emu = emu_with(&[0x8F, 0xE4]);
        emu.regs.set_register(0xF, 200);
        emu.regs.set_register(0xE, 100);
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(0xF), 1);
    }

    #[test]
    fn test_skips() {
        // (opcode, V1, V2, skipped)
        let cases = [
            (0x3107u16, 7u8, 0u8, true),
            (0x3107, 8, 0, false),
            (0x4107, 8, 0, true),
            (0x4107, 7, 0, false),
            (0x5120, 4, 4, true),
            (0x5120, 4, 5, false),
            (0x9120, 4, 5, true),
            (0x9120, 4, 4, false),
        ];
        for (opcode, v1, v2, skipped) in cases {
            let mut emu = emu_with(&opcode.to_be_bytes());
            emu.regs.set_register(1, v1);
            emu.regs.set_register(2, v2);
            run(&mut emu, 1);
            let expected = if skipped { 0x204 } else { 0x202 };
            assert_eq!(emu.pc(), expected, "{opcode:04X} with V1={v1} V2={v2}");
        }
    }

    #[test]
    fn test_call_and_return() {
        let mut rom = vec![0x00; 0x12];
        rom[0x00..0x02].copy_from_slice(&[0x22, 0x10]); // call 0x210
        rom[0x10..0x12].copy_from_slice(&[0x00, 0xEE]); // return
        let mut emu = emu_with(&rom);
        run(&mut emu, 1);
        assert_eq!(emu.pc(), 0x210);
        assert_eq!(emu.mem.stack.len(), 1);
        run(&mut emu, 1);
        assert_eq!(emu.pc(), 0x202);
        assert!(emu.mem.stack.is_empty());
    }

    #[test]
    fn test_return_with_empty_stack() {
        let mut emu = emu_with(&[0x00, 0xEE]);
        assert_eq!(
            emu.cycle(),
            Err(Fault::StackUnderflow {
                opcode: 0x00EE,
                pc: 0x200
            })
        );
    }

    #[test]
    fn test_seventeenth_call_overflows() {
        // each call lands on the next call instruction
        let mut rom = Vec::new();
        for i in 0..=STACK_DEPTH as u16 {
            let target = 0x202 + 2 * i;
            rom.extend_from_slice(&[0x20 | (target >> 8) as u8, target as u8]);
        }
        let mut emu = emu_with(&rom);
        run(&mut emu, STACK_DEPTH);
        assert_eq!(
            emu.cycle(),
            Err(Fault::StackOverflow {
                opcode: 0x2222,
                pc: 0x220
            })
        );
    }

    #[test]
    fn test_unimplemented_opcode() {
        let mut emu = emu_with(&[0x51, 0x21]);
        assert_eq!(
            emu.cycle(),
            Err(Fault::UnimplementedOpcode {
                opcode: 0x5121,
                pc: 0x200
            })
        );
    }

    #[test]
    fn test_jump_with_offset_to_odd_address_faults() {
        let mut emu = emu_with(&[0xB3, 0x00]);
        emu.regs.set_register(0, 1);
        run(&mut emu, 1);
        assert_eq!(emu.pc(), 0x301);
        assert_eq!(
            emu.cycle(),
            Err(Fault::MisalignedProgramCounter { pc: 0x301 })
        );
    }

    #[test]
    fn test_running_off_the_end_faults() {
        let mut emu = emu_with(&[0x1F, 0xFE]);
        emu.mem.set(0xFFE, 0x60);
        emu.mem.set(0xFFF, 0x01);
        run(&mut emu, 2);
        assert_eq!(emu.pc(), 0x1000);
        assert_eq!(
            emu.cycle(),
            Err(Fault::MisalignedProgramCounter { pc: 0x1000 })
        );
    }

    #[test]
    fn test_index_ops() {
        let mut emu = emu_with(&[0xA1, 0x23, 0xF1, 0x1E, 0xF2, 0x29]);
        emu.regs.set_register(1, 0x10);
        emu.regs.set_register(2, 0xB);
        run(&mut emu, 2);
        assert_eq!(emu.index(), 0x133);
        run(&mut emu, 1);
        assert_eq!(emu.index(), 55);
    }

    #[test]
    fn test_bcd() {
        let mut emu = emu_with(&[0xA3, 0x00, 0xF5, 0x33]);
        emu.regs.set_register(5, 254);
        run(&mut emu, 2);
        assert_eq!(emu.mem.range(0x300, 3).unwrap(), &[2, 5, 4]);
    }

    #[test]
    fn test_store_and_load_registers() {
        let mut emu = emu_with(&[0xA4, 0x00, 0xF3, 0x55, 0x60, 0x00, 0xF3, 0x65]);
        for reg in 0..4 {
            emu.regs.set_register(reg, reg + 10);
        }
        emu.regs.set_register(4, 99);
        run(&mut emu, 2);
        assert_eq!(emu.mem.range(0x400, 5).unwrap(), &[10, 11, 12, 13, 0]);
        assert_eq!(emu.index(), 0x400);
        run(&mut emu, 2);
        assert_eq!(emu.regs.get(0), 10);
        assert_eq!(emu.regs.get(3), 13);
        assert_eq!(emu.regs.get(4), 99);
    }

    #[test]
    fn test_store_past_end_of_memory_faults() {
        let mut emu = emu_with(&[0xAF, 0xFE, 0xF3, 0x55]);
        run(&mut emu, 1);
        assert_eq!(
            emu.cycle(),
            Err(Fault::MemoryOutOfBounds {
                opcode: 0xF355,
                pc: 0x202,
                addr: 0x1002
            })
        );
    }

    #[test]
    fn test_index_relative_ops_fault_near_top_of_memory() {
        // I = 0xFFE, then draw 5 rows, BCD or load 4 registers
        for (ins, addr) in [(0xD015u16, 0x1003usize), (0xF033, 0x1001), (0xF365, 0x1002)] {
            let mut rom = vec![0xAF, 0xFE];
            rom.extend_from_slice(&ins.to_be_bytes());
            let mut emu = emu_with(&rom);
            run(&mut emu, 1);
            assert_eq!(
                emu.cycle(),
                Err(Fault::MemoryOutOfBounds {
                    opcode: ins,
                    pc: 0x202,
                    addr
                })
            );
        }
    }

    #[test]
    fn test_off_grid_draw_reads_no_memory() {
        // V0 = 64, I = 0xFFE, draw 5 rows at (V0, V1)
        let mut emu = emu_with(&[0x60, 0x40, 0xAF, 0xFE, 0xD0, 0x15]);
        emu.regs.set_register(0xF, 1);
        run(&mut emu, 3);
        assert_eq!(emu.regs.get(0xF), 0);
        assert!(!emu.frame_buffer().is_dirty());
        assert!(emu.frame_buffer().as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_jump_with_offset() {
        let mut emu = emu_with(&[0xB3, 0x00]);
        emu.regs.set_register(0, 0x10);
        run(&mut emu, 1);
        assert_eq!(emu.pc(), 0x310);
    }

    #[test]
    fn test_jump_below_program_start_faults() {
        let mut emu = emu_with(&[0x11, 0x00]);
        run(&mut emu, 1);
        assert_eq!(
            emu.cycle(),
            Err(Fault::MisalignedProgramCounter { pc: 0x100 })
        );
    }

    #[test]
    fn test_draw_font_glyph_and_collision() {
        // V0 = 0, I = glyph 0, draw at (0,0) twice
        let mut emu = emu_with(&[0x60, 0x00, 0xF0, 0x29, 0xD0, 0x05, 0xD0, 0x05]);
        run(&mut emu, 3);
        assert_eq!(emu.regs.get(0xF), 0);
        assert_eq!(emu.frame_buffer().as_bytes()[0], 0xF0);
        assert!(emu.take_frame().is_some());
        assert!(emu.take_frame().is_none());
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(0xF), 1);
        assert!(emu.frame_buffer().as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_clear_screen_marks_dirty() {
        let mut emu = emu_with(&[0x00, 0xE0]);
        run(&mut emu, 1);
        assert!(emu.frame_buffer().is_dirty());
    }

    #[test]
    fn test_random_is_masked() {
        let mut emu = emu_with(&[0xC1, 0x0F, 0xC2, 0x00]);
        emu.regs.set_register(2, 0xFF);
        run(&mut emu, 2);
        assert_eq!(emu.regs.get(1) & 0xF0, 0);
        assert_eq!(emu.regs.get(2), 0);
    }

    #[test]
    fn test_random_is_reproducible_under_seed() {
        let draw = || {
            let mut emu = emu_with(&[0xC1, 0xFF, 0xC2, 0xFF]);
            run(&mut emu, 2);
            (emu.regs.get(1), emu.regs.get(2))
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn test_timers_from_registers() {
        let mut emu = emu_with(&[0xF1, 0x15, 0xF2, 0x18, 0xF3, 0x07]);
        emu.regs.set_register(1, 5);
        emu.regs.set_register(2, 1);
        run(&mut emu, 2);
        emu.sync_timers();
        assert!(!emu.sound_active());
        run(&mut emu, 1);
        assert_eq!(emu.regs.get(3), 4);
    }

    #[test]
    fn test_key_skips() {
        // (opcode, pressed, skipped); V1 holds key 0xA
        let cases: [(u16, &[u8], bool); 4] = [
            (0xE19E, &[0xA], true),
            (0xE19E, &[0xB], false),
            (0xE1A1, &[], true),
            (0xE1A1, &[0xA], false),
        ];
        for (opcode, pressed, skipped) in cases {
            let mut emu = emu_with(&opcode.to_be_bytes());
            emu.regs.set_register(1, 0xA);
            emu.set_keypad(Keypad::with_pressed(pressed));
            run(&mut emu, 1);
            let expected = if skipped { 0x204 } else { 0x202 };
            assert_eq!(emu.pc(), expected, "{opcode:04X} with {pressed:?}");
        }
    }

    #[test]
    fn test_wait_for_key() {
        let mut emu = emu_with(&[0xF4, 0x0A, 0x60, 0x01]);
        assert_eq!(emu.cycle(), Ok(CycleResult::AwaitingKey));
        assert!(emu.is_awaiting_key());
        assert_eq!(emu.cycle(), Ok(CycleResult::AwaitingKey));
        assert_eq!(emu.pc(), 0x200);

        emu.set_keypad(Keypad::with_pressed(&[0x9, 0x3]));
        assert_eq!(emu.cycle(), Ok(CycleResult::Executed));
        assert_eq!(emu.regs.get(4), 0x3);
        assert_eq!(emu.pc(), 0x202);
        assert!(!emu.is_awaiting_key());
    }

    #[test]
    fn test_wait_for_key_ignores_held_key() {
        let mut emu = emu_with(&[0xF4, 0x0A]);
        emu.set_keypad(Keypad::with_pressed(&[0x5]));
        assert_eq!(emu.cycle(), Ok(CycleResult::AwaitingKey));
        assert_eq!(emu.cycle(), Ok(CycleResult::AwaitingKey));

        emu.set_keypad(Keypad::new());
        assert_eq!(emu.cycle(), Ok(CycleResult::AwaitingKey));
        emu.set_keypad(Keypad::with_pressed(&[0x5]));
        assert_eq!(emu.cycle(), Ok(CycleResult::Executed));
        assert_eq!(emu.regs.get(4), 0x5);
    }

    #[test]
    fn test_empty_rom_is_rejected() {
        let mut emu = Emulator::with_trace(NullTrace);
        assert!(matches!(
            emu.load_rom(&mut &[0u8; 0][..]),
            Err(LoadError::EmptyRom)
        ));
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut emu = emu_with(&[0x60, 0x05, 0x00, 0xE0]);
        run(&mut emu, 2);
        emu.reset();
        assert_eq!(emu.regs.get(0), 0);
        assert_eq!(emu.pc(), 0x200);
        assert_eq!(emu.mem.get(0x200), 0);
        assert_eq!(emu.mem.get(0x000), 0xF0);
        assert!(!emu.frame_buffer().is_dirty());
    }

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<(TypeAddr, u16)>>>);

    impl Trace for Recorder {
        fn instruction(&mut self, pc: TypeAddr, opcode: u16, _op: &OpCodes) {
            self.0.borrow_mut().push((pc, opcode));
        }
    }

    #[test]
    fn test_trace_sees_each_instruction() {
        let recorder = Recorder::default();
        let mut emu = Emulator::with_trace(recorder.clone());
        emu.load_rom(&mut &[0x60u8, 0x01, 0x12, 0x02][..]).unwrap();
        emu.cycle().unwrap();
        emu.cycle().unwrap();
        assert_eq!(*recorder.0.borrow(), vec![(0x200, 0x6001), (0x202, 0x1202)]);
    }
}
