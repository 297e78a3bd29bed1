//! Instruction-level diagnostics sink handed to the emulator.

use crate::decode::OpCodes;
use crate::error::Fault;
use crate::memory::TypeAddr;

/// Receives a record of every executed instruction and any fault.
pub trait Trace {
    fn instruction(&mut self, pc: TypeAddr, opcode: u16, op: &OpCodes);

    fn fault(&mut self, _fault: &Fault) {}
}

/// Forwards to the `log` facade at `trace`/`error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl Trace for LogTrace {
    fn instruction(&mut self, pc: TypeAddr, opcode: u16, op: &OpCodes) {
        log::trace!("pc={pc:#05X} opcode={opcode:#06X} {op:?}");
    }

    fn fault(&mut self, fault: &Fault) {
        log::error!("{fault}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl Trace for NullTrace {
    fn instruction(&mut self, _pc: TypeAddr, _opcode: u16, _op: &OpCodes) {}
}
