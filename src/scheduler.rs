use std::time::{Duration, Instant};

use crate::emulator::{CycleResult, Emulator};
use crate::error::{Fault, FrontendError};
use crate::frontend::{Buzzer, Input, Screen};
use crate::memory::TypeAddr;
use crate::timer::FRAME_BUDGET;

/// Instructions run per 1/60 s frame unless configured otherwise.
pub const OPCODES_PER_FRAME: usize = 5;

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The program parked itself on a `1NNN` jump to its own address.
    SelfLoopHalt { pc: TypeAddr },
    Fault(Fault),
    /// The user closed the frontend.
    Closed,
}

/// Waits out whatever is left of a frame.
pub trait Pacer {
    fn pace(&mut self, remaining: Duration);
}

/// Sleeps with `spin_sleep` for accurate sub-millisecond frames.
#[derive(Debug, Default)]
pub struct SpinPacer;

impl Pacer for SpinPacer {
    fn pace(&mut self, remaining: Duration) {
        if !remaining.is_zero() {
            spin_sleep::sleep(remaining);
        }
    }
}

/// Fixed-timestep driver: a batch of cycles, a present if the frame
/// changed, one timer tick, then sleep until the next frame.
pub struct Scheduler<P: Pacer> {
    opcodes_per_frame: usize,
    frame_budget: Duration,
    pacer: P,
    frames: u64,
}

impl Scheduler<SpinPacer> {
    pub fn new(opcodes_per_frame: usize) -> Self {
        Self::with_pacer(opcodes_per_frame, SpinPacer)
    }
}

impl<P: Pacer> Scheduler<P> {
    pub fn with_pacer(opcodes_per_frame: usize, pacer: P) -> Self {
        Self {
            opcodes_per_frame,
            frame_budget: FRAME_BUDGET,
            pacer,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Run frames until the program halts, faults or the user quits.
    pub fn run<H, B>(
        &mut self,
        emu: &mut Emulator,
        host: &mut H,
        buzzer: &mut B,
    ) -> Result<Termination, FrontendError>
    where
        H: Screen + Input,
        B: Buzzer,
    {
        log::info!(
            "running at {} instructions per frame",
            self.opcodes_per_frame
        );
        loop {
            if let Some(termination) = self.run_frame(emu, host, buzzer)? {
                log::info!("stopped after {} frames: {termination:?}", self.frames);
                return Ok(termination);
            }
        }
    }

    /// One frame. Returns the termination reason if the machine stopped.
    pub fn run_frame<H, B>(
        &mut self,
        emu: &mut Emulator,
        host: &mut H,
        buzzer: &mut B,
    ) -> Result<Option<Termination>, FrontendError>
    where
        H: Screen + Input,
        B: Buzzer,
    {
        let started = Instant::now();
        if !host.is_open() {
            return Ok(Some(Termination::Closed));
        }
        emu.set_keypad(host.poll());

        let mut termination = None;
        let mut slots = self.opcodes_per_frame;
        while slots > 0 {
            // a resolved FX0A wait does not use up a slot
            let resolving = emu.is_awaiting_key();
            match emu.cycle() {
                Ok(CycleResult::Executed) if resolving => {}
                Ok(CycleResult::Executed) => slots -= 1,
                // parked on FX0A until a later frame brings a key
                Ok(CycleResult::AwaitingKey) => break,
                Ok(CycleResult::Halted) => {
                    termination = Some(Termination::SelfLoopHalt { pc: emu.pc() });
                    break;
                }
                Err(fault) => {
                    termination = Some(Termination::Fault(fault));
                    break;
                }
            }
        }

        if let Some(frame) = emu.take_frame() {
            host.present(frame)?;
        }
        emu.sync_timers();
        buzzer.set_active(emu.sound_active())?;
        self.frames += 1;

        if termination.is_none() {
            self.pacer
                .pace(self.frame_budget.saturating_sub(started.elapsed()));
        }
        Ok(termination)
    }
}
