use std::time::Duration;

pub const TIMER_DEC_PER_SECOND: u64 = 60;

/// One scheduler frame; timers count down once per frame.
pub const FRAME_BUDGET: Duration = Duration::from_nanos(1_000_000_000 / TIMER_DEC_PER_SECOND);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub count: u8,
}

impl Timer {
    pub fn new(init_count: u8) -> Self {
        Self { count: init_count }
    }

    pub fn set(&mut self, value: u8) {
        self.count = value;
    }

    /// Count down one step, stopping at zero. Returns whether the timer was
    /// still running before the step.
    pub fn tick(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    pub fn is_active(&self) -> bool {
        self.count > 0
    }
}

/// Delay and sound timers, ticked together once per frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: Timer,
    pub sound: Timer,
}

impl Timers {
    pub fn tick(&mut self) {
        self.delay.tick();
        self.sound.tick();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
