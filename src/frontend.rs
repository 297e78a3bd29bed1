//! Collaborators that sit outside the machine: something to show frames,
//! something to read keys from and something to beep.

use crate::display::FrameBuffer;
use crate::error::FrontendError;
use crate::keyboard::Keypad;

/// Shows the framebuffer. Only called when the frame changed.
pub trait Screen {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), FrontendError>;

    /// False once the user has asked to quit.
    fn is_open(&self) -> bool {
        true
    }
}

/// Supplies a keypad snapshot once per frame.
pub trait Input {
    fn poll(&mut self) -> Keypad;
}

/// Tone output driven by the sound timer.
pub trait Buzzer {
    fn set_active(&mut self, on: bool) -> Result<(), FrontendError>;
}

impl<B: Buzzer + ?Sized> Buzzer for Box<B> {
    fn set_active(&mut self, on: bool) -> Result<(), FrontendError> {
        (**self).set_active(on)
    }
}

/// No audio device.
#[derive(Debug, Default)]
pub struct Mute;

impl Buzzer for Mute {
    fn set_active(&mut self, _on: bool) -> Result<(), FrontendError> {
        Ok(())
    }
}

/// Keypad that never reports a press.
#[derive(Debug, Default)]
pub struct NoInput;

impl Input for NoInput {
    fn poll(&mut self) -> Keypad {
        Keypad::new()
    }
}
