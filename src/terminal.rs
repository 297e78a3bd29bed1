use std::io::{self, Write};

use crate::display::{FrameBuffer, HEIGHT, WIDTH};
use crate::error::FrontendError;
use crate::frontend::{Input, NoInput, Screen};
use crate::keyboard::Keypad;

const CLEAR_AND_HOME: &str = "\x1b[2J\x1b[H";
const LIT: char = '█';
const UNLIT: char = ' ';

/// Prints frames as text. Keys come from `input`, which reads nothing
/// unless another source is supplied.
pub struct TextScreen<W: Write, I: Input = NoInput> {
    out: W,
    input: I,
}

impl TextScreen<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextScreen<W> {
    pub fn new(out: W) -> Self {
        Self::with_input(out, NoInput)
    }
}

impl<W: Write, I: Input> TextScreen<W, I> {
    pub fn with_input(out: W, input: I) -> Self {
        Self { out, input }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn render(frame: &FrameBuffer) -> String {
    let mut text = String::with_capacity((WIDTH * LIT.len_utf8() + 1) * HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            text.push(if frame.pixel(x, y) { LIT } else { UNLIT });
        }
        text.push('\n');
    }
    text
}

impl<W: Write, I: Input> Screen for TextScreen<W, I> {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), FrontendError> {
        write!(self.out, "{CLEAR_AND_HOME}{}", render(frame))?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write, I: Input> Input for TextScreen<W, I> {
    fn poll(&mut self) -> Keypad {
        self.input.poll()
    }
}
