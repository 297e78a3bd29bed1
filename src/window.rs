use minifb::{Key, Scale, Window, WindowOptions};

use crate::display::{FrameBuffer, HEIGHT, WIDTH};
use crate::error::FrontendError;
use crate::frontend::{Input, Screen};
use crate::keyboard::{Keypad, KEYMAP};
use crate::timer::FRAME_BUDGET;

const LIT: u32 = from_u8_rgb(0, 127, 255);
const UNLIT: u32 = from_u8_rgb(0, 0, 0);

const fn from_u8_rgb(r: u8, g: u8, b: u8) -> u32 {
    let (r, g, b) = (r as u32, g as u32, b as u32);
    (r << 16) | (g << 8) | b
}

/// Expand the packed raster into one 0RGB word per pixel.
pub fn expand(frame: &FrameBuffer, pixels: &mut [u32]) {
    for (i, pixel) in pixels.iter_mut().enumerate().take(WIDTH * HEIGHT) {
        *pixel = if frame.pixel(i % WIDTH, i / WIDTH) {
            LIT
        } else {
            UNLIT
        };
    }
}

/// `minifb` window: shows frames and reads the QWERTY keypad. Escape quits.
pub struct WindowFrontend {
    window: Window,
    pixel_buffer: Vec<u32>,
}

impl WindowFrontend {
    pub fn new(scale: Scale) -> Result<Self, FrontendError> {
        let mut window = Window::new(
            "emuchip - ESC to exit",
            WIDTH,
            HEIGHT,
            WindowOptions {
                scale,
                ..WindowOptions::default()
            },
        )?;
        window.set_position(500, 300);
        Ok(Self {
            window,
            pixel_buffer: vec![UNLIT; WIDTH * HEIGHT],
        })
    }

    /// Keep showing the last frame until the user closes the window.
    pub fn hold(&mut self) -> Result<(), FrontendError> {
        log::info!("holding final frame, press ESC to exit");
        while self.is_open() {
            self.window
                .update_with_buffer(&self.pixel_buffer, WIDTH, HEIGHT)?;
            spin_sleep::sleep(FRAME_BUDGET);
        }
        Ok(())
    }
}

impl Screen for WindowFrontend {
    fn present(&mut self, frame: &FrameBuffer) -> Result<(), FrontendError> {
        expand(frame, &mut self.pixel_buffer);
        self.window
            .update_with_buffer(&self.pixel_buffer, WIDTH, HEIGHT)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }
}

impl Input for WindowFrontend {
    fn poll(&mut self) -> Keypad {
        // pump window events so key state is fresh even on frames that
        // draw nothing
        self.window.update();
        let mut keypad = Keypad::new();
        for (key, num) in KEYMAP {
            if self.window.is_key_down(key) {
                keypad.press(num);
            }
        }
        keypad
    }
}
