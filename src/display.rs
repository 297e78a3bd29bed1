pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub const ROW_BYTES: usize = WIDTH / 8;
pub const FRAME_BYTES: usize = ROW_BYTES * HEIGHT;

// pixel (x, y) is bit 7 - x % 8 of byte y * 8 + x / 8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    bit_buffer: [u8; FRAME_BYTES],
    dirty: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bit_buffer: [0; FRAME_BYTES],
            dirty: false,
        }
    }

    pub fn clear_buffer(&mut self) {
        self.bit_buffer = [0; FRAME_BYTES];
        self.dirty = true;
    }

    // no dirty flag, nothing to present after a reset
    pub fn reset(&mut self) {
        self.bit_buffer = [0; FRAME_BYTES];
        self.dirty = false;
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_BYTES] {
        &self.bit_buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let byte = self.bit_buffer[(y % HEIGHT) * ROW_BYTES + (x % WIDTH) / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    // returns true if any lit pixel was switched off
    pub fn paint(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let (x, y) = (x as usize, y as usize);
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }

        let x_byte = x / 8;
        let x_bit = x % 8;
        let mut vf = false;
        for (i, row) in sprite.iter().enumerate() {
            let line = ((y + i) % HEIGHT) * ROW_BYTES;
            if x_bit == 0 {
                vf |= self.xor_byte(line + x_byte, *row);
            } else {
                vf |= self.xor_byte(line + x_byte, row >> x_bit);
                let spill = (x_byte + 1) % ROW_BYTES;
                vf |= self.xor_byte(line + spill, row << (8 - x_bit));
            }
        }
        self.dirty = true;
        vf
    }

    fn xor_byte(&mut self, loc: usize, pattern: u8) -> bool {
        let previous = self.bit_buffer[loc];
        self.bit_buffer[loc] ^= pattern;
        previous & !self.bit_buffer[loc] != 0
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
