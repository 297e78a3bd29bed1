use minifb::Key;

pub const KEY_COUNT: usize = 16;

// 1 2 3 C      1 2 3 4
// 4 5 6 D  <-  Q W E R
// 7 8 9 E      A S D F
// A 0 B F      Z X C V
pub const KEYMAP: [(Key, u8); KEY_COUNT] = [
    (Key::Key1, 0x1),
    (Key::Key2, 0x2),
    (Key::Key3, 0x3),
    (Key::Key4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

pub fn key_to_num(key: Key) -> Option<u8> {
    KEYMAP
        .iter()
        .find(|(mapped, _)| *mapped == key)
        .map(|(_, num)| *num)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
        }
    }

    pub fn with_pressed(pressed: &[u8]) -> Self {
        let mut keypad = Self::new();
        for &key in pressed {
            keypad.press(key);
        }
        keypad
    }

    pub fn press(&mut self, n: u8) {
        self.keys[(n & 0xF) as usize] = true;
    }

    pub fn release(&mut self, n: u8) {
        self.keys[(n & 0xF) as usize] = false;
    }

    // VX values above 0xF alias onto the low nibble
    pub fn is_pressed(&self, n: u8) -> bool {
        self.keys[(n & 0xF) as usize]
    }

    pub fn mask(&self) -> u16 {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, down)| **down)
            .fold(0, |mask, (n, _)| mask | (1 << n))
    }
}
