// 16 8-bit data registers named V0 to VF
// I -> address register (12 bits)
//
// Stack of 16 return addresses
//
// Delay timer & Sound timer: Count down at 60 times / s until 0
// Beep when sound timer is non-zero
//
// Display res: 64 width, 32 height, packed 8 pixels per byte
//
// 35 opcodes, each are 2 bytes (big-endian)
//      NNN: address
//      NN: 8-bit constant
//      N: 4-bit constant
//      X and Y: 4-bit register identifier
//
// Separately:
// CPU: OPCODES_PER_FRAME instructions per frame
// Display: presented at most 60 times per second, only when changed
// Timer: 60 times per second

pub mod config;
pub mod decode;
pub mod display;
pub mod emulator;
pub mod error;
pub mod frontend;
pub mod keyboard;
pub mod memory;
pub mod registers;
pub mod scheduler;
pub mod sound;
pub mod terminal;
pub mod timer;
pub mod trace;
pub mod window;

pub use emulator::{CycleResult, Emulator};
pub use error::{Fault, FrontendError, LoadError};
pub use scheduler::{Scheduler, Termination};
