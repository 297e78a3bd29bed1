use std::path::PathBuf;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, ValueEnum};
use minifb::Scale;

use crate::scheduler::OPCODES_PER_FRAME;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendKind {
    /// Scaled desktop window with keyboard input
    Window,
    /// Text rendering on stdout, no input
    Terminal,
}

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 interpreter", long_about = None)]
pub struct Args {
    /// Path to the ROM file to run
    pub rom: PathBuf,

    /// Instructions executed per 1/60 s frame
    #[arg(long, default_value_t = OPCODES_PER_FRAME, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub opcodes_per_frame: usize,

    #[arg(long, value_enum, default_value_t = FrontendKind::Window)]
    pub frontend: FrontendKind,

    /// Window pixel scale
    #[arg(long, default_value_t = 16, value_parser = PossibleValuesParser::new(["1", "2", "4", "8", "16", "32"]).map(|s| s.parse::<u8>().unwrap_or(16)))]
    pub scale: u8,

    /// Disable audio
    #[arg(long)]
    pub mute: bool,

    /// Exit as soon as the program halts instead of holding the last frame
    #[arg(long)]
    pub exit_on_halt: bool,

    /// Log filter, e.g. `info`, `debug` or `emuchip=trace`
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Seed for the random number opcode
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub rom: PathBuf,
    pub opcodes_per_frame: usize,
    pub frontend: FrontendKind,
    pub scale: Scale,
    pub mute: bool,
    pub exit_on_halt: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Self {
            rom: args.rom,
            opcodes_per_frame: args.opcodes_per_frame,
            frontend: args.frontend,
            scale: scale_from(args.scale),
            mute: args.mute,
            exit_on_halt: args.exit_on_halt,
            log_level: args.log_level,
            log_file: args.log_file,
            seed: args.seed,
        }
    }
}

fn scale_from(factor: u8) -> Scale {
    match factor {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        32 => Scale::X32,
        _ => Scale::X16,
    }
}
