use std::fs::File;

use anyhow::Context;
use clap::Parser;

use emuchip::config::{Args, FrontendKind, Settings};
use emuchip::frontend::{Buzzer, Mute};
use emuchip::sound::Sound;
use emuchip::terminal::TextScreen;
use emuchip::window::WindowFrontend;
use emuchip::{Emulator, Scheduler, Termination};

fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&settings.log_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if let Some(path) = &settings.log_file {
        let file = File::create(path)
            .with_context(|| format!("cannot create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init()?;
    Ok(())
}

fn open_buzzer(settings: &Settings) -> Box<dyn Buzzer> {
    if settings.mute {
        return Box::new(Mute);
    }
    match Sound::new() {
        Ok(sound) => Box::new(sound),
        Err(err) => {
            log::warn!("running without sound: {err}");
            Box::new(Mute)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let settings: Settings = Args::parse().into();
    init_logging(&settings)?;

    let mut emu = Emulator::init();
    if let Some(seed) = settings.seed {
        emu = emu.with_seed(seed);
    }
    emu.load_rom_by_file(&settings.rom)
        .with_context(|| format!("CHIP-8 ROM {} was not loaded", settings.rom.display()))?;

    let mut buzzer = open_buzzer(&settings);
    let mut scheduler = Scheduler::new(settings.opcodes_per_frame);

    let termination = match settings.frontend {
        FrontendKind::Window => {
            let mut window = WindowFrontend::new(settings.scale)?;
            let termination = scheduler.run(&mut emu, &mut window, &mut buzzer)?;
            buzzer.set_active(false)?;
            if matches!(termination, Termination::SelfLoopHalt { .. }) && !settings.exit_on_halt {
                window.hold()?;
            }
            termination
        }
        FrontendKind::Terminal => {
            let termination = scheduler.run(&mut emu, &mut TextScreen::stdout(), &mut buzzer)?;
            buzzer.set_active(false)?;
            termination
        }
    };

    match termination {
        Termination::SelfLoopHalt { pc } => {
            log::info!("program finished (self-loop at {pc:#05X})");
            Ok(())
        }
        Termination::Closed => {
            log::info!("closed by user");
            Ok(())
        }
        Termination::Fault(fault) => {
            let pc = fault.pc();
            Err(anyhow::Error::new(fault).context(format!("execution stopped at {pc:#05X}")))
        }
    }
}
