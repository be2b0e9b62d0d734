use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chip8_vm::display::Filter;
use chip8_vm::input::TermInput;
use chip8_vm::interpreter::Chip8Interpreter;
use chip8_vm::quirks::{Platform, ProgramMetadata};
use chip8_vm::render::TermRenderer;
use chip8_vm::sound::{Mute, SimpleBeep, Sound};
use clap::Parser;

/// Run a CHIP-8 program in the terminal. Esc quits.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// program image to load at 0x200
    rom: PathBuf,

    /// originalChip8, hybridVIP, modernChip8, chip8x, chip48 or superchip
    #[arg(short, long, default_value_t = Platform::OriginalChip8)]
    platform: Platform,

    /// instructions per second [default: depends on the platform]
    #[arg(short, long)]
    ips: Option<u32>,

    /// none, fix-flicker or fade
    #[arg(short, long, default_value_t = Filter::None)]
    filter: Filter,

    /// beep on the PC speaker rather than staying quiet
    #[arg(short, long)]
    sound: bool,

    /// title for the window border [default: the file name]
    #[arg(short, long)]
    title: Option<String>,

    /// Fx1E sets VF when I passes 0xfff
    #[arg(long)]
    index_overflow_flag: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let title = args.title.unwrap_or_else(|| {
        args.rom
            .file_stem()
            .map_or_else(|| "CHIP-8".to_string(), |s| s.to_string_lossy().into_owned())
    });
    let mut quirks = args.platform.quirks();
    quirks.index_overflow_flag = args.index_overflow_flag;
    let mut metadata = ProgramMetadata::new(&title, args.platform).with_quirks(quirks);
    if let Some(ips) = args.ips {
        metadata = metadata.with_ips(ips);
    }

    // open the program before touching the terminal, so errors stay readable
    let mut f = File::open(&args.rom)?;

    let mut sound: Box<dyn Sound> = if args.sound {
        Box::new(SimpleBeep::new())
    } else {
        Box::new(Mute::new())
    };
    let mut renderer = TermRenderer::new(&title)?;
    let mut input = TermInput::new()?;
    let mut interpreter = Chip8Interpreter::new(&mut renderer, &mut input, sound.as_mut(), args.filter);

    interpreter.load_program(&mut f, metadata)?;
    interpreter.run()?;
    Ok(())
}
