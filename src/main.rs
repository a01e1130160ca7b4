use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use chip8::config::{self, Config};
use chip8::display::Display;
use chip8::driver;
use chip8::input::{DummyInput, Input, ReaderInput, TermInput};
use chip8::instruction::disassemble;
use chip8::interpreter::Chip8Interpreter;
use chip8::memory::CHIP8_PROGRAM_ADDR;
use chip8::render::{half_block_lines, DummyRenderer, MonoTermRenderer, Renderer, TextRenderer};
use chip8::sound::{Mute, PcmTone, SimpleBeep, Sound};

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 interpreter for the terminal", long_about = None)]
struct Args {
    #[arg(short, long, help = "Path to the ROM file to run")]
    rom: PathBuf,

    #[arg(long, default_value_t = config::DEFAULT_WIDTH, help = "Screen width in pixels")]
    width: usize,

    #[arg(long, default_value_t = config::DEFAULT_HEIGHT, help = "Screen height in pixels")]
    height: usize,

    #[arg(long, default_value_t = config::DEFAULT_KEYS, help = "Keypad size")]
    keys: usize,

    #[arg(short, long, default_value_t = config::DEFAULT_CYCLES_PER_TICK, help = "Instructions per 60Hz tick")]
    cycles: u32,

    #[arg(long, default_value_t = config::DEFAULT_TONE_PITCH, help = "Beeper pitch in Hz")]
    pitch: u16,

    #[arg(long, default_value_t = config::DEFAULT_AUTO_RELEASE_MS, help = "Milliseconds a keypress stays held")]
    auto_release: u64,

    #[arg(long, help = "Reset registers and timers when loading the ROM")]
    reset_on_load: bool,

    #[arg(long, help = "Seed for the random number generator")]
    seed: Option<u64>,

    #[arg(long, default_value_t = config::DEFAULT_SAMPLE_RATE, help = "Sample rate for --audio-out")]
    sample_rate: u32,

    #[arg(short, long, help = "No sound")]
    mute: bool,

    #[arg(short = 'a', long, help = "Stream the tone as 16-bit LE mono PCM to this file or pipe")]
    audio_out: Option<PathBuf>,

    #[arg(short = 'o', long, help = "Write half-block text frames to this file instead of the terminal")]
    screen_out: Option<PathBuf>,

    #[arg(short, long, help = "Read keys from this file or device instead of the terminal")]
    input: Option<PathBuf>,

    #[arg(long, help = "Run without terminal input or rendering")]
    headless: bool,

    #[arg(long, help = "Stop after this many ticks")]
    max_ticks: Option<u64>,

    #[arg(short, long, help = "Print a listing of the ROM and exit")]
    disassemble: bool,

    #[arg(long, default_value_t = LevelFilter::Warn, help = "Log level")]
    log_level: LevelFilter,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            width: self.width,
            height: self.height,
            keys: self.keys,
            cycles_per_tick: self.cycles,
            tone_pitch: self.pitch,
            sample_rate: self.sample_rate,
            auto_release_ms: self.auto_release,
            reset_on_load: self.reset_on_load,
            seed: self.seed,
            ..Config::default()
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::new().with_level(args.log_level).init()?;

    let rom = fs::read(&args.rom)?;

    if args.disassemble {
        for (addr, opcode, inst) in disassemble(&rom, CHIP8_PROGRAM_ADDR) {
            match inst {
                Some(inst) => println!("{:03x}: {:04x}  {}", addr, opcode, inst),
                None => println!("{:03x}: {:04x}  DW   {:#06x}", addr, opcode, opcode),
            }
        }
        return Ok(());
    }

    // initialise
    let config = args.config();
    config.validate()?;
    let mut display = Display::new(config.width, config.height);
    let input: Box<dyn Input> = match &args.input {
        Some(path) => Box::new(ReaderInput::new(&config, File::open(path)?)?),
        None if args.headless => Box::new(DummyInput::new(&[])),
        None => Box::new(TermInput::new(&config)?),
    };
    let mut sound: Box<dyn Sound> = match &args.audio_out {
        _ if args.mute => Box::new(Mute::new()),
        Some(path) => Box::new(PcmTone::new(
            Box::new(File::create(path)?),
            config.sample_rate,
            config.tone_pitch,
        )?),
        None => Box::new(SimpleBeep::new(config.tone_pitch)),
    };
    let mut renderer: Box<dyn Renderer> = match &args.screen_out {
        Some(path) => Box::new(TextRenderer::new(File::create(path)?, false)),
        None if args.headless => Box::new(DummyRenderer::new()),
        None => Box::new(MonoTermRenderer::new()?),
    };

    let mut interpreter = Chip8Interpreter::new(&config, &mut display, &*input, &mut *sound)?;
    interpreter.load_rom(&rom)?;

    let should_quit = || input.quit_requested();
    let result = driver::run(&mut interpreter, &mut *renderer, &should_quit, args.max_ticks);
    drop(interpreter);
    drop(sound);
    drop(renderer);
    drop(input);

    if args.headless {
        for line in half_block_lines(&display) {
            println!("{}", line);
        }
    } else if args.screen_out.is_none() {
        // shove some junk on stdout to stop the cli messing up the last frame
        for _ in 0..(config.height + 4) {
            println!();
        }
    }

    result?;
    Ok(())
}
