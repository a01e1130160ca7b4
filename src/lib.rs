//! A CHIP-8 virtual machine.
//!
//! ## Design
//!
//! * the interpreter and the framebuffer are the whole machine; keypad,
//!   beeper and screen are plugged in behind traits so alternatives work
//! * no global state: everything tunable lives in [`config::Config`]
//! * the interpreter never blocks or spawns anything. The driver runs a fixed
//!   number of instructions per 60Hz tick, then ticks the timers and redraws
//! * not cycle accurate; instructions run as fast as possible then the driver
//!   sleeps until the next tick
//!
//! Model
//!
//! Environment (main.rs)
//!  |-- config, display, input, sound, renderer
//!  |-- interpreter(config, &mut display, &input, &mut sound)
//!  |    |-- memory(font, program)
//!  |    `-- instruction set (decode -> execute)
//!  `-- driver loop, once per tick
//!       |-- interpreter.run_frame()   // N steps, then tick_timers()
//!       |-- renderer.render(interpreter.display())
//!       `-- sleep until the next tick
pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod render;
pub mod sound;

pub use config::Config;
pub use display::Display;
pub use error::Chip8Error;
pub use interpreter::Chip8Interpreter;
