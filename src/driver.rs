use crate::error::Chip8Error;
use crate::interpreter::Chip8Interpreter;
use crate::render::Renderer;
use log::{debug, info};
use std::time::Instant;

/// Drive the interpreter at its configured tick rate: each tick runs a
/// frame's worth of instructions, counts the timers down and redraws.
/// Stops when `should_quit` says so, after `max_ticks` if given, or on the
/// first machine error. Returns the number of ticks run.
pub fn run(
    interpreter: &mut Chip8Interpreter,
    renderer: &mut dyn Renderer,
    should_quit: &dyn Fn() -> bool,
    max_ticks: Option<u64>,
) -> Result<u64, Chip8Error> {
    let interval = interpreter.config().tick_interval();
    let mut next_tick = Instant::now() + interval;
    let mut ticks = 0;

    while max_ticks.map_or(true, |max| ticks < max) {
        if should_quit() {
            info!("quit requested after {} ticks", ticks);
            break;
        }
        interpreter.run_frame()?;
        renderer.render(interpreter.display())?;
        ticks += 1;

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
            next_tick += interval;
        } else {
            // running slow; don't try to catch up with a burst of frames
            debug!("tick {} overran by {:?}", ticks, now - next_tick);
            next_tick = now + interval;
        }
    }
    Ok(ticks)
}
