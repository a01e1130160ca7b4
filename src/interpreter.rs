//! # interpreter
//!
//! (from: http://devernay.free.fr/hacks/chip8/C8TECH10.HTM)
//! the CHIP-8 virtual machine has:
//!  * 16 8bit general purpose registers, V0-VF. VF doubles as the carry,
//!    borrow and sprite collision flag, so programs shouldn't keep anything
//!    in it across arithmetic or drawing
//!  * I, a 16bit register for memory addresses
//!  * a 16bit program counter, starting at 0x200
//!  * a 16 level stack of return addresses
//!  * delay and sound timers, counting down at 60Hz while nonzero
//!
//! the interpreter never blocks and never schedules itself: the driver
//! decides how many steps to run per timer tick. FX0A "waits" for a key by
//! rewinding the program counter so it runs again on the next step.

use crate::config::Config;
use crate::display::Display;
use crate::error::Chip8Error;
use crate::input::Input;
use crate::instruction::Instruction;
use crate::memory::{
    Chip8MemoryMap, MemoryMap, CHIP8_PROGRAM_ADDR, CHIP8_RAM_SIZE_BYTES,
};
use crate::sound::Sound;
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;

/// carry/borrow/collision flag register
const VF: usize = 0xf;

/// longest sprite DXYN can draw
const MAX_SPRITE_ROWS: usize = 15;

pub struct Chip8Interpreter<'a> {
    memory: Chip8MemoryMap,
    display: &'a mut Display,
    input: &'a dyn Input,
    sound: &'a mut dyn Sound,
    config: Config,
    registers: [u8; REGISTER_COUNT],
    index: u16,
    program_counter: u16,
    stack: [u16; STACK_DEPTH],
    stack_pointer: usize,
    delay_timer: u8,
    sound_timer: u8,
    rng: StdRng,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        config: &Config,
        display: &'a mut Display,
        input: &'a dyn Input,
        sound: &'a mut dyn Sound,
    ) -> Result<Chip8Interpreter<'a>, Chip8Error> {
        config.validate()?;
        if (display.width(), display.height()) != (config.width, config.height) {
            return Err(Chip8Error::InvalidConfig(format!(
                "display is {}x{} but the machine is configured for {}x{}",
                display.width(),
                display.height(),
                config.width,
                config.height
            )));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        display.clear();
        Ok(Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            display,
            input,
            sound,
            config: config.clone(),
            registers: [0; REGISTER_COUNT],
            index: 0,
            program_counter: CHIP8_PROGRAM_ADDR,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            rng,
        })
    }

    /// load a chip8 program from any reader
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), Chip8Error> {
        let mut rom = Vec::new();
        reader.read_to_end(&mut rom)?;
        self.load_rom(&rom)
    }

    /// copy a program to 0x200 and point the program counter at it. Machine
    /// state survives unless the config asks for a reset.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if self.config.reset_on_load {
            let mut fresh = Chip8MemoryMap::new();
            fresh.load_program(rom)?;
            self.memory = fresh;
            self.reset();
        } else {
            self.memory.load_program(rom)?;
        }
        self.program_counter = CHIP8_PROGRAM_ADDR;
        info!("Loaded ROM [size: {}]", rom.len());
        Ok(())
    }

    fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.index = 0;
        self.stack = [0; STACK_DEPTH];
        self.stack_pointer = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.display.clear();
    }

    /// fetch, decode and execute one instruction
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        let pc = self.program_counter;
        if pc as usize + 1 >= CHIP8_RAM_SIZE_BYTES {
            return Err(Chip8Error::PcOutOfBounds { pc });
        }
        let opcode = self.memory.get_word(pc);
        self.program_counter = pc + 2;

        match Instruction::decode(opcode) {
            Some(inst) => {
                trace!("{:#05x}: {:04x}  {}", pc, opcode, inst);
                self.execute(inst, pc)
            }
            None => {
                debug!("{:#05x}: ignoring undefined opcode {:04x}", pc, opcode);
                Ok(())
            }
        }
    }

    /// run one timer tick's worth of instructions, then tick the timers
    pub fn run_frame(&mut self) -> Result<(), Chip8Error> {
        for _ in 0..self.config.cycles_per_tick {
            self.step()?;
        }
        self.tick_timers();
        Ok(())
    }

    /// 60Hz: count both timers down and gate the tone on the sound timer
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
        if self.sound_timer > 0 {
            self.sound.enable();
        } else {
            self.sound.disable();
        }
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter += 2;
        }
    }

    fn reg(&self, x: u8) -> u8 {
        self.registers[x as usize]
    }

    /// write the result first, then the flag, so VF ends up holding the flag
    /// when it is also the destination
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        self.registers[x as usize] = value;
        self.registers[VF] = flag as u8;
    }

    fn execute(&mut self, inst: Instruction, pc: u16) -> Result<(), Chip8Error> {
        use Instruction::*;

        match inst {
            Cls => self.display.clear(),
            Ret => {
                if self.stack_pointer == 0 {
                    return Err(Chip8Error::StackUnderflow { pc });
                }
                self.stack_pointer -= 1;
                self.program_counter = self.stack[self.stack_pointer];
            }
            Sys(_) => {}
            Jp(addr) => self.program_counter = addr,
            Call(addr) => {
                if self.stack_pointer == STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow { pc });
                }
                self.stack[self.stack_pointer] = self.program_counter;
                self.stack_pointer += 1;
                self.program_counter = addr;
            }
            SeByte(x, kk) => self.skip_if(self.reg(x) == kk),
            SneByte(x, kk) => self.skip_if(self.reg(x) != kk),
            SeReg(x, y) => self.skip_if(self.reg(x) == self.reg(y)),
            SneReg(x, y) => self.skip_if(self.reg(x) != self.reg(y)),
            LdByte(x, kk) => self.registers[x as usize] = kk,
            AddByte(x, kk) => self.registers[x as usize] = self.reg(x).wrapping_add(kk),
            LdReg(x, y) => self.registers[x as usize] = self.reg(y),
            Or(x, y) => self.registers[x as usize] |= self.reg(y),
            And(x, y) => self.registers[x as usize] &= self.reg(y),
            Xor(x, y) => self.registers[x as usize] ^= self.reg(y),
            AddReg(x, y) => {
                let (result, carry) = self.reg(x).overflowing_add(self.reg(y));
                self.set_with_flag(x, result, carry);
            }
            Sub(x, y) => {
                let (vx, vy) = (self.reg(x), self.reg(y));
                self.set_with_flag(x, vx.wrapping_sub(vy), vx > vy);
            }
            Shr(x) => {
                let vx = self.reg(x);
                self.set_with_flag(x, vx >> 1, vx & 0x01 != 0);
            }
            Subn(x, y) => {
                let (vx, vy) = (self.reg(x), self.reg(y));
                self.set_with_flag(x, vy.wrapping_sub(vx), vy > vx);
            }
            Shl(x) => {
                let vx = self.reg(x);
                self.set_with_flag(x, vx << 1, vx & 0x80 != 0);
            }
            LdI(addr) => self.index = addr,
            JpV0(addr) => self.program_counter = addr + self.reg(0) as u16,
            Rnd(x, kk) => self.registers[x as usize] = self.rng.gen::<u8>() & kk,
            Drw(x, y, n) => self.draw_sprite(x, y, n),
            Skp(x) => self.skip_if(self.input.is_pressed(self.reg(x))),
            Sknp(x) => self.skip_if(!self.input.is_pressed(self.reg(x))),
            LdVxDt(x) => self.registers[x as usize] = self.delay_timer,
            LdKey(x) => match self.input.any_pressed() {
                Some(key) => self.registers[x as usize] = key,
                None => {
                    trace!("{:#05x}: waiting for a key", pc);
                    self.program_counter = pc;
                }
            },
            LdDtVx(x) => self.delay_timer = self.reg(x),
            LdStVx(x) => self.sound_timer = self.reg(x),
            AddI(x) => self.index = self.index.wrapping_add(self.reg(x) as u16),
            // the classic tables give I = VX * 5, which assumes the font at 0x000;
            // ours sits at 0x050 so I points at the glyph itself
            LdF(x) => self.index = Chip8MemoryMap::font_glyph_addr(self.reg(x)),
            LdB(x) => {
                let vx = self.reg(x);
                let i = self.index;
                self.memory.write_byte(i, vx / 100);
                self.memory.write_byte(i.wrapping_add(1), vx / 10 % 10);
                self.memory.write_byte(i.wrapping_add(2), vx % 10);
            }
            Store(x) => {
                for r in 0..=x {
                    let addr = self.index.wrapping_add(r as u16);
                    let value = self.reg(r);
                    self.memory.write_byte(addr, value);
                }
            }
            Load(x) => {
                for r in 0..=x {
                    let addr = self.index.wrapping_add(r as u16);
                    self.registers[r as usize] = self.memory.read_byte(addr);
                }
            }
        }
        Ok(())
    }

    /// DXYN: XOR an n-row sprite from I onto the screen at (VX, VY). The
    /// origin wraps, and so does every pixel, so sprites straddling an edge
    /// reappear on the opposite side. VF reports whether any lit pixel went out.
    fn draw_sprite(&mut self, x: u8, y: u8, n: u8) {
        let width = self.display.width();
        let height = self.display.height();
        let ox = self.reg(x) as usize % width;
        let oy = self.reg(y) as usize % height;
        let rows = (n as usize).min(MAX_SPRITE_ROWS);

        let mut sprite = [0u8; MAX_SPRITE_ROWS];
        for (r, byte) in sprite.iter_mut().take(rows).enumerate() {
            *byte = self.memory.read_byte(self.index.wrapping_add(r as u16));
        }
        let sprite = &sprite[..rows];

        let collision = if ox + 8 <= width && oy + rows <= height {
            // nothing to wrap, so the byte-wise blit gives the same result
            self.display.draw(ox, oy, sprite)
        } else {
            let mut collision = false;
            for (r, &bits) in sprite.iter().enumerate() {
                let py = (oy + r) % height;
                for c in 0..8 {
                    if bits & (0x80 >> c) == 0 {
                        continue;
                    }
                    let px = (ox + c) % width;
                    let lit = self.display.get(px, py);
                    collision |= lit;
                    self.display.set(px, py, !lit);
                }
            }
            collision
        };
        self.registers[VF] = collision as u8;
    }

    pub fn display(&self) -> &Display {
        &*self.display
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register(&self, x: u8) -> u8 {
        self.reg(x)
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }
}
