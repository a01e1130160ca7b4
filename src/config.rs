use crate::error::Chip8Error;
use std::time::Duration;

/// canonical COSMAC VIP screen
pub const DEFAULT_WIDTH: usize = 64;
pub const DEFAULT_HEIGHT: usize = 32;
pub const DEFAULT_KEYS: usize = 16;

/// timers always count down at this rate
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// nominal 700 instructions per second, spread over each 60Hz tick
pub const DEFAULT_CYCLES_PER_TICK: u32 = 700 / DEFAULT_TICK_RATE_HZ;

pub const DEFAULT_TONE_PITCH: u16 = 2093; // C
pub const DEFAULT_AUTO_RELEASE_MS: u64 = 30;

/// PCM output, 16-bit mono
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Machine configuration, handed to the constructors rather than kept in
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub width: usize,
    pub height: usize,
    /// size of the keypad; keys are numbered 0..keys
    pub keys: usize,
    /// how many instructions to execute per timer tick
    pub cycles_per_tick: u32,
    pub tick_rate_hz: u32,
    /// beeper frequency in Hz
    pub tone_pitch: u16,
    /// samples per second when the tone is streamed as PCM
    pub sample_rate: u32,
    /// how long a terminal keypress counts as held
    pub auto_release_ms: u64,
    /// zero registers, timers, index and stack when a ROM is (re)loaded
    pub reset_on_load: bool,
    /// fixed seed for CXKK; entropy when absent
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            keys: DEFAULT_KEYS,
            cycles_per_tick: DEFAULT_CYCLES_PER_TICK,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            tone_pitch: DEFAULT_TONE_PITCH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            auto_release_ms: DEFAULT_AUTO_RELEASE_MS,
            reset_on_load: false,
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Chip8Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Chip8Error::InvalidConfig(format!(
                "display must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        // VX holds the key number, so anything past 256 keys is unreachable
        if self.keys == 0 || self.keys > 256 {
            return Err(Chip8Error::InvalidConfig(format!(
                "keypad size must be 1..=256, got {}",
                self.keys
            )));
        }
        if self.cycles_per_tick == 0 {
            return Err(Chip8Error::InvalidConfig(
                "cycles per tick must be nonzero".into(),
            ));
        }
        if self.tick_rate_hz == 0 {
            return Err(Chip8Error::InvalidConfig(
                "tick rate must be nonzero".into(),
            ));
        }
        if self.sample_rate == 0 || self.tone_pitch == 0 {
            return Err(Chip8Error::InvalidConfig(format!(
                "sample rate and pitch must be nonzero, got {}Hz and {}Hz",
                self.sample_rate, self.tone_pitch
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate_hz
    }

    pub fn auto_release(&self) -> Duration {
        Duration::from_millis(self.auto_release_ms)
    }
}
