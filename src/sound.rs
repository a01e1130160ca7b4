use beep::beep;
use log::{debug, warn};
use std::io::Write;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// The tone gate driven by the sound timer. Both calls must return
/// immediately and be cheap to repeat, since the interpreter issues one of
/// them on every timer tick.
pub trait Sound {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// PC speaker tone at a fixed pitch
pub struct SimpleBeep {
    pitch: u16,
    is_beeping: bool,
    /// set after the first device error; no further attempts are made
    unavailable: bool,
}

impl SimpleBeep {
    pub fn new(pitch: u16) -> Self {
        SimpleBeep {
            pitch,
            is_beeping: false,
            unavailable: false,
        }
    }

    pub fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}

impl Sound for SimpleBeep {
    fn enable(&mut self) {
        if self.is_beeping || self.unavailable {
            return;
        }
        match beep(self.pitch) {
            Ok(_) => self.is_beeping = true,
            Err(e) => {
                warn!("beeper unavailable, continuing without sound: {}", e);
                self.unavailable = true;
            }
        }
    }

    fn disable(&mut self) {
        if !self.is_beeping {
            return;
        }
        if let Err(e) = beep(0) {
            warn!("couldn't stop beeper: {}", e);
        }
        self.is_beeping = false;
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        self.disable();
    }
}

/// length of each block of samples handed to the PCM writer
const PCM_CHUNK: Duration = Duration::from_millis(50);
const PCM_AMPLITUDE: i16 = 3000;

/// One period-aligned square wave: `amplitude` for the first half of each
/// period, `-amplitude` for the second.
pub fn square_wave(sample_rate: u32, pitch: u16, duration: Duration, amplitude: i16) -> Vec<i16> {
    let total = (sample_rate as u128 * duration.as_nanos() / 1_000_000_000) as usize;
    let period = sample_rate as f64 / pitch as f64;
    (0..total)
        .map(|i| {
            if (i as f64) % period < period / 2.0 {
                amplitude
            } else {
                -amplitude
            }
        })
        .collect()
}

/// 16-bit little endian, the layout `aplay -f S16_LE` and friends expect
fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Silent,
    Playing,
    Shutdown,
}

struct ToneState {
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl ToneState {
    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, gate: Gate) {
        *self.gate() = gate;
        self.changed.notify_all();
    }
}

/// Square wave streamed as raw PCM to any writer (a file, a pipe into a
/// player). A background thread does the writing in real time, so `enable`
/// and `disable` only flip a gate and never wait on the writer.
pub struct PcmTone {
    state: Arc<ToneState>,
    is_playing: bool,
    streamer: Option<JoinHandle<()>>,
}

impl PcmTone {
    pub fn new(
        out: Box<dyn Write + Send>,
        sample_rate: u32,
        pitch: u16,
    ) -> Result<Self, std::io::Error> {
        let state = Arc::new(ToneState {
            gate: Mutex::new(Gate::Silent),
            changed: Condvar::new(),
        });
        let chunk = pcm_bytes(&square_wave(sample_rate, pitch, PCM_CHUNK, PCM_AMPLITUDE));
        let streamer = {
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("chip8-pcm".into())
                .spawn(move || stream_pcm(&state, out, &chunk))?
        };
        Ok(PcmTone {
            state,
            is_playing: false,
            streamer: Some(streamer),
        })
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }
}

fn stream_pcm(state: &ToneState, mut out: Box<dyn Write + Send>, chunk: &[u8]) {
    let mut next_chunk = Instant::now();
    loop {
        {
            let mut gate = state.gate();
            while *gate == Gate::Silent {
                gate = state.changed.wait(gate).unwrap_or_else(|e| e.into_inner());
                next_chunk = Instant::now();
            }
            if *gate == Gate::Shutdown {
                break;
            }
        }
        if let Err(e) = out.write_all(chunk).and_then(|_| out.flush()) {
            warn!("PCM output failed, continuing without sound: {}", e);
            return;
        }
        // pace to real time so a file sink doesn't fill up while the tone is on
        next_chunk += PCM_CHUNK;
        let now = Instant::now();
        if next_chunk > now {
            spin_sleep::sleep(next_chunk - now);
        } else {
            next_chunk = now;
        }
    }
    debug!("PCM streamer stopped");
}

impl Sound for PcmTone {
    fn enable(&mut self) {
        if !self.is_playing {
            self.state.set(Gate::Playing);
            self.is_playing = true;
        }
    }

    fn disable(&mut self) {
        if self.is_playing {
            self.state.set(Gate::Silent);
            self.is_playing = false;
        }
    }
}

impl Drop for PcmTone {
    fn drop(&mut self) {
        self.state.set(Gate::Shutdown);
        if let Some(streamer) = self.streamer.take() {
            let _ = streamer.join();
        }
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn enable(&mut self) {}

    fn disable(&mut self) {}
}

/// records every call, for checking how the interpreter drives the gate
#[derive(Debug, Default)]
pub struct RecordingSound {
    pub enabled: bool,
    pub enables: usize,
    pub disables: usize,
}

impl Sound for RecordingSound {
    fn enable(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disables += 1;
    }
}
