use crate::{config::Config, error::Chip8Error};
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// left-hand side of a qwerty keyboard, laid out like the COSMAC hex keypad
///   1 2 3 C      1 2 3 4
///   4 5 6 D  <-  q w e r
///   7 8 9 E      a s d f
///   A 0 B F      z x c v
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// how long the reader thread waits for an event before checking for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Reads the keypad. Implementations may be updated from another thread, so
/// both queries take `&self` and must do their own locking.
pub trait Input: Send + Sync {
    /// is this key held down right now
    fn is_pressed(&self, key: u8) -> bool;

    /// the lowest-numbered key currently held, if any
    fn any_pressed(&self) -> Option<u8>;

    /// has the user asked to leave
    fn quit_requested(&self) -> bool {
        false
    }
}

/// Key state with timed release. Terminals report presses (and auto-repeats)
/// but never releases, so a key counts as held for `auto_release` after its
/// last press.
#[derive(Debug)]
pub struct KeyState {
    pressed_at: Vec<Option<Instant>>,
    auto_release: Duration,
}

impl KeyState {
    pub fn new(keys: usize, auto_release: Duration) -> Self {
        KeyState {
            pressed_at: vec![None; keys],
            auto_release,
        }
    }

    /// keys outside the keypad are ignored
    pub fn press(&mut self, key: u8, now: Instant) {
        if let Some(slot) = self.pressed_at.get_mut(key as usize) {
            *slot = Some(now);
        }
    }

    pub fn release(&mut self, key: u8) {
        if let Some(slot) = self.pressed_at.get_mut(key as usize) {
            *slot = None;
        }
    }

    pub fn is_pressed(&self, key: u8, now: Instant) -> bool {
        match self.pressed_at.get(key as usize) {
            Some(Some(at)) => now.saturating_duration_since(*at) < self.auto_release,
            _ => false,
        }
    }

    pub fn any_pressed(&self, now: Instant) -> Option<u8> {
        (0..self.pressed_at.len())
            .map(|k| k as u8)
            .find(|&k| self.is_pressed(k, now))
    }
}

struct Shared {
    keys: Mutex<KeyState>,
    quit: AtomicBool,
}

impl Shared {
    fn keys(&self) -> MutexGuard<'_, KeyState> {
        // a panicked reader leaves the key state as it was, which is still usable
        self.keys.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// terminal keyboard, read on a background thread using crossterm
pub struct TermInput {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl TermInput {
    pub fn new(config: &Config) -> Result<Self, Chip8Error> {
        terminal::enable_raw_mode()?;
        let shared = Arc::new(Shared {
            keys: Mutex::new(KeyState::new(config.keys, config.auto_release())),
            quit: AtomicBool::new(false),
        });
        let running = Arc::new(AtomicBool::new(true));
        let reader = {
            let shared = Arc::clone(&shared);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("chip8-input".into())
                .spawn(move || read_stdin(&shared, &running))?
        };
        Ok(TermInput {
            shared,
            running,
            reader: Some(reader),
        })
    }
}

fn read_stdin(shared: &Shared, running: &AtomicBool) {
    let keymap: HashMap<char, u8> = HashMap::from(CHIP8_CONVENTIONAL_KEYMAP);
    while running.load(Ordering::Relaxed) {
        let event = match poll(POLL_INTERVAL) {
            Ok(true) => read(),
            Ok(false) => continue,
            Err(e) => Err(e),
        };
        match event {
            Ok(Event::Key(evt)) => match evt.code {
                KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                    shared.quit.store(true, Ordering::Relaxed);
                }
                KeyCode::Esc => shared.quit.store(true, Ordering::Relaxed),
                KeyCode::Char(key) => match keymap.get(&key.to_ascii_lowercase()) {
                    Some(&mapped_key) => shared.keys().press(mapped_key, Instant::now()),
                    None => debug!("can't map {:?} to a COSMAC key", key),
                },
                other => debug!("ignoring key {:?}", other),
            },
            Ok(_) => {}
            Err(e) => {
                warn!("keyboard reader stopped: {}", e);
                shared.quit.store(true, Ordering::Relaxed);
                return;
            }
        }
    }
}

impl Input for TermInput {
    fn is_pressed(&self, key: u8) -> bool {
        self.shared.keys().is_pressed(key, Instant::now())
    }

    fn any_pressed(&self) -> Option<u8> {
        self.shared.keys().any_pressed(Instant::now())
    }

    /// Esc or ctrl-c
    fn quit_requested(&self) -> bool {
        self.shared.quit.load(Ordering::Relaxed)
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't restore terminal mode: {}", e);
        }
    }
}

/// Keys read as raw bytes from a file, fifo or device, through the same
/// layout and auto-release as the terminal. Esc or ctrl-c in the stream asks
/// to quit. The reader thread is never joined: a blocked read can't be
/// interrupted, so it ends with the input or the process.
pub struct ReaderInput {
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

impl ReaderInput {
    pub fn new<R: Read + Send + 'static>(config: &Config, source: R) -> Result<Self, Chip8Error> {
        let shared = Arc::new(Shared {
            keys: Mutex::new(KeyState::new(config.keys, config.auto_release())),
            quit: AtomicBool::new(false),
        });
        let reader = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("chip8-keys".into())
                .spawn(move || read_keys(&shared, source))?
        };
        Ok(ReaderInput { shared, reader })
    }

    /// has the source hit end of input (or failed)
    pub fn is_exhausted(&self) -> bool {
        self.reader.is_finished()
    }
}

fn read_keys(shared: &Shared, mut source: impl Read) {
    let keymap: HashMap<u8, u8> = CHIP8_CONVENTIONAL_KEYMAP
        .iter()
        .map(|&(c, k)| (c as u8, k))
        .collect();
    let mut buf = [0u8; 64];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => {
                debug!("key input ended");
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("key input failed: {}", e);
                return;
            }
        };
        let now = Instant::now();
        for byte in &buf[..n] {
            match byte.to_ascii_lowercase() {
                0x1b | 0x03 => shared.quit.store(true, Ordering::Relaxed),
                b => match keymap.get(&b) {
                    Some(&mapped_key) => shared.keys().press(mapped_key, now),
                    None => debug!("can't map byte {:#04x} to a COSMAC key", b),
                },
            }
        }
    }
}

impl Input for ReaderInput {
    fn is_pressed(&self, key: u8) -> bool {
        self.shared.keys().is_pressed(key, Instant::now())
    }

    fn any_pressed(&self) -> Option<u8> {
        self.shared.keys().any_pressed(Instant::now())
    }

    fn quit_requested(&self) -> bool {
        self.shared.quit.load(Ordering::Relaxed)
    }
}

/// dummy Input implementation for testing; keys stay down until released
pub struct DummyInput {
    keys: Mutex<Vec<u8>>,
}

impl DummyInput {
    pub fn new(keys: &[u8]) -> Self {
        DummyInput {
            keys: Mutex::new(Vec::from(keys)),
        }
    }

    pub fn press(&self, key: u8) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    pub fn release(&self, key: u8) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|&k| k != key);
    }
}

impl Input for DummyInput {
    fn is_pressed(&self, key: u8) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
    }

    fn any_pressed(&self) -> Option<u8> {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_keypad() {
        let mut mapped: Vec<u8> = CHIP8_CONVENTIONAL_KEYMAP.iter().map(|&(_, k)| k).collect();
        mapped.sort_unstable();
        assert_eq!(mapped, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_press_and_auto_release() {
        let t0 = Instant::now();
        let mut ks = KeyState::new(16, Duration::from_millis(30));
        ks.press(0x5, t0);
        assert!(ks.is_pressed(0x5, t0));
        assert!(ks.is_pressed(0x5, t0 + Duration::from_millis(29)));
        assert!(!ks.is_pressed(0x5, t0 + Duration::from_millis(30)));
        assert!(!ks.is_pressed(0x4, t0));
    }

    #[test]
    fn test_repeat_extends_hold() {
        let t0 = Instant::now();
        let mut ks = KeyState::new(16, Duration::from_millis(30));
        ks.press(0x1, t0);
        ks.press(0x1, t0 + Duration::from_millis(20));
        assert!(ks.is_pressed(0x1, t0 + Duration::from_millis(40)));
    }

    #[test]
    fn test_explicit_release() {
        let t0 = Instant::now();
        let mut ks = KeyState::new(16, Duration::from_secs(10));
        ks.press(0xa, t0);
        ks.release(0xa);
        assert!(!ks.is_pressed(0xa, t0));
    }

    #[test]
    fn test_any_pressed_lowest() {
        let t0 = Instant::now();
        let mut ks = KeyState::new(16, Duration::from_secs(1));
        assert_eq!(ks.any_pressed(t0), None);
        ks.press(0xc, t0);
        ks.press(0x3, t0);
        assert_eq!(ks.any_pressed(t0), Some(0x3));
    }

    #[test]
    fn test_outside_keypad_ignored() {
        let t0 = Instant::now();
        let mut ks = KeyState::new(4, Duration::from_secs(1));
        ks.press(0x9, t0);
        assert!(!ks.is_pressed(0x9, t0));
        assert_eq!(ks.any_pressed(t0), None);
    }

    fn drain(input: &ReaderInput) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !input.is_exhausted() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(input.is_exhausted());
    }

    fn held_config() -> Config {
        Config {
            auto_release_ms: 60_000,
            ..Config::default()
        }
    }

    #[test]
    fn test_reader_input_maps_bytes() -> Result<(), Chip8Error> {
        let input = ReaderInput::new(&held_config(), io::Cursor::new(b"Zq1?".to_vec()))?;
        drain(&input);
        assert!(input.is_pressed(0xa));
        assert!(input.is_pressed(0x4));
        assert!(input.is_pressed(0x1));
        assert!(!input.is_pressed(0x5));
        assert_eq!(input.any_pressed(), Some(0x1));
        assert!(!input.quit_requested());
        Ok(())
    }

    #[test]
    fn test_reader_input_escape_quits() -> Result<(), Chip8Error> {
        let input = ReaderInput::new(&held_config(), io::Cursor::new(b"w\x1b".to_vec()))?;
        drain(&input);
        assert!(input.is_pressed(0x5));
        assert!(input.quit_requested());
        Ok(())
    }

    #[test]
    fn test_reader_input_releases() -> Result<(), Chip8Error> {
        let config = Config {
            auto_release_ms: 1,
            ..Config::default()
        };
        let input = ReaderInput::new(&config, io::Cursor::new(b"v".to_vec()))?;
        drain(&input);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(input.any_pressed(), None);
        Ok(())
    }

    #[test]
    fn test_dummy_input_never_quits() {
        assert!(!DummyInput::new(&[]).quit_requested());
    }

    #[test]
    fn test_dummy_input() {
        let input = DummyInput::new(&[0xe, 0x2]);
        assert!(input.is_pressed(0x2));
        assert!(!input.is_pressed(0x3));
        assert_eq!(input.any_pressed(), Some(0x2));
        input.release(0x2);
        assert_eq!(input.any_pressed(), Some(0xe));
        input.release(0xe);
        assert_eq!(input.any_pressed(), None);
        input.press(0x7);
        assert!(input.is_pressed(0x7));
    }
}
