use std::io;

/// Everything that can stop the machine. Undefined opcodes and off-screen
/// pixel writes are not errors; they are absorbed into machine state.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("stack overflow: CALL at {pc:#06X} with a full call stack")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: RET at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("program counter {pc:#06X} is past the end of memory")]
    PcOutOfBounds { pc: u16 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
