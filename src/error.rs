use std::io;

/// Everything that can stop a program from loading or running.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("unknown opcode {opcode:#06x} at {addr:#05x}")]
    UnknownOpcode { addr: u16, opcode: u16 },

    #[error("program is empty")]
    EmptyProgram,

    #[error("program is too large ({size} bytes), max size is {max} bytes")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("no program loaded")]
    NotLoaded,

    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("unknown display filter '{0}'")]
    UnknownFilter(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
