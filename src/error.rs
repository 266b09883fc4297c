//! Result and errors.
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize, max_size: usize },
    /// Call nesting exceeded the capacity of the call stack.
    StackOverflow { address: Address },
    /// Return instruction with no matching call.
    StackUnderflow { address: Address },
    /// Memory access outside of the addressable space.
    OutOfBounds { address: Address },
    Io(io::Error),
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { size, max_size } => write!(
                f,
                "program of {size} bytes does not fit in {max_size} bytes of VM memory"
            ),
            Self::StackOverflow { address } => {
                write!(f, "call stack overflow at 0x{address:04X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at 0x{address:04X}")
            }
            Self::OutOfBounds { address } => {
                write!(f, "memory access out of bounds: 0x{address:04X}")
            }
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<io::Error> for Chip8Error {
    fn from(err: io::Error) -> Self {
        Chip8Error::Io(err)
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}
