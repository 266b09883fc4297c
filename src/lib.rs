mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod disasm;
mod error;
mod keypad;
mod vm;

pub use self::clock::Clock;
pub use self::vm::Hz;

/// Implementation version, exposed so frontends can display it.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Borrowed view of the display buffer, one `bool` per pixel,
/// in row-major order.
pub type Chip8DisplayBuffer<'a> = &'a [bool; constants::DISPLAY_BUFFER_SIZE];

pub mod prelude {
    pub use super::{
        bytecode::{decode, Instr, Op},
        cpu::Chip8Cpu,
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
