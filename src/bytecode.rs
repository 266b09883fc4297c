//! Instruction decoding.
//!
//! Instructions are two bytes, big-endian, with the operands packed
//! into fixed positions of the 16-bit word.
use std::fmt::{self, Formatter};

use crate::constants::{Address, MEM_SIZE, MEM_START};

/// Check whether a bytecode program will fit in VM memory.
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MEM_SIZE - MEM_START
}

/// A single decoded instruction.
pub struct Instr {
    /// Address in memory where the instruction is located.
    pub addr: Address,
    /// The original bytes that were read from the buffer.
    pub bytes: [u8; 2],
    pub op: Op,
}

impl Instr {
    /// Original bytes encoded into a `u16`.
    #[inline(always)]
    pub fn word(&self) -> u16 {
        u16::from_be_bytes(self.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 0nnn (SYS addr)
    ///
    /// Machine code routine on the original hardware.
    /// Recognised and ignored.
    Sys { address: Address },
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`.
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`. The carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// Shift VX right by 1. VF receives the shifted out bit. VY is unused.
    ShiftRight { vx: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// Shift VX left by 1. VF receives the shifted out bit. VY is unused.
    ShiftLeft { vx: u8 },

    /// 9xy0 (SNE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` does not equal register `Vy`.
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number.
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keypad
    /// Ex9E (SKP Vx)
    ///
    /// Skip the next instruction if the key indexed by `Vx` is pressed.
    Skip_KeyPressed { vx: u8 },
    /// ExA1 (SKNP Vx)
    ///
    /// Skip the next instruction if the key indexed by `Vx` is not pressed.
    Skip_KeyNotPressed { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers and memory
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Stall until a key is pressed, then store the key value in `Vx`.
    WaitKey { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    ///
    /// Add Vx to I. The flags register is not touched.
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Point I at the font glyph for the digit in `Vx`.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    ///
    /// Store the binary-coded decimal of Vx in memory at I, I+1 and I+2.
    StoreDecimal { vx: u8 },
    /// Fx55 (LD [I], Vx)
    ///
    /// Store registers V0 through Vx in memory starting at location I.
    StoreRegisters { vx: u8 },
    /// Fx65 (LD Vx, [I])
    ///
    /// Read registers V0 through Vx from memory starting at location I.
    LoadRegisters { vx: u8 },

    /// Instruction that matches no known encoding.
    Unknown { word: u16 },
}

/// Decode a two byte instruction into its operation.
#[inline]
pub fn decode(bytecode: [u8; 2]) -> Op {
    let [a, b] = bytecode;
    let op = a >> 4; // 0xF000
    let vx = a & 0xF; // 0x0F00
    let vy = b >> 4; // 0x00F0
    let n = b & 0xF; // 0x000F
    let nn = b; // 0x00FF
    let nnn = (((a as u16) & 0xF) << 8) | b as u16; // 0x0FFF
    let word = ((a as u16) << 8) | b as u16;

    match op {
        0x0 => match nnn {
            0x0E0 => Op::ClearScreen,
            0x0EE => Op::Return,
            _ => Op::Sys { address: nnn },
        },
        0x1 => Op::JumpAddress { address: nnn },
        0x2 => Op::Call { address: nnn },
        0x3 => Op::Skip_Eq_Byte { vx, nn },
        0x4 => Op::Skip_NotEq_Byte { vx, nn },
        0x5 if n == 0 => Op::Skip_Eq { vx, vy },
        0x6 => Op::Load_Byte { vx, nn },
        0x7 => Op::Add_Byte { vx, nn },
        0x8 => match n {
            0x0 => Op::Load_Vx_Vy { vx, vy },
            0x1 => Op::Or_Vx_Vy { vx, vy },
            0x2 => Op::And_Vx_Vy { vx, vy },
            0x3 => Op::Xor_Vx_Vy { vx, vy },
            0x4 => Op::Add_Vx_Vy { vx, vy },
            0x5 => Op::Sub_Vx_Vy { vx, vy },
            0x6 => Op::ShiftRight { vx },
            0x7 => Op::SubReverse_Vx_Vy { vx, vy },
            0xE => Op::ShiftLeft { vx },
            _ => Op::Unknown { word },
        },
        0x9 if n == 0 => Op::Skip_NotEq { vx, vy },
        0xA => Op::Load_Address { address: nnn },
        0xB => Op::Jump_V0 { address: nnn },
        0xC => Op::Random { vx, nn },
        0xD => Op::Draw { vx, vy, n },
        0xE => match nn {
            0x9E => Op::Skip_KeyPressed { vx },
            0xA1 => Op::Skip_KeyNotPressed { vx },
            _ => Op::Unknown { word },
        },
        0xF => match nn {
            0x07 => Op::Load_Vx_Delay { vx },
            0x0A => Op::WaitKey { vx },
            0x15 => Op::Load_Delay_Vx { vx },
            0x18 => Op::Load_Sound_Vx { vx },
            0x1E => Op::Add_Address_Vx { vx },
            0x29 => Op::Load_Font { vx },
            0x33 => Op::StoreDecimal { vx },
            0x55 => Op::StoreRegisters { vx },
            0x65 => Op::LoadRegisters { vx },
            _ => Op::Unknown { word },
        },
        _ => Op::Unknown { word },
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Sys { address } => write!(f, "SYS 0x{address:03X}"),
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx}, {nn}"),
            Op::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx}, {nn}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx}, v{vy}"),
            Op::Load_Byte { vx, nn } => write!(f, "LD v{vx}, {nn}"),
            Op::Add_Byte { vx, nn } => write!(f, "ADD v{vx}, {nn}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx}, v{vy}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx}, v{vy}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx}, v{vy}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx}, v{vy}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx}, v{vy}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx}, v{vy}"),
            Op::ShiftRight { vx } => write!(f, "SHR v{vx}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx}, v{vy}"),
            Op::ShiftLeft { vx } => write!(f, "SHL v{vx}"),
            // ------
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx}, v{vy}"),
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP V0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx}, {nn}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx}, v{vy}, {n}"),
            // ------
            Op::Skip_KeyPressed { vx } => write!(f, "SKP v{vx}"),
            Op::Skip_KeyNotPressed { vx } => write!(f, "SKNP v{vx}"),
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx}, DT"),
            Op::WaitKey { vx } => write!(f, "LD v{vx}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx}"),
            Op::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx}"),
            Op::Load_Font { vx } => write!(f, "LD F, v{vx}"),
            Op::StoreDecimal { vx } => write!(f, "LD B, v{vx}"),
            Op::StoreRegisters { vx } => write!(f, "LD [I], v{vx}"),
            Op::LoadRegisters { vx } => write!(f, "LD v{vx}, [I]"),
            Op::Unknown { word } => write!(f, "0x{word:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operand_extraction() {
        // 0xABCD: op 0xA, x 0xB, nnn 0xBCD
        assert_eq!(decode([0xAB, 0xCD]), Op::Load_Address { address: 0xBCD });
        assert_eq!(decode([0x6A, 0x12]), Op::Load_Byte { vx: 0xA, nn: 0x12 });
        assert_eq!(decode([0xD1, 0x2F]), Op::Draw { vx: 1, vy: 2, n: 0xF });
        assert_eq!(decode([0x81, 0x24]), Op::Add_Vx_Vy { vx: 1, vy: 2 });
        assert_eq!(decode([0x12, 0x34]), Op::JumpAddress { address: 0x234 });
    }

    #[test]
    fn test_decode_misc() {
        assert_eq!(decode([0x00, 0xE0]), Op::ClearScreen);
        assert_eq!(decode([0x00, 0xEE]), Op::Return);
        assert_eq!(decode([0x02, 0x34]), Op::Sys { address: 0x234 });
        assert_eq!(decode([0xE1, 0x9E]), Op::Skip_KeyPressed { vx: 1 });
        assert_eq!(decode([0xE1, 0xA1]), Op::Skip_KeyNotPressed { vx: 1 });
        assert_eq!(decode([0xF1, 0x0A]), Op::WaitKey { vx: 1 });
        assert_eq!(decode([0xF1, 0x33]), Op::StoreDecimal { vx: 1 });
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(decode([0xFF, 0xFF]), Op::Unknown { word: 0xFFFF });
        // 8xy8 is not a defined arithmetic instruction
        assert_eq!(decode([0x81, 0x28]), Op::Unknown { word: 0x8128 });
        // 5xyn and 9xyn are only defined for n == 0
        assert_eq!(decode([0x51, 0x21]), Op::Unknown { word: 0x5121 });
        assert_eq!(decode([0x91, 0x21]), Op::Unknown { word: 0x9121 });
        assert_eq!(decode([0xE1, 0x00]), Op::Unknown { word: 0xE100 });
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode([0x00, 0xE0]).to_string(), "CLS");
        assert_eq!(decode([0x12, 0x34]).to_string(), "JP 0x234");
        assert_eq!(decode([0x61, 0x0A]).to_string(), "LD v1, 10");
        assert_eq!(decode([0xD1, 0x25]).to_string(), "DRW v1, v2, 5");
        assert_eq!(decode([0xF5, 0x65]).to_string(), "LD v5, [I]");
        assert_eq!(decode([0xB2, 0x00]).to_string(), "JP V0, 0x200");
    }

    #[test]
    fn test_program_size() {
        assert!(check_program_size(&[0u8; 0xE00]));
        assert!(!check_program_size(&[0u8; 0xE01]));
    }
}
