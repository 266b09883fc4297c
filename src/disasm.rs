//! Disassembler.
use std::fmt::{self, Write as FmtWrite};
use std::iter::Enumerate;

use crate::bytecode::{decode, Instr};
use crate::constants::{Address, MEM_SIZE, MEM_START};

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    pub fn print_bytecode(&self) {
        let mut s = String::new();
        self.disassemble(&mut s).expect("Failed to print bytecode");

        println!("{}", s);
    }

    /// Write the program listing to the given writer.
    ///
    /// Each line holds the memory address the instruction would be
    /// loaded at, the instruction word, and its mnemonic.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for instr in Decoder::new(self.bytecode.iter().copied()) {
            writeln!(w, "{:04X}: {:04X}  {}", instr.addr, instr.word(), instr.op)?;
        }

        // A program with an odd length has a trailing data byte.
        if self.bytecode.len() % 2 == 1 {
            let index = self.bytecode.len() - 1;
            writeln!(w, "{:04X}: {:02X}", MEM_START + index, self.bytecode[index])?;
        }

        Ok(())
    }
}

/// Iterator adaptor that decodes a stream of bytes into instructions.
struct Decoder<I> {
    iter: Enumerate<I>,
}

impl<I: Iterator> Decoder<I> {
    fn new(iter: I) -> Self {
        Self {
            iter: iter.enumerate(),
        }
    }
}

impl<I: Iterator<Item = u8>> Iterator for Decoder<I> {
    type Item = Instr;

    fn next(&mut self) -> Option<Instr> {
        let (index, a) = self.iter.next()?;
        let (_, b) = self.iter.next()?;

        let addr = MEM_START + index;
        if addr >= MEM_SIZE {
            // Stop at the end of addressable memory.
            return None;
        }

        Some(Instr {
            addr: addr as Address,
            bytes: [a, b],
            op: decode([a, b]),
        })
    }
}
