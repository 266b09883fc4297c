//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use log::warn;
use rand::prelude::*;

use crate::{
    bytecode::{check_program_size, decode, Op},
    constants::*,
    cpu::Chip8Cpu,
    error::{Chip8Error, Chip8Result},
    keypad::KeyCode,
    Chip8DisplayBuffer,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a bytecode program into memory, resetting the machine.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
                max_size: MEM_SIZE - MEM_START,
            });
        }

        // Start with clean state to avoid leaking the previous program.
        self.cpu.reset();

        // The fontset lives in the space reserved for the interpreter.
        let fontset_start = FONTSET_START as usize;
        self.cpu.ram[fontset_start..fontset_start + FONTSET.len()].copy_from_slice(&FONTSET);

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        // Position the program counter at the entry point.
        self.cpu.pc = MEM_START as Address;

        Ok(())
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        &self.cpu.display
    }

    /// Current position of the program counter.
    pub fn program_counter(&self) -> Address {
        self.cpu.pc
    }

    /// Whether the display buffer has changed since the last call.
    ///
    /// Clears the flag, so the caller is expected to present the
    /// buffer when `true` is returned.
    pub fn take_redraw(&mut self) -> bool {
        let redraw = self.cpu.redraw;
        self.cpu.redraw = false;
        redraw
    }

    /// Whether the buzzer should currently be audible.
    pub fn sound_active(&self) -> bool {
        self.cpu.sound_timer > 0
    }
}

/// Outcome of a single interpreter step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was mutated.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The instruction matched no known encoding and was skipped.
    Unknown { word: u16 },
}

/// VM Configuration Parameters.
#[derive(Default, Clone)]
pub struct Chip8Conf {
    pub clock_frequency: Option<Hz>,
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy)]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// When the VM is stalled waiting for keyboard input, a keypress
    /// releases the wait so it can be resumed.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key as u8, pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers.
    ///
    /// The caller drives this at its own cadence, conventionally 60Hz,
    /// independent of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Run a fixed number of steps, returning the flow of the last one.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;
        for _ in 0..step_count {
            flow = self.step()?;
        }
        Ok(flow)
    }

    /// Execute a single fetch-decode-execute cycle.
    ///
    /// Exactly one instruction's effect is applied. Errors and control
    /// flow signals are returned to the caller, which owns the policy
    /// for halting or continuing.
    ///
    /// While the machine is waiting for a keypress, the cycle is a
    /// no-op reporting [`Flow::KeyWait`] until the pad shows a key down.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        // The wait state is level-triggered. The pad is read fresh on
        // every cycle, so a keypress between cycles ends the wait.
        if self.cpu.key_wait && !self.cpu.any_key() {
            return Ok(Flow::KeyWait);
        }

        let addr = self.cpu.pc;
        let op = decode(self.cpu.fetch()?);

        op_trace(addr, &op);

        self.exec(addr, op)
    }

    fn exec(&mut self, addr: Address, op: Op) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        match op {
            // 0nnn (SYS addr)
            //
            // Machine code routine on the original hardware. Ignored.
            Op::Sys { .. } => {}
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the address popped off the stack.
            Op::Return => {
                self.cpu.pc = self.cpu.pop_stack()?;
                control_flow = Flow::Jump;
            }
            // 1NNN (JP addr)
            //
            // Jump to address.
            Op::JumpAddress { address } => {
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN, pushing the return address.
            Op::Call { address } => {
                self.cpu.push_stack(self.cpu.pc)?;
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                if self.cpu.registers[vx as usize] == nn {
                    self.cpu.pc += 2;
                }
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Op::Skip_NotEq_Byte { vx, nn } => {
                if self.cpu.registers[vx as usize] != nn {
                    self.cpu.pc += 2;
                }
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals register VY.
            Op::Skip_Eq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                if x == y {
                    self.cpu.pc += 2;
                }
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            Op::Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
            }
            // 7XNN (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // ----------------------------------------------------------------
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            Op::Load_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] = self.cpu.registers[vy as usize];
            }
            // 8XY1 (OR Vx, Vy)
            Op::Or_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] |= self.cpu.registers[vy as usize];
            }
            // 8XY2 (AND Vx, Vy)
            Op::And_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] &= self.cpu.registers[vy as usize];
            }
            // 8XY3 (XOR Vx, Vy)
            Op::Xor_Vx_Vy { vx, vy } => {
                self.cpu.registers[vx as usize] ^= self.cpu.registers[vy as usize];
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // Add VY to VX, and store the result in VX.
            // Overflow is wrapped, and sets VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                let (result, carry) = x.overflowing_add(y);
                self.cpu.registers[vx as usize] = result;
                self.cpu.registers[0xF] = carry as u8;
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtract VY from VX, and store the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                let (result, borrow) = x.overflowing_sub(y);
                self.cpu.registers[vx as usize] = result;
                self.cpu.registers[0xF] = (!borrow) as u8;
            }
            // 8XY6 (SHR Vx)
            //
            // Shift VX right by 1. VF receives the shifted out bit.
            // VY is unused.
            Op::ShiftRight { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x >> 1;
                self.cpu.registers[0xF] = x & 1;
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtract VX from VY, and store the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                let (result, borrow) = y.overflowing_sub(x);
                self.cpu.registers[vx as usize] = result;
                self.cpu.registers[0xF] = (!borrow) as u8;
            }
            // 8XYE (SHL Vx)
            //
            // Shift VX left by 1. VF receives the shifted out bit.
            // VY is unused.
            Op::ShiftLeft { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x << 1;
                self.cpu.registers[0xF] = (x >> 7) & 1;
            }
            // ----------------------------------------------------------------
            // 9XY0 (SNE Vx, Vy)
            //
            // Skip the next instruction if VX does not equal VY.
            Op::Skip_NotEq { vx, vy } => {
                let x = self.cpu.registers[vx as usize];
                let y = self.cpu.registers[vy as usize];
                if x != y {
                    self.cpu.pc += 2;
                }
            }
            // ANNN (LD I, addr)
            //
            // Set address register I to value NNN.
            Op::Load_Address { address } => {
                self.cpu.address = address;
            }
            // BNNN (JP V0, addr)
            //
            // Jump to location NNN plus the value of register V0.
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.cpu.registers[0] as Address;
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                self.cpu.registers[vx as usize] = nn & thread_rng().gen::<u8>();
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinates per registers VX and VY.
            // The sprite is 8 pixels wide and N rows high, read from the memory
            // pointed to by address register I.
            Op::Draw { vx, vy, n } => {
                control_flow = self.exec_draw(vx, vy, n)?;
            }
            // ----------------------------------------------------------------
            // EX9E (SKP Vx)
            //
            // Skip the next instruction if the key indexed by VX is pressed.
            Op::Skip_KeyPressed { vx } => {
                if self.cpu.key_state(self.cpu.registers[vx as usize]) {
                    self.cpu.pc += 2;
                }
            }
            // EXA1 (SKNP Vx)
            //
            // Skip the next instruction if the key indexed by VX is not pressed.
            Op::Skip_KeyNotPressed { vx } => {
                if !self.cpu.key_state(self.cpu.registers[vx as usize]) {
                    self.cpu.pc += 2;
                }
            }
            // ----------------------------------------------------------------
            // FX07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            Op::Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.delay_timer;
            }
            // FX0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            //
            // The program counter is rewound so the wait resumes on this
            // instruction, and the wait flag is raised so stepping stalls
            // before fetch until the pad shows a key down.
            Op::WaitKey { vx } => match self.cpu.first_key() {
                Some(key) => {
                    self.cpu.registers[vx as usize] = key;
                    self.cpu.key_wait = false;
                }
                None => {
                    self.cpu.pc -= 2;
                    self.cpu.key_wait = true;
                    control_flow = Flow::KeyWait;
                }
            },
            // FX15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            Op::Load_Delay_Vx { vx } => {
                self.cpu.delay_timer = self.cpu.registers[vx as usize];
            }
            // FX18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            Op::Load_Sound_Vx { vx } => {
                self.cpu.sound_timer = self.cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // FX1E (ADD I, Vx)
            //
            // Add Vx to I, wrapping at 16 bits. The flags register is
            // left untouched.
            Op::Add_Address_Vx { vx } => {
                let x = self.cpu.registers[vx as usize] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
            }
            // FX29 (LD F, Vx)
            //
            // Set I = location of the font sprite for digit Vx.
            Op::Load_Font { vx } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.address = FONTSET_START + x as Address * FONTSET_HEIGHT as Address;
            }
            // FX33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            Op::StoreDecimal { vx } => {
                let base = self.cpu.address;
                let x = self.cpu.registers[vx as usize];
                self.cpu.write_byte(base, x / 100 % 10)?;
                self.cpu.write_byte(base + 1, x / 10 % 10)?;
                self.cpu.write_byte(base + 2, x % 10)?;
            }
            // FX55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I itself is left unchanged.
            Op::StoreRegisters { vx } => {
                let base = self.cpu.address;
                for v in 0..=vx as usize {
                    self.cpu.write_byte(base + v as Address, self.cpu.registers[v])?;
                }
            }
            // FX65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            // I itself is left unchanged.
            Op::LoadRegisters { vx } => {
                let base = self.cpu.address;
                for v in 0..=vx as usize {
                    self.cpu.registers[v] = self.cpu.read_byte(base + v as Address)?;
                }
            }
            // ----------------------------------------------------------------
            // Unrecognised instruction.
            //
            // Skipped, so a stray data word does not kill the program.
            // The caller owns the policy for reacting to it.
            Op::Unknown { word } => {
                warn!("unknown opcode 0x{word:04X} at 0x{addr:04X}");
                control_flow = Flow::Unknown { word };
            }
        }

        Ok(control_flow)
    }

    /// Execute the DRW instruction.
    ///
    /// The origin wraps around the display edges, but the sprite body is
    /// clipped at the right and bottom edges instead of wrapping.
    ///
    /// Pixels are drawn by XOR. When the draw erases an existing pixel,
    /// register VF is set to 1, otherwise 0. Used for collision detection.
    fn exec_draw(&mut self, vx: u8, vy: u8, n: u8) -> Chip8Result<Flow> {
        let origin_x = self.cpu.registers[vx as usize] as usize & DISPLAY_WIDTH_MASK;
        let origin_y = self.cpu.registers[vy as usize] as usize & DISPLAY_HEIGHT_MASK;

        self.cpu.registers[0xF] = 0;

        // Marked before the rows are applied. A row read that fails
        // below can leave a partial draw that still needs presenting.
        self.cpu.redraw = true;

        for r in 0..n as usize {
            let y = origin_y + r;
            if y >= DISPLAY_HEIGHT {
                // Clip at the bottom edge.
                break;
            }

            // Each row is 8 bits representing the 8 pixels of the sprite.
            let row = self.cpu.read_byte(self.cpu.address + r as Address)?;

            for c in 0..8 {
                let x = origin_x + c;
                if x >= DISPLAY_WIDTH {
                    // Clip at the right edge.
                    break;
                }

                let sprite_px = (row >> (7 - c)) & 1 != 0;
                let index = x + y * DISPLAY_WIDTH;
                let old_px = self.cpu.display[index];

                // XOR erases a pixel when the old and new values are both 1.
                if old_px && sprite_px {
                    self.cpu.registers[0xF] = 1;
                }
                self.cpu.display[index] = old_px ^ sprite_px;
            }
        }

        Ok(Flow::Draw)
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.ram[i + 1])?;
        }

        Ok(buf)
    }

    /// Renders the display buffer as ASCII art, one character per pixel.
    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(addr: Address, op: &Op) {
    log::trace!("{addr:04X}: {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: &Op) {}
