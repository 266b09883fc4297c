//! CPU and memory state.
use crate::constants::*;
use crate::error::{Chip8Error, Chip8Result};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: Address,
    /// Stack pointer, counting the occupied slots of the call stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are meaningful.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Indicates that the machine is stalled waiting for a keypress.
    pub(crate) key_wait: bool,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: Box<[Address; STACK_SIZE]>,
    /// Screen buffer that is drawn to.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    /// Set when the display buffer has changed and should be presented again.
    pub(crate) redraw: bool,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: 0,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: false,
            key_state: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: Box::new([0; STACK_SIZE]),
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),
            redraw: false,
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Erase all machine state in preparation for a fresh program.
    pub(crate) fn reset(&mut self) {
        self.pc = 0;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = false;
        self.key_state = 0;

        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(false);
        self.redraw = false;
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
        self.redraw = true;
    }

    /// Push a return address onto the call stack.
    pub(crate) fn push_stack(&mut self, addr: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { address: self.pc });
        }
        self.stack[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    /// Pop a return address off the call stack.
    pub(crate) fn pop_stack(&mut self) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { address: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Read one byte from memory.
    pub(crate) fn read_byte(&self, addr: Address) -> Chip8Result<u8> {
        self.ram
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::OutOfBounds { address: addr })
    }

    /// Write one byte to memory.
    pub(crate) fn write_byte(&mut self, addr: Address, value: u8) -> Chip8Result<()> {
        match self.ram.get_mut(addr as usize) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(Chip8Error::OutOfBounds { address: addr }),
        }
    }

    /// Fetch the instruction at the program counter, advancing it by 2.
    ///
    /// The program counter is masked to the 12-bit address space before
    /// the read. A fetch that would cross the end of memory is an error.
    pub(crate) fn fetch(&mut self) -> Chip8Result<[u8; 2]> {
        let pc = (self.pc & ADDRESS_MASK) as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(Chip8Error::OutOfBounds { address: self.pc });
        }
        let bytes = [self.ram[pc], self.ram[pc + 1]];
        self.pc = pc as Address + 2;
        Ok(bytes)
    }

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
        }
    }

    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Retrieve the value of the first key that is pressed down.
    #[inline]
    pub fn first_key(&self) -> Option<u8> {
        if self.any_key() {
            for k in 0..KEY_COUNT {
                if self.key_state(k) {
                    return Some(k);
                }
            }
        }
        None
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down the delay timer, stopping at zero.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer, stopping at zero.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
