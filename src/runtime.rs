use std::cmp::Ordering;
use std::io::{self, Write as _};

use miette::Result;

use crate::bits::sign_extend;
use crate::error;
use crate::input;
use crate::memory::Memory;

/// User programs are loaded and started at this address.
const PC_START: u16 = 0x3000;

/// Represents complete machine state during execution.
pub struct RunState {
    /// System memory with the keyboard device mapped in
    mem: Memory,
    /// Program counter
    pc: u16,
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Condition code
    flag: RunFlag,
    /// Cleared by the HALT service routine
    running: bool,
}

/// Set using the result of the previous register write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunFlag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

/// Instruction classes, selected by the top four bits of a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Opcode {
    Br,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    Res,
    Lea,
    Trap,
}

impl Opcode {
    fn decode(instr: u16) -> Self {
        match instr >> 12 {
            0x0 => Self::Br,
            0x1 => Self::Add,
            0x2 => Self::Ld,
            0x3 => Self::St,
            0x4 => Self::Jsr,
            0x5 => Self::And,
            0x6 => Self::Ldr,
            0x7 => Self::Str,
            0x8 => Self::Rti,
            0x9 => Self::Not,
            0xA => Self::Ldi,
            0xB => Self::Sti,
            0xC => Self::Jmp,
            0xD => Self::Res,
            0xE => Self::Lea,
            0xF => Self::Trap,
            _ => unreachable!("the top nibble of a word is at most 0xF"),
        }
    }
}

impl RunState {
    /// Boot state: registers zeroed, condition code zero, PC at the start of
    /// user space.
    pub fn new(mem: Memory) -> Self {
        Self {
            mem,
            pc: PC_START,
            reg: [0; 8],
            flag: RunFlag::Z,
            running: true,
        }
    }

    /// Run until the program halts or a fatal instruction is reached.
    pub fn run(&mut self) -> Result<()> {
        input::init();
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// Fetch, decode, and execute a single instruction.
    pub fn step(&mut self) -> Result<()> {
        let instr = self.mem.read(self.pc);
        // PC is incremented before the instruction is performed
        self.pc = self.pc.wrapping_add(1);
        match Opcode::decode(instr) {
            Opcode::Br => self.br(instr),
            Opcode::Add => self.add(instr),
            Opcode::Ld => self.ld(instr),
            Opcode::St => self.st(instr),
            Opcode::Jsr => self.jsr(instr),
            Opcode::And => self.and(instr),
            Opcode::Ldr => self.ldr(instr),
            Opcode::Str => self.str(instr),
            Opcode::Rti => return Err(error::exec_unsupported(self.fetch_addr(), instr)),
            Opcode::Not => self.not(instr),
            Opcode::Ldi => self.ldi(instr),
            Opcode::Sti => self.sti(instr),
            Opcode::Jmp => self.jmp(instr),
            Opcode::Res => return Err(error::exec_reserved(self.fetch_addr(), instr)),
            Opcode::Lea => self.lea(instr),
            Opcode::Trap => self.trap(instr)?,
        }
        Ok(())
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn flag(&self) -> RunFlag {
        self.flag
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn reg(&self, reg: u16) -> u16 {
        self.reg[(reg & 0b111) as usize]
    }

    /// Address the current instruction was fetched from.
    fn fetch_addr(&self) -> u16 {
        self.pc.wrapping_sub(1)
    }

    #[inline]
    fn reg_mut(&mut self, reg: u16) -> &mut u16 {
        // SAFETY: Should only be indexed with values that are & 0b111
        unsafe { self.reg.get_unchecked_mut(reg as usize) }
    }

    #[inline]
    fn set_flags(&mut self, val: u16) {
        self.flag = match (val as i16).cmp(&0) {
            Ordering::Less => RunFlag::N,
            Ordering::Equal => RunFlag::Z,
            Ordering::Greater => RunFlag::P,
        }
    }

    fn add(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr1 = (instr >> 6) & 0b111;

        let val1 = *self.reg_mut(sr1);
        // Bit 5 selects the second operand: register or immediate
        let val2 = if instr & 0b100000 == 0 {
            *self.reg_mut(instr & 0b111)
        } else {
            sign_extend(instr, 5)
        };
        let res = val1.wrapping_add(val2);
        *self.reg_mut(dr) = res;
        self.set_flags(res);
    }

    fn and(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr1 = (instr >> 6) & 0b111;

        let val1 = *self.reg_mut(sr1);
        let val2 = if instr & 0b100000 == 0 {
            *self.reg_mut(instr & 0b111)
        } else {
            sign_extend(instr, 5)
        };
        let res = val1 & val2;
        *self.reg_mut(dr) = res;
        self.set_flags(res);
    }

    fn br(&mut self, instr: u16) {
        let flag = (instr >> 9) & 0b111;
        if self.flag as u16 & flag != 0 {
            self.pc = self.pc.wrapping_add(sign_extend(instr, 9));
        }
    }

    fn jmp(&mut self, instr: u16) {
        let br = (instr >> 6) & 0b111;
        self.pc = *self.reg_mut(br);
    }

    fn jsr(&mut self, instr: u16) {
        *self.reg_mut(7) = self.pc;
        if instr & 0x800 == 0 {
            // reg
            let br = (instr >> 6) & 0b111;
            self.pc = *self.reg_mut(br);
        } else {
            // offs
            self.pc = self.pc.wrapping_add(sign_extend(instr, 11));
        }
    }

    fn ld(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let addr = self.pc.wrapping_add(sign_extend(instr, 9));
        let val = self.mem.read(addr);
        *self.reg_mut(dr) = val;
        self.set_flags(val);
    }

    fn ldi(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let addr = self.pc.wrapping_add(sign_extend(instr, 9));
        let ptr = self.mem.read(addr);
        let val = self.mem.read(ptr);
        *self.reg_mut(dr) = val;
        self.set_flags(val);
    }

    fn ldr(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let br = (instr >> 6) & 0b111;
        let addr = self.reg_mut(br).wrapping_add(sign_extend(instr, 6));
        let val = self.mem.read(addr);
        *self.reg_mut(dr) = val;
        self.set_flags(val);
    }

    fn lea(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let val = self.pc.wrapping_add(sign_extend(instr, 9));
        *self.reg_mut(dr) = val;
        // The address itself sets the condition code
        self.set_flags(val);
    }

    fn not(&mut self, instr: u16) {
        let dr = (instr >> 9) & 0b111;
        let sr = (instr >> 6) & 0b111;
        let val = !*self.reg_mut(sr);
        *self.reg_mut(dr) = val;
        self.set_flags(val);
    }

    fn st(&mut self, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let val = *self.reg_mut(sr);
        let addr = self.pc.wrapping_add(sign_extend(instr, 9));
        self.mem.write(addr, val);
    }

    fn sti(&mut self, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let val = *self.reg_mut(sr);
        let addr = self.pc.wrapping_add(sign_extend(instr, 9));
        let ptr = self.mem.read(addr);
        self.mem.write(ptr, val);
    }

    fn str(&mut self, instr: u16) {
        let sr = (instr >> 9) & 0b111;
        let br = (instr >> 6) & 0b111;
        let val = *self.reg_mut(sr);
        let addr = self.reg_mut(br).wrapping_add(sign_extend(instr, 6));
        self.mem.write(addr, val);
    }

    fn trap(&mut self, instr: u16) -> Result<()> {
        *self.reg_mut(7) = self.pc;
        match instr & 0xFF {
            // getc
            0x20 => {
                *self.reg_mut(0) = input::read_byte().into();
            }
            // out
            0x21 => {
                let byte = (*self.reg_mut(0) & 0xFF) as u8;
                write_bytes(&[byte])?;
            }
            // puts
            0x22 => {
                let mut addr = *self.reg_mut(0);
                let mut bytes = Vec::new();
                loop {
                    let word = self.mem.read(addr);
                    if word == 0 {
                        break;
                    }
                    bytes.push((word & 0xFF) as u8);
                    addr = addr.wrapping_add(1);
                }
                write_bytes(&bytes)?;
            }
            // in
            0x23 => {
                write_bytes(b"Enter a character: ")?;
                let byte = input::read_byte();
                write_bytes(&[byte])?;
                *self.reg_mut(0) = byte.into();
            }
            // putsp
            0x24 => {
                let mut addr = *self.reg_mut(0);
                let mut bytes = Vec::new();
                loop {
                    let word = self.mem.read(addr);
                    if word == 0 {
                        break;
                    }
                    // Two packed characters per word, low byte first. A zero
                    // high byte ends the word without emitting a NUL.
                    bytes.push((word & 0xFF) as u8);
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        bytes.push(high);
                    }
                    addr = addr.wrapping_add(1);
                }
                write_bytes(&bytes)?;
            }
            // halt
            0x25 => {
                write_bytes(b"HALT\n")?;
                self.running = false;
            }
            // Vectors outside the defined service set are no-ops
            _ => (),
        }
        Ok(())
    }
}

/// Program output is flushed immediately so that polling callers see it.
///
/// A failed write (such as a closed downstream pipe) is a fatal error, not a
/// panic, so every exit path still restores the terminal.
fn write_bytes(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(error::host_output)
}
