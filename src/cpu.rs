//! # cpu
//!
//! Fetch, decode and execute, one instruction per [`Cpu::execute_one`].
//!
//! Instructions are 16 bits, big-endian, and split into nibbles:
//!
//! ```text
//!   op  x   y   n
//!   |   `---nnn---'
//!   |       `-nn--'
//! ```
//!
//! The CPU owns memory, registers, the stack, the display model, the timers
//! and the keypad. It never blocks: Fx0A and (with the vblank quirk) Dxyn
//! hand a [`Step`] back to the scheduler, which decides when to carry on.
use crate::display::{Display, Filter, Resolution};
use crate::error::Chip8Error;
use crate::input::Keypad;
use crate::memory::{
    Chip8MemoryMap, MemoryMap, ADDR_MASK, BIG_FONT_ADDR, BIG_FONT_GLYPH_BYTES, PROGRAM_ADDR,
    SMALL_FONT_ADDR, SMALL_FONT_GLYPH_BYTES,
};
use crate::quirks::{MemoryIndexing, Platform, ProgramMetadata, Quirks};
use crate::timer::{Timers, ToneEvent};
use log::{error, info, trace, warn};
use rand::Rng;
use std::io;

pub const REG_COUNT: usize = 16;
const VF: usize = 0xf;

/// where hybrid VIP 64x64 programs really start
const VIP_HIRES_BOOT_WORD: u16 = 0x1260;
const VIP_HIRES_START_ADDR: u16 = 0x02c0;

/// a sprite draw held back until the next refresh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingDraw {
    pub x: u8,
    pub y: u8,
    pub n: u8,
}

/// what happened on the last instruction, as far as the scheduler cares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Fx0A: block until a key is down, then put it in this register
    WaitForKey(u8),
    /// Dxyn with the vblank quirk: nothing more until the next refresh
    WaitForVblank(PendingDraw),
    /// 00EE with nothing to return to; PC went back to the start address
    StackUnderflow,
    /// 00FD
    Exit,
}

pub struct Cpu {
    memory: Chip8MemoryMap,
    display: Display,
    timers: Timers,
    keypad: Keypad,
    platform: Platform,
    quirks: Quirks,
    v: [u8; REG_COUNT],
    i: u16,
    pc: u16,
    stack: Vec<u16>,
    /// SUPER-CHIP user flags (Fx75/Fx85); not persisted
    rpl: [u8; REG_COUNT],
    tone: Option<ToneEvent>,
}

impl Cpu {
    pub fn new(metadata: &ProgramMetadata, filter: Filter) -> Self {
        Cpu {
            memory: Chip8MemoryMap::new(),
            display: Display::new(filter),
            timers: Timers::new(),
            keypad: Keypad::new(),
            platform: metadata.platform,
            quirks: metadata.quirks,
            v: [0; REG_COUNT],
            i: 0,
            pc: PROGRAM_ADDR,
            stack: Vec::new(),
            rpl: [0; REG_COUNT],
            tone: None,
        }
    }

    /// load the program image; memory is untouched on failure
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.memory.load_program(reader)?;
        if self.platform.has_vip_hires() && self.memory.get_word(PROGRAM_ADDR) == VIP_HIRES_BOOT_WORD {
            info!("64x64 hi-res program, starting at {:#05x}", VIP_HIRES_START_ADDR);
            self.display.set_resolution(Resolution::VipHigh);
            self.pc = VIP_HIRES_START_ADDR;
        }
        Ok(len)
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn reg(&self, x: u8) -> u8 {
        self.v[(x & 0x0f) as usize]
    }

    pub fn set_reg(&mut self, x: u8, value: u8) {
        self.v[(x & 0x0f) as usize] = value;
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn quirks(&self) -> &Quirks {
        &self.quirks
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut Display {
        &mut self.display
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    /// tone edge caused by the last Fx18, if any
    pub fn take_tone_event(&mut self) -> Option<ToneEvent> {
        self.tone.take()
    }

    // Break u16 instruction into 4 u8 nibbles
    fn nibbles(n: u16) -> (u8, u8, u8, u8) {
        (
            (n >> 12) as u8,
            ((n >> 8) & 0xf) as u8,
            ((n >> 4) & 0xf) as u8,
            (n & 0xf) as u8,
        )
    }

    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.pc = (self.pc + 2) & ADDR_MASK;
        }
    }

    pub fn execute_one(&mut self) -> Result<Step, Chip8Error> {
        let addr = self.pc;
        let opcode = self.memory.get_word(addr);
        self.pc = (addr + 2) & ADDR_MASK;
        trace!("{:03x}: {:04x}", addr, opcode);

        let nnn = opcode & 0x0fff;
        let nn = (opcode & 0x00ff) as u8;
        let hires = self.platform.has_vip_hires();
        let schip = self.platform.has_superchip_opcodes();

        match Self::nibbles(opcode) {
            // 00E0 CLS
            (0x0, 0x0, 0xE, 0x0) => self.display.clear(),
            // 00EE RET
            (0x0, 0x0, 0xE, 0xE) => match self.stack.pop() {
                Some(ret) => self.pc = ret,
                None => {
                    warn!("return with empty stack at {:03x}, restarting", addr);
                    self.pc = PROGRAM_ADDR;
                    return Ok(Step::StackUnderflow);
                }
            },
            // 0230 CLS and switch to 64x64
            (0x0, 0x2, 0x3, 0x0) if hires => {
                self.display.clear();
                self.display.set_resolution(Resolution::VipHigh);
            }
            // 00Cn SCD n
            (0x0, 0x0, 0xC, n) if schip => self.display.scroll_down(n as usize),
            // 00FB SCR
            (0x0, 0x0, 0xF, 0xB) if schip => self.display.scroll_right(4),
            // 00FC SCL
            (0x0, 0x0, 0xF, 0xC) if schip => self.display.scroll_left(4),
            // 00FD EXIT
            (0x0, 0x0, 0xF, 0xD) if schip => return Ok(Step::Exit),
            // 00FE LOW
            (0x0, 0x0, 0xF, 0xE) if schip => {
                info!("low-res mode");
                self.display.set_resolution(Resolution::Low);
            }
            // 00FF HIGH
            (0x0, 0x0, 0xF, 0xF) if schip => {
                info!("high-res mode");
                self.display.set_resolution(Resolution::High);
            }
            // 1nnn JP addr
            (0x1, _, _, _) => self.pc = nnn,
            // 2nnn CALL addr
            (0x2, _, _, _) => {
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            // 3xkk SE Vx, byte
            (0x3, x, _, _) => self.skip_if(self.reg(x) == nn),
            // 4xkk SNE Vx, byte
            (0x4, x, _, _) => self.skip_if(self.reg(x) != nn),
            // 5xy0 SE Vx, Vy
            (0x5, x, y, 0x0) => self.skip_if(self.reg(x) == self.reg(y)),
            // 6xkk LD Vx, byte
            (0x6, x, _, _) => self.set_reg(x, nn),
            // 7xkk ADD Vx, byte; VF untouched
            (0x7, x, _, _) => self.set_reg(x, self.reg(x).wrapping_add(nn)),
            // 8xy0 LD Vx, Vy
            (0x8, x, y, 0x0) => self.set_reg(x, self.reg(y)),
            // 8xy1 OR, 8xy2 AND, 8xy3 XOR
            (0x8, x, y, op @ 0x1..=0x3) => {
                let (vx, vy) = (self.reg(x), self.reg(y));
                let result = match op {
                    0x1 => vx | vy,
                    0x2 => vx & vy,
                    _ => vx ^ vy,
                };
                self.set_reg(x, result);
                if self.quirks.logic_clears_vf {
                    self.v[VF] = 0;
                }
            }
            // 8xy4 ADD Vx, Vy; VF = carry
            (0x8, x, y, 0x4) => {
                let (sum, carry) = self.reg(x).overflowing_add(self.reg(y));
                self.set_reg(x, sum);
                self.v[VF] = carry as u8;
            }
            // 8xy5 SUB Vx, Vy; VF = NOT borrow
            (0x8, x, y, 0x5) => {
                let (diff, borrow) = self.reg(x).overflowing_sub(self.reg(y));
                self.set_reg(x, diff);
                self.v[VF] = !borrow as u8;
            }
            // 8xy6 SHR Vx {, Vy}
            (0x8, x, y, 0x6) => {
                if self.quirks.shift_reads_vy {
                    self.set_reg(x, self.reg(y));
                }
                let src = self.reg(x);
                self.set_reg(x, src >> 1);
                self.v[VF] = src & 0x1;
            }
            // 8xy7 SUBN Vx, Vy; VF = NOT borrow
            (0x8, x, y, 0x7) => {
                let (diff, borrow) = self.reg(y).overflowing_sub(self.reg(x));
                self.set_reg(x, diff);
                self.v[VF] = !borrow as u8;
            }
            // 8xyE SHL Vx {, Vy}
            (0x8, x, y, 0xE) => {
                if self.quirks.shift_reads_vy {
                    self.set_reg(x, self.reg(y));
                }
                let src = self.reg(x);
                self.set_reg(x, src << 1);
                self.v[VF] = src >> 7;
            }
            // 9xy0 SNE Vx, Vy
            (0x9, x, y, 0x0) => self.skip_if(self.reg(x) != self.reg(y)),
            // Annn LD I, addr
            (0xA, _, _, _) => self.i = nnn,
            // Bnnn JP V0, addr (or Bxnn JP Vx, addr)
            (0xB, x, _, _) => {
                let offset = if self.quirks.jump_uses_vx { self.reg(x) } else { self.v[0] };
                self.pc = (nnn + offset as u16) & ADDR_MASK;
            }
            // Cxkk RND Vx, byte
            (0xC, x, _, _) => {
                let r: u8 = rand::thread_rng().gen();
                self.set_reg(x, r & nn);
            }
            // Dxyn DRW Vx, Vy, nibble
            (0xD, x, y, n) => {
                let draw = PendingDraw {
                    x: self.reg(x),
                    y: self.reg(y),
                    n,
                };
                if self.quirks.vblank_wait {
                    return Ok(Step::WaitForVblank(draw));
                }
                self.draw_sprite(draw);
            }
            // Ex9E SKP Vx
            (0xE, x, 0x9, 0xE) => self.skip_if(self.keypad.is_down(self.reg(x))),
            // ExA1 SKNP Vx
            (0xE, x, 0xA, 0x1) => self.skip_if(!self.keypad.is_down(self.reg(x))),
            // Fx07 LD Vx, DT
            (0xF, x, 0x0, 0x7) => self.set_reg(x, self.timers.delay()),
            // Fx0A LD Vx, K
            (0xF, x, 0x0, 0xA) => return Ok(Step::WaitForKey(x)),
            // Fx15 LD DT, Vx
            (0xF, x, 0x1, 0x5) => self.timers.set_delay(self.reg(x)),
            // Fx18 LD ST, Vx
            (0xF, x, 0x1, 0x8) => {
                if let Some(e) = self.timers.set_sound(self.reg(x)) {
                    self.tone = Some(e);
                }
            }
            // Fx1E ADD I, Vx; VF untouched unless asked for
            (0xF, x, 0x1, 0xE) => {
                let sum = self.i + self.reg(x) as u16;
                if self.quirks.index_overflow_flag {
                    self.v[VF] = (sum > ADDR_MASK) as u8;
                }
                self.i = sum & ADDR_MASK;
            }
            // Fx29 LD F, Vx
            (0xF, x, 0x2, 0x9) => {
                self.i = SMALL_FONT_ADDR + (self.reg(x) & 0xf) as u16 * SMALL_FONT_GLYPH_BYTES;
            }
            // Fx30 LD HF, Vx
            (0xF, x, 0x3, 0x0) if schip => {
                self.i = BIG_FONT_ADDR + (self.reg(x) & 0xf) as u16 * BIG_FONT_GLYPH_BYTES;
            }
            // Fx33 LD B, Vx
            (0xF, x, 0x3, 0x3) => {
                let val = self.reg(x);
                self.memory.write_byte(self.i, val / 100);
                self.memory.write_byte(self.i + 1, (val / 10) % 10);
                self.memory.write_byte(self.i + 2, val % 10);
            }
            // Fx55 LD [I], Vx
            (0xF, x, 0x5, 0x5) => {
                for r in 0..=x {
                    self.memory.write_byte(self.i + r as u16, self.reg(r));
                }
                self.bump_index(x);
            }
            // Fx65 LD Vx, [I]
            (0xF, x, 0x6, 0x5) => {
                for r in 0..=x {
                    let val = self.memory.read_byte(self.i + r as u16);
                    self.set_reg(r, val);
                }
                self.bump_index(x);
            }
            // Fx75 LD R, Vx
            (0xF, x, 0x7, 0x5) if schip => {
                let n = x as usize + 1;
                self.rpl[..n].copy_from_slice(&self.v[..n]);
            }
            // Fx85 LD Vx, R
            (0xF, x, 0x8, 0x5) if schip => {
                let n = x as usize + 1;
                self.v[..n].copy_from_slice(&self.rpl[..n]);
            }
            _ => {
                error!("unknown opcode {:04x} at {:03x}", opcode, addr);
                self.pc = addr;
                return Err(Chip8Error::UnknownOpcode { addr, opcode });
            }
        }
        Ok(Step::Continue)
    }

    /// I after Fx55/Fx65
    fn bump_index(&mut self, x: u8) {
        let by = match self.quirks.memory {
            MemoryIndexing::IncrementByXPlusOne => x as u16 + 1,
            MemoryIndexing::IncrementByX => x as u16,
            MemoryIndexing::Unchanged => return,
        };
        self.i = (self.i + by) & ADDR_MASK;
    }

    /// XOR a sprite from I onto the screen, setting VF on collision. In
    /// 128x64 mode n=0 draws 16 rows of two bytes each.
    pub fn draw_sprite(&mut self, draw: PendingDraw) {
        let (rows, width): (Vec<u16>, usize) =
            if draw.n == 0 && self.display.resolution() == Resolution::High {
                let rows: Vec<u16> = (0..16u16)
                    .map(|r| self.memory.get_word(self.i + r * 2))
                    .collect();
                (rows, 16)
            } else {
                let rows: Vec<u16> = (0..draw.n as u16)
                    .map(|r| (self.memory.read_byte(self.i + r) as u16) << 8)
                    .collect();
                (rows, 8)
            };
        let collision = self.display.draw_sprite(
            draw.x as usize,
            draw.y as usize,
            &rows,
            width,
            self.quirks.wrap_sprites,
        );
        self.v[VF] = collision as u8;
    }

    /// Finish an Fx0A. If a key is down it goes into `register` and is
    /// released so the next Fx0A waits for a fresh press.
    pub fn complete_key_wait(&mut self, register: u8) -> bool {
        match self.keypad.consume_first_pressed() {
            Some(key) => {
                self.set_reg(register, key);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Frame;

    fn cpu_for(platform: Platform, program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new(&ProgramMetadata::new("test", platform), Filter::None);
        let mut prog = program;
        cpu.load_program(&mut prog).unwrap();
        cpu
    }

    fn modern(program: &[u8]) -> Cpu {
        cpu_for(Platform::ModernChip8, program)
    }

    fn lit(frame: &Frame) -> usize {
        frame.pixels.iter().filter(|p| p.on).count()
    }

    #[test]
    fn test_nibbles() {
        assert_eq!(Cpu::nibbles(0xa4c3), (0xa, 0x4, 0xc, 0x3));
    }

    #[test]
    fn test_fetch_advances_pc() {
        let mut cpu = modern(&[0x60, 0x12]);
        assert_eq!(cpu.execute_one().unwrap(), Step::Continue);
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.v[0], 0x12);
    }

    #[test]
    fn test_pc_wraps_at_top_of_memory() {
        let mut cpu = modern(&[0x1f, 0xfe]);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0xffe);
        cpu.memory.write(&[0x60, 0x01], 0xffe);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x000);
    }

    #[test]
    fn test_op_00e0() {
        let mut cpu = modern(&[0x00, 0xe0]);
        cpu.display.draw_sprite(0, 0, &[0xff00], 8, false);
        cpu.execute_one().unwrap();
        assert_eq!(lit(&cpu.display.frame()), 0);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn test_call_and_return() {
        let mut cpu = modern(&[0x2f, 0xfe]);
        cpu.memory.write(&[0x00, 0xee], 0xffe);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0xffe);
        assert_eq!(cpu.stack, [0x202]);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.stack_depth(), 0);
    }

    #[test]
    fn test_nested_calls_unwind_in_order() {
        let mut cpu = modern(&[0x23, 0x00]);
        cpu.memory.write(&[0x2f, 0xfe, 0x00, 0xee], 0x300);
        cpu.memory.write(&[0x00, 0xee], 0xffe);
        let mut pcs = Vec::new();
        for _ in 0..4 {
            cpu.execute_one().unwrap();
            pcs.push(cpu.pc);
        }
        assert_eq!(pcs, [0x300, 0xffe, 0x302, 0x202]);
    }

    #[test]
    fn test_stack_underflow_restarts() {
        let mut cpu = modern(&[0x60, 0x01, 0x00, 0xee]);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.execute_one().unwrap(), Step::StackUnderflow);
        assert_eq!(cpu.pc, PROGRAM_ADDR);
        assert_eq!(cpu.v[0], 1);
    }

    #[test]
    fn test_skips() {
        let mut cpu = modern(&[0x3a, 0xff, 0x3a, 0xff, 0, 0, 0x4a, 0xff, 0x5a, 0xb0, 0, 0, 0x9a, 0xb0]);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x202);
        cpu.v[0xa] = 0xff;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x206);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x208);
        cpu.v[0xb] = 0xff;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x20c);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x20e);
    }

    #[test]
    fn test_op_7xnn_wraps_without_flag() {
        let mut cpu = modern(&[0x78, 0x11]);
        cpu.v[8] = 0xf0;
        cpu.v[0xf] = 0xa;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[8], 0x01);
        assert_eq!(cpu.v[0xf], 0xa);
    }

    #[test]
    fn test_add_carry_for_all_values() {
        let mut cpu = modern(&[0x81, 0x24]);
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                cpu.pc = 0x200;
                cpu.v[1] = x;
                cpu.v[2] = y;
                cpu.execute_one().unwrap();
                assert_eq!(cpu.v[1], ((x as u16 + y as u16) % 256) as u8);
                assert_eq!(cpu.v[0xf], (x as u16 + y as u16 > 255) as u8);
            }
        }
    }

    #[test]
    fn test_sub_borrow_for_all_values() {
        let mut cpu = modern(&[0x81, 0x25, 0x81, 0x27]);
        for x in 0..=255u8 {
            for y in 0..=255u8 {
                cpu.pc = 0x200;
                cpu.v[1] = x;
                cpu.v[2] = y;
                cpu.execute_one().unwrap();
                assert_eq!(cpu.v[1], x.wrapping_sub(y));
                assert_eq!(cpu.v[0xf], (x >= y) as u8);

                cpu.v[1] = x;
                cpu.execute_one().unwrap();
                assert_eq!(cpu.v[1], y.wrapping_sub(x));
                assert_eq!(cpu.v[0xf], (y >= x) as u8);
            }
        }
    }

    #[test]
    fn test_flag_wins_when_vf_is_target() {
        let mut cpu = modern(&[0x8f, 0x14]);
        cpu.v[0xf] = 0xff;
        cpu.v[1] = 0x02;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[0xf], 1);
    }

    #[test]
    fn test_shift_right() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0x83, 0x06, 0x83, 0x06]);
        cpu.v[3] = 0x7d;
        cpu.execute_one().unwrap();
        assert_eq!((cpu.v[3], cpu.v[0xf]), (0x3e, 1));
        cpu.execute_one().unwrap();
        assert_eq!((cpu.v[3], cpu.v[0xf]), (0x1f, 0));
    }

    #[test]
    fn test_shift_left_sets_msb_flag() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0x83, 0x0e]);
        cpu.v[3] = 0x81;
        cpu.execute_one().unwrap();
        assert_eq!((cpu.v[3], cpu.v[0xf]), (0x02, 1));
    }

    #[test]
    fn test_shift_quirk_reads_vy() {
        let mut vip = cpu_for(Platform::OriginalChip8, &[0x81, 0x26]);
        vip.v[1] = 0xff;
        vip.v[2] = 0x04;
        vip.execute_one().unwrap();
        assert_eq!((vip.v[1], vip.v[0xf]), (0x02, 0));

        let mut schip = cpu_for(Platform::SuperChip, &[0x81, 0x26]);
        schip.v[1] = 0xff;
        schip.v[2] = 0x04;
        schip.execute_one().unwrap();
        assert_eq!((schip.v[1], schip.v[0xf]), (0x7f, 1));
    }

    #[test]
    fn test_logic_quirk() {
        let mut vip = cpu_for(Platform::OriginalChip8, &[0x81, 0x21, 0x81, 0x22, 0x81, 0x23]);
        let mut modern = modern(&[0x81, 0x21]);
        vip.v[1] = 0b1100;
        vip.v[2] = 0b1010;
        vip.v[0xf] = 7;
        vip.execute_one().unwrap();
        assert_eq!((vip.v[1], vip.v[0xf]), (0b1110, 0));
        vip.execute_one().unwrap();
        assert_eq!(vip.v[1], 0b1010);
        vip.execute_one().unwrap();
        assert_eq!(vip.v[1], 0);

        modern.v[0xf] = 7;
        modern.execute_one().unwrap();
        assert_eq!(modern.v[0xf], 7);
    }

    #[test]
    fn test_jump_quirk() {
        let mut vip = cpu_for(Platform::OriginalChip8, &[0xb3, 0x00]);
        vip.v[0] = 0x10;
        vip.v[3] = 0x20;
        vip.execute_one().unwrap();
        assert_eq!(vip.pc, 0x310);

        let mut chip48 = cpu_for(Platform::Chip48, &[0xb3, 0x00]);
        chip48.v[0] = 0x10;
        chip48.v[3] = 0x20;
        chip48.execute_one().unwrap();
        assert_eq!(chip48.pc, 0x320);
    }

    #[test]
    fn test_jump_masks_address() {
        let mut cpu = modern(&[0xbf, 0xff]);
        cpu.v[0] = 2;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x001);
    }

    #[test]
    fn test_random_respects_mask() {
        let mut cpu = modern(&[0xc4, 0x0f, 0xc5, 0x00]);
        for _ in 0..100 {
            cpu.pc = 0x200;
            cpu.execute_one().unwrap();
            assert_eq!(cpu.v[4] & 0xf0, 0);
            cpu.v[5] = 0xaa;
            cpu.execute_one().unwrap();
            assert_eq!(cpu.v[5], 0);
        }
    }

    #[test]
    fn test_draw_twice_toggles_off() {
        let mut cpu = modern(&[0xa0, 0x00, 0xd0, 0x18, 0xd0, 0x18]);
        // I points at the "0" glyph; pad it to 8 rows with the "1"
        cpu.execute_one().unwrap();
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[0xf], 0);
        let on = lit(&cpu.display.frame());
        assert!(on > 0);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[0xf], 1);
        assert_eq!(lit(&cpu.display.frame()), 0);
    }

    #[test]
    fn test_draw_clips_or_wraps() {
        let mut clip = modern(&[0xd0, 0x11]);
        clip.i = 0x300;
        clip.memory.write_byte(0x300, 0xff);
        clip.v[0] = 60;
        clip.execute_one().unwrap();
        assert_eq!(lit(&clip.display.frame()), 4);

        let quirks = Quirks {
            wrap_sprites: true,
            ..Platform::ModernChip8.quirks()
        };
        let meta = ProgramMetadata::new("wrap", Platform::ModernChip8).with_quirks(quirks);
        let mut wrap = Cpu::new(&meta, Filter::None);
        let mut prog: &[u8] = &[0xd0, 0x11];
        wrap.load_program(&mut prog).unwrap();
        wrap.i = 0x300;
        wrap.memory.write_byte(0x300, 0xff);
        wrap.v[0] = 60;
        wrap.execute_one().unwrap();
        assert_eq!(lit(&wrap.display.frame()), 8);
        assert!(wrap.display.is_on(0, 0));
    }

    #[test]
    fn test_vblank_quirk_defers_draw() {
        let mut cpu = cpu_for(Platform::OriginalChip8, &[0xd1, 0x25]);
        cpu.v[1] = 3;
        cpu.v[2] = 4;
        let step = cpu.execute_one().unwrap();
        assert_eq!(step, Step::WaitForVblank(PendingDraw { x: 3, y: 4, n: 5 }));
        assert_eq!(lit(&cpu.display.frame()), 0);
        if let Step::WaitForVblank(draw) = step {
            cpu.draw_sprite(draw);
        }
        assert!(cpu.display.is_on(3, 4));
        assert_eq!(cpu.v[0xf], 0);
    }

    #[test]
    fn test_keys() {
        let mut cpu = modern(&[0xe1, 0x9e, 0, 0, 0xe1, 0xa1, 0xe1, 0x9e]);
        cpu.v[1] = 0x7;
        cpu.keypad.key_down(0x7);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x204);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x206);
        cpu.keypad.key_up(0x7);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.pc, 0x208);
    }

    #[test]
    fn test_key_wait() {
        let mut cpu = modern(&[0xf3, 0x0a]);
        assert_eq!(cpu.execute_one().unwrap(), Step::WaitForKey(3));
        assert!(!cpu.complete_key_wait(3));
        cpu.keypad.key_down(0xb);
        assert!(cpu.complete_key_wait(3));
        assert_eq!(cpu.v[3], 0xb);
        assert!(!cpu.keypad.is_down(0xb));
    }

    #[test]
    fn test_timer_ops() {
        let mut cpu = modern(&[0xf1, 0x15, 0xf2, 0x18, 0xf3, 0x07, 0xf4, 0x18]);
        cpu.v[1] = 30;
        cpu.v[2] = 5;
        cpu.execute_one().unwrap();
        cpu.execute_one().unwrap();
        assert_eq!(cpu.take_tone_event(), Some(ToneEvent::Start));
        assert_eq!(cpu.take_tone_event(), None);
        cpu.timers.decrement();
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[3], 29);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.take_tone_event(), Some(ToneEvent::Stop));
    }

    #[test]
    fn test_index_add_leaves_vf() {
        let mut cpu = modern(&[0xf1, 0x1e]);
        cpu.i = 0xffe;
        cpu.v[1] = 0x04;
        cpu.v[0xf] = 0x55;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.i, 0x002);
        assert_eq!(cpu.v[0xf], 0x55);
    }

    #[test]
    fn test_index_add_overflow_flag_switch() {
        let quirks = Quirks {
            index_overflow_flag: true,
            ..Platform::ModernChip8.quirks()
        };
        let meta = ProgramMetadata::new("spacefight", Platform::ModernChip8).with_quirks(quirks);
        let mut cpu = Cpu::new(&meta, Filter::None);
        let mut prog: &[u8] = &[0xf1, 0x1e, 0xf1, 0x1e];
        cpu.load_program(&mut prog).unwrap();
        cpu.i = 0xffe;
        cpu.v[1] = 0x04;
        cpu.execute_one().unwrap();
        assert_eq!((cpu.i, cpu.v[0xf]), (0x002, 1));
        cpu.execute_one().unwrap();
        assert_eq!((cpu.i, cpu.v[0xf]), (0x006, 0));
    }

    #[test]
    fn test_font_addresses() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0xf1, 0x29, 0xf1, 0x30]);
        cpu.v[1] = 0x1a;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.i, 0xa * 5);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.i, BIG_FONT_ADDR + 0xa * 10);
    }

    #[test]
    fn test_bcd() {
        let mut cpu = modern(&[0xf1, 0x33]);
        cpu.i = 0x300;
        cpu.v[1] = 255;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.memory.get_ro_slice(0x300, 3), &[2, 5, 5]);
        assert_eq!(cpu.i, 0x300);
    }

    #[test]
    fn test_store_load_round_trip() {
        for x in 0..16u8 {
            let mut cpu = cpu_for(Platform::SuperChip, &[0xf0 | x, 0x55, 0xf0 | x, 0x65]);
            cpu.i = 0x400;
            let original: Vec<u8> = (0..16).map(|r| r * 7 + 3).collect();
            cpu.v.copy_from_slice(&original);
            cpu.execute_one().unwrap();
            cpu.v = [0; REG_COUNT];
            cpu.execute_one().unwrap();
            for r in 0..16usize {
                let expected = if r <= x as usize { original[r] } else { 0 };
                assert_eq!(cpu.v[r], expected, "x={} r={}", x, r);
            }
        }
    }

    #[test]
    fn test_memory_indexing_quirks() {
        for (platform, expected) in [
            (Platform::OriginalChip8, 0x304),
            (Platform::Chip48, 0x303),
            (Platform::SuperChip, 0x300),
        ] {
            let mut cpu = cpu_for(platform, &[0xf3, 0x55]);
            cpu.i = 0x300;
            cpu.execute_one().unwrap();
            assert_eq!(cpu.i, expected, "{}", platform);
        }
    }

    #[test]
    fn test_unknown_opcode_halts() {
        let mut cpu = modern(&[0x60, 0x01, 0x50, 0x01]);
        cpu.execute_one().unwrap();
        match cpu.execute_one() {
            Err(Chip8Error::UnknownOpcode { addr, opcode }) => {
                assert_eq!(addr, 0x202);
                assert_eq!(opcode, 0x5001);
            }
            _ => panic!("expected unknown opcode"),
        }
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn test_superchip_opcodes_gated() {
        for word in [[0x00, 0xff], [0x00, 0xc2], [0xf0, 0x30], [0x02, 0x30]] {
            let mut cpu = modern(&word);
            assert!(cpu.execute_one().is_err());
        }
    }

    #[test]
    fn test_hires_and_big_sprite() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0x00, 0xff, 0xd0, 0x10, 0x00, 0xfe]);
        cpu.i = 0x300;
        cpu.memory.write(&[0xff; 32], 0x300);
        cpu.v[0] = 120;
        cpu.execute_one().unwrap();
        assert_eq!(cpu.display.resolution(), Resolution::High);
        cpu.execute_one().unwrap();
        // clipped to 8 columns by 16 rows
        assert_eq!(lit(&cpu.display.frame()), 128);
        assert_eq!(cpu.v[0xf], 0);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.display.resolution(), Resolution::Low);
    }

    #[test]
    fn test_low_res_n0_draws_nothing() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0xd0, 0x10]);
        cpu.execute_one().unwrap();
        assert_eq!(lit(&cpu.display.frame()), 0);
    }

    #[test]
    fn test_scroll_ops() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0x00, 0xff, 0x00, 0xc3, 0x00, 0xfb, 0x00, 0xfc, 0x00, 0xfc]);
        cpu.execute_one().unwrap();
        cpu.display.draw_sprite(10, 10, &[0x8000], 8, false);
        cpu.execute_one().unwrap();
        assert!(cpu.display.is_on(10, 13));
        assert!(!cpu.display.is_on(10, 10));
        cpu.execute_one().unwrap();
        assert!(cpu.display.is_on(14, 13));
        cpu.execute_one().unwrap();
        cpu.execute_one().unwrap();
        assert!(cpu.display.is_on(6, 13));
    }

    #[test]
    fn test_exit() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0x00, 0xfd]);
        assert_eq!(cpu.execute_one().unwrap(), Step::Exit);
    }

    #[test]
    fn test_rpl_flags() {
        let mut cpu = cpu_for(Platform::SuperChip, &[0xf2, 0x75, 0xf2, 0x85]);
        cpu.v[..3].copy_from_slice(&[9, 8, 7]);
        cpu.execute_one().unwrap();
        cpu.v = [0; REG_COUNT];
        cpu.execute_one().unwrap();
        assert_eq!(cpu.v[..4], [9, 8, 7, 0]);
    }

    #[test]
    fn test_vip_hires_boot() {
        let mut program = vec![0u8; 0xc2];
        program[0] = 0x12;
        program[1] = 0x60;
        program[0xc0] = 0x02;
        program[0xc1] = 0x30;
        let mut cpu = cpu_for(Platform::HybridVip, &program);
        assert_eq!(cpu.pc, 0x2c0);
        assert_eq!(cpu.display.resolution(), Resolution::VipHigh);
        cpu.display.set_resolution(Resolution::Low);
        cpu.execute_one().unwrap();
        assert_eq!(cpu.display.resolution(), Resolution::VipHigh);
        assert_eq!(cpu.display.frame().height, 64);
    }

    #[test]
    fn test_plain_program_on_hybrid_vip() {
        let cpu = cpu_for(Platform::HybridVip, &[0x12, 0x00]);
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.display.resolution(), Resolution::Low);
    }
}
