//! # scheduler
//!
//! Couples the CPU to wall-clock time. The caller reports how much time has
//! gone by; we run however many instructions that is worth at the program's
//! rate, and at every 1/60s boundary decrement the timers, flush a held-back
//! sprite draw and snapshot the display.
//!
//! Instruction counts come from the total elapsed time rather than from each
//! slice, so rounding never drifts.
use crate::cpu::{Cpu, PendingDraw, Step};
use crate::display::Frame;
use crate::error::Chip8Error;
use crate::timer::ToneEvent;
use log::{debug, info};
use std::time::Duration;

pub const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Fx0A is waiting to put a key in this register
    WaitingForKey(u8),
    /// a draw is held until the next refresh
    WaitingForVblank(PendingDraw),
    /// stopped by 00FD, a fatal opcode or the front-end
    Halted,
}

/// what happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub instructions: u64,
    pub frames: u32,
    pub tones: Vec<ToneEvent>,
    /// returns taken with an empty stack; each one restarted at 0x200
    pub underflows: u32,
    /// the latest refresh, if one happened
    pub frame: Option<Frame>,
}

pub struct Scheduler {
    ips: u32,
    state: RunState,
    clock: Duration,
    since_refresh: Duration,
    executed: u128,
}

impl Scheduler {
    pub fn new(ips: u32) -> Self {
        Scheduler {
            ips: ips.max(1),
            state: RunState::Running,
            clock: Duration::ZERO,
            since_refresh: Duration::ZERO,
            executed: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ips(&self) -> u32 {
        self.ips
    }

    pub fn is_running(&self) -> bool {
        self.state != RunState::Halted
    }

    pub fn stop(&mut self) {
        self.set_state(RunState::Halted);
    }

    fn set_state(&mut self, state: RunState) {
        if self.state != state {
            debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Advance by `elapsed`. An unknown opcode halts the scheduler and is
    /// returned; everything else is reported in the `TickReport`.
    pub fn tick(&mut self, cpu: &mut Cpu, elapsed: Duration) -> Result<TickReport, Chip8Error> {
        let mut report = TickReport::default();
        let mut remaining = elapsed;
        while self.is_running() && !remaining.is_zero() {
            let slice = remaining.min(FRAME_DURATION - self.since_refresh);
            remaining -= slice;
            self.clock += slice;
            self.since_refresh += slice;

            let due = self.instructions_due();
            self.run(cpu, due, &mut report)?;

            if self.since_refresh >= FRAME_DURATION {
                self.since_refresh = Duration::ZERO;
                self.refresh(cpu, &mut report);
            }
        }
        Ok(report)
    }

    /// instruction slots that have come up since the last call
    fn instructions_due(&mut self) -> u128 {
        let target = (self.clock.as_nanos() * self.ips as u128 + NANOS_PER_SEC / 2) / NANOS_PER_SEC;
        let due = target.saturating_sub(self.executed);
        self.executed = target;
        due
    }

    fn run(&mut self, cpu: &mut Cpu, slots: u128, report: &mut TickReport) -> Result<(), Chip8Error> {
        for _ in 0..slots {
            match self.state {
                RunState::Halted | RunState::WaitingForVblank(_) => return Ok(()),
                RunState::WaitingForKey(register) => {
                    if !cpu.complete_key_wait(register) {
                        return Ok(());
                    }
                    debug!("key {:x} into V{:X}", cpu.reg(register), register);
                    self.set_state(RunState::Running);
                }
                RunState::Running => {
                    let step = match cpu.execute_one() {
                        Ok(step) => step,
                        Err(e) => {
                            self.stop();
                            return Err(e);
                        }
                    };
                    report.instructions += 1;
                    if let Some(tone) = cpu.take_tone_event() {
                        report.tones.push(tone);
                    }
                    match step {
                        Step::Continue => (),
                        Step::StackUnderflow => report.underflows += 1,
                        Step::WaitForKey(register) => self.set_state(RunState::WaitingForKey(register)),
                        Step::WaitForVblank(draw) => self.set_state(RunState::WaitingForVblank(draw)),
                        Step::Exit => {
                            info!("program exited");
                            if let Some(tone) = cpu.timers_mut().set_sound(0) {
                                report.tones.push(tone);
                            }
                            self.stop();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// one 1/60s boundary
    fn refresh(&mut self, cpu: &mut Cpu, report: &mut TickReport) {
        if let Some(tone) = cpu.timers_mut().decrement() {
            report.tones.push(tone);
        }
        if let RunState::WaitingForVblank(draw) = self.state {
            cpu.draw_sprite(draw);
            self.set_state(RunState::Running);
        }
        report.frame = Some(cpu.display().frame());
        cpu.display_mut().age();
        report.frames += 1;
    }
}
