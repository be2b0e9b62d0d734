//! # interpreter
//!
//! The environment: owns the machine, wires it to a renderer, an input device
//! and a sound device, and runs the main loop.
//!
//! Main loop
//!  |-- poll input into the keypad (Esc quits)
//!  |-- scheduler.tick(time since last pass)
//!  |    `-- N instructions, then timers/vblank/snapshot at each 1/60s edge
//!  |-- hand tone edges to the sound device, the latest frame to the renderer
//!  `-- sleep out the rest of the frame
//!
//! Loading a program always builds a brand new machine, so nothing leaks from
//! one program into the next.
use crate::cpu::Cpu;
use crate::display::Filter;
use crate::error::Chip8Error;
use crate::input::{Control, Input};
use crate::quirks::ProgramMetadata;
use crate::render::Renderer;
use crate::scheduler::{Scheduler, FRAME_DURATION};
use crate::sound::Sound;
use crate::timer::ToneEvent;
use log::{error, info, warn};
use std::io;
use std::time::{Duration, Instant};

struct Machine {
    cpu: Cpu,
    scheduler: Scheduler,
    /// empty-stack returns since the program was loaded
    underflows: u32,
}

pub struct Chip8Interpreter<'a> {
    renderer: &'a mut dyn Renderer,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    filter: Filter,
    machine: Option<Machine>,
    /// last image that loaded cleanly, for reset()
    program: Option<(Vec<u8>, ProgramMetadata)>,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        renderer: &'a mut dyn Renderer,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        filter: Filter,
    ) -> Chip8Interpreter<'a> {
        Chip8Interpreter {
            renderer,
            input,
            sound,
            filter,
            machine: None,
            program: None,
        }
    }

    /// Load a chip8 program, replacing whatever was there before. On failure
    /// the interpreter is left unloaded.
    pub fn load_program(
        &mut self,
        reader: &mut impl io::Read,
        metadata: ProgramMetadata,
    ) -> Result<usize, Chip8Error> {
        self.unload();
        let mut image = Vec::new();
        reader.read_to_end(&mut image)?;
        let len = self.boot(&image, &metadata)?;
        info!(
            "loaded '{}' ({} bytes) for {} at {} ips",
            metadata.title, len, metadata.platform, metadata.ips
        );
        self.program = Some((image, metadata));
        Ok(len)
    }

    /// start the last good program again from scratch
    pub fn reset(&mut self) -> Result<(), Chip8Error> {
        let (image, metadata) = self.program.take().ok_or(Chip8Error::NotLoaded)?;
        self.unload();
        self.boot(&image, &metadata)?;
        info!("reset '{}'", metadata.title);
        self.program = Some((image, metadata));
        Ok(())
    }

    fn boot(&mut self, image: &[u8], metadata: &ProgramMetadata) -> Result<usize, Chip8Error> {
        let mut cpu = Cpu::new(metadata, self.filter);
        let len = cpu.load_program(&mut &image[..])?;
        self.machine = Some(Machine {
            cpu,
            scheduler: Scheduler::new(metadata.ips),
            underflows: 0,
        });
        Ok(len)
    }

    fn unload(&mut self) {
        if let Some(m) = self.machine.take() {
            if m.cpu.timers().is_sounding() {
                self.play(ToneEvent::Stop);
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.machine.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.machine.as_ref().map_or(false, |m| m.scheduler.is_running())
    }

    /// halt at the next tick; the program stays loaded
    pub fn stop(&mut self) {
        let mut sounding = false;
        if let Some(m) = self.machine.as_mut() {
            m.scheduler.stop();
            sounding = m.cpu.timers().is_sounding();
        }
        if sounding {
            self.play(ToneEvent::Stop);
        }
    }

    pub fn underflows(&self) -> u32 {
        self.machine.as_ref().map_or(0, |m| m.underflows)
    }

    pub fn cpu(&self) -> Option<&Cpu> {
        self.machine.as_ref().map(|m| &m.cpu)
    }

    fn play(&mut self, tone: ToneEvent) {
        if let Err(e) = self.sound.tone(tone) {
            warn!("sound device failed on {:?}: {}", tone, e);
        }
    }

    /// One pass of the main loop, covering `elapsed` of emulated time.
    pub fn tick(&mut self, elapsed: Duration) -> Result<Control, Chip8Error> {
        let machine = self.machine.as_mut().ok_or(Chip8Error::NotLoaded)?;
        if self.input.poll(machine.cpu.keypad_mut())? == Control::Quit {
            info!("quit requested");
            self.stop();
            return Ok(Control::Quit);
        }
        let report = match machine.scheduler.tick(&mut machine.cpu, elapsed) {
            Ok(report) => report,
            Err(e) => {
                error!("halted: {}", e);
                self.stop();
                return Err(e);
            }
        };
        machine.underflows += report.underflows;
        for tone in report.tones {
            self.play(tone);
        }
        if let Some(frame) = report.frame {
            self.renderer.draw(&frame)?;
        }
        Ok(Control::Continue)
    }

    /// run at most `max_frames` frames (forever if None), in real time
    pub fn main_loop(&mut self, max_frames: Option<u64>) -> Result<(), Chip8Error> {
        if !self.is_loaded() {
            return Err(Chip8Error::NotLoaded);
        }
        let mut frames = 0;
        let mut last = Instant::now();
        while self.is_running() && max_frames.map_or(true, |max| frames < max) {
            let now = Instant::now();
            if self.tick(now - last)? == Control::Quit {
                break;
            }
            last = now;
            frames += 1;
            let spent = last.elapsed();
            if spent < FRAME_DURATION {
                spin_sleep::sleep(FRAME_DURATION - spent);
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Chip8Error> {
        self.main_loop(None)
    }
}
