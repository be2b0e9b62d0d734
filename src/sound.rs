use crate::timer::ToneEvent;
use beep::beep;
use log::debug;
use std::error::Error;

/// Whatever turns tone edges into noise. Only ever called from the thread
/// that drives the interpreter.
pub trait Sound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;

    fn tone(&mut self, event: ToneEvent) -> Result<(), Box<dyn Error>> {
        match event {
            ToneEvent::Start => self.beep(),
            ToneEvent::Stop => self.stop(),
        }
    }
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// PC speaker, via the beep crate (Linux, needs access to the console)
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        if !self.is_beeping {
            beep(SIMPLEBEEP_PITCH)?;
            self.is_beeping = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_beeping {
            beep(0)?;
            self.is_beeping = false;
        }
        Ok(())
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        if self.is_beeping {
            let _ = beep(0);
        }
    }
}

#[derive(Default)]
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("(beep)");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// keeps every tone edge; useful for testing
#[derive(Default)]
pub struct RecordingSound {
    pub events: Vec<ToneEvent>,
}

impl Sound for RecordingSound {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        self.events.push(ToneEvent::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.events.push(ToneEvent::Stop);
        Ok(())
    }
}
