use log::debug;

/// Start/stop edges for whoever makes the noise
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToneEvent {
    Start,
    Stop,
}

/// The delay and sound timers. Both count down at 60Hz no matter how fast
/// the CPU runs.
#[derive(Debug, Default)]
pub struct Timers {
    delay: u8,
    sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Timers::default()
    }

    pub fn delay(&self) -> u8 {
        self.delay
    }

    pub fn sound(&self) -> u8 {
        self.sound
    }

    pub fn is_sounding(&self) -> bool {
        self.sound > 0
    }

    pub fn set_delay(&mut self, value: u8) {
        self.delay = value;
    }

    /// Fx18. Reports a tone edge when the timer crosses zero either way.
    pub fn set_sound(&mut self, value: u8) -> Option<ToneEvent> {
        let was = self.sound;
        self.sound = value;
        let event = match (was, value) {
            (0, v) if v > 0 => Some(ToneEvent::Start),
            (w, 0) if w > 0 => Some(ToneEvent::Stop),
            _ => None,
        };
        if let Some(e) = event {
            debug!("tone {:?}", e);
        }
        event
    }

    /// one 60Hz tick
    pub fn decrement(&mut self) -> Option<ToneEvent> {
        self.delay = self.delay.saturating_sub(1);
        if self.sound == 0 {
            return None;
        }
        self.sound -= 1;
        if self.sound == 0 {
            debug!("tone {:?}", ToneEvent::Stop);
            Some(ToneEvent::Stop)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_stop_at_zero() {
        let mut t = Timers::new();
        assert_eq!(t.decrement(), None);
        assert_eq!(t.delay(), 0);
        assert_eq!(t.sound(), 0);
    }

    #[test]
    fn test_delay_counts_down() {
        let mut t = Timers::new();
        t.set_delay(3);
        for expected in [2, 1, 0, 0] {
            t.decrement();
            assert_eq!(t.delay(), expected);
        }
    }

    #[test]
    fn test_tone_edges() {
        let mut t = Timers::new();
        assert_eq!(t.set_sound(2), Some(ToneEvent::Start));
        assert!(t.is_sounding());
        // already sounding: no new voice
        assert_eq!(t.set_sound(5), None);
        assert_eq!(t.decrement(), None);
        assert_eq!(t.set_sound(1), None);
        assert_eq!(t.decrement(), Some(ToneEvent::Stop));
        assert!(!t.is_sounding());
        assert_eq!(t.decrement(), None);
    }

    #[test]
    fn test_setting_zero_stops_tone() {
        let mut t = Timers::new();
        t.set_sound(10);
        assert_eq!(t.set_sound(0), Some(ToneEvent::Stop));
        assert_eq!(t.set_sound(0), None);
    }
}
