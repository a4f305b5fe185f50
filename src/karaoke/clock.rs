use crate::event::MediaSignal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockState {
    #[default]
    Paused,
    Playing,
}

/// The player's notion of "now", fed exclusively by the instrumental track.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackClock {
    state: ClockState,
    current_time: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_signal(&mut self, signal: MediaSignal) {
        match signal {
            // Updated in every state so that seeks while paused move the clock.
            MediaSignal::TimeUpdate(time) => self.current_time = time,
            MediaSignal::Play => self.state = ClockState::Playing,
            MediaSignal::Pause | MediaSignal::Ended => self.state = ClockState::Paused,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused_at_zero() {
        let clock = PlaybackClock::new();
        assert!(!clock.is_playing());
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn follows_play_pause_and_end() {
        let mut clock = PlaybackClock::new();
        clock.on_signal(MediaSignal::Play);
        assert!(clock.is_playing());
        clock.on_signal(MediaSignal::Pause);
        assert!(!clock.is_playing());
        clock.on_signal(MediaSignal::Play);
        clock.on_signal(MediaSignal::Ended);
        assert!(!clock.is_playing());
    }

    #[test]
    fn time_updates_apply_while_paused() {
        let mut clock = PlaybackClock::new();
        clock.on_signal(MediaSignal::TimeUpdate(61.5));
        assert_eq!(clock.current_time(), 61.5);
        assert!(!clock.is_playing());
    }
}
