use std::sync::Arc;

use crate::{
    config::TimingConfiguration,
    event::{DisplayMode, MediaSignal, PlayerEvent, TransportCommand},
};

use super::{
    clock::PlaybackClock,
    gap::{GapDetector, GapWindow},
    lyric_index::{LyricCursor, LyricSheet},
    render::reveal_fraction,
    sync::{DriftCorrection, TrackSynchronizer},
};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub current_time_seconds: f64,
    pub is_playing: bool,
    pub vocal_volume_fraction: f64,
}

/// Everything the view needs to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    pub sheet: Arc<LyricSheet>,
    pub playback: PlaybackState,
    pub active: Option<usize>,
    pub reveal_fraction: Option<f64>,
    pub gap: GapWindow,
    pub duration: Option<f64>,
    pub display_mode: DisplayMode,
}

impl PlayerView {
    /// Elapsed share of the song for the progress bar, 0 while the length is unknown.
    pub fn progress_ratio(&self) -> f64 {
        match self.duration {
            Some(duration) if duration > 0.0 => {
                (self.playback.current_time_seconds / duration).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// One player page: the lyric sheet, the track pair and the clock driven by the
/// instrumental track.
pub struct KaraokeSession {
    sheet: Arc<LyricSheet>,
    sync: TrackSynchronizer,
    clock: PlaybackClock,
    cursor: LyricCursor,
    gap: GapDetector,
    active: Option<usize>,
    vocal_volume_percent: u8,
    display_mode: DisplayMode,
}

impl KaraokeSession {
    pub fn new(
        sheet: LyricSheet,
        sync: TrackSynchronizer,
        timing: &TimingConfiguration,
        initial_vocal_volume_percent: u8,
    ) -> Self {
        let sheet = sheet.with_last_line_seconds(timing.last_line_seconds);
        let mut session = Self {
            sheet: Arc::new(sheet),
            sync: sync.with_drift_tolerance(timing.drift_tolerance_seconds),
            clock: PlaybackClock::new(),
            cursor: LyricCursor::default(),
            gap: GapDetector {
                line_seconds: timing.last_line_seconds,
                threshold_seconds: timing.gap_threshold_seconds,
            },
            active: None,
            vocal_volume_percent: 0,
            display_mode: DisplayMode::default(),
        };
        session.set_vocal_volume(initial_vocal_volume_percent);
        session
    }

    pub fn handle(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Media(signal) => self.on_media_signal(signal),
            PlayerEvent::Command(command) => self.on_command(command),
            PlayerEvent::DisplayModeChanged(mode) => self.display_mode = mode,
            PlayerEvent::Tick => self.sync.poll(),
        }
    }

    fn on_media_signal(&mut self, signal: MediaSignal) {
        self.clock.on_signal(signal);
        match signal {
            MediaSignal::TimeUpdate(time) => {
                match self.sync.on_instrumental_time_update(time) {
                    DriftCorrection::Corrected { drift } => {
                        tracing::trace!("Vocal realigned by {drift:+.3}s")
                    }
                    DriftCorrection::Skipped { drift } => {
                        tracing::trace!("Vocal still {drift:+.3}s off, retrying next update")
                    }
                    DriftCorrection::Aligned | DriftCorrection::Unavailable => {}
                }
                self.active = self.cursor.resolve(time, self.sheet.entries());
            }
            MediaSignal::Ended => {
                tracing::info!("Instrumental track ended");
                self.sync.pause();
            }
            MediaSignal::Play | MediaSignal::Pause => {}
        }
    }

    fn on_command(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Play => self.play(),
            TransportCommand::Pause => self.sync.pause(),
            TransportCommand::TogglePlayback => {
                if self.clock.is_playing() {
                    self.sync.pause();
                } else {
                    self.play();
                }
            }
            TransportCommand::Seek { seconds } => self.seek(seconds),
            TransportCommand::SeekBy { delta_seconds } => {
                self.seek(self.clock.current_time() + delta_seconds)
            }
            TransportCommand::SeekToLine { index } => {
                if let Some(start) = self.sheet.get(index).map(|it| it.start_seconds) {
                    self.seek(start);
                }
            }
            TransportCommand::SetVocalVolume { percent } => self.set_vocal_volume(percent),
            TransportCommand::AdjustVocalVolume { delta_percent } => {
                let percent = (self.vocal_volume_percent as i16 + delta_percent).clamp(0, 100);
                self.set_vocal_volume(percent as u8);
            }
        }
    }

    fn play(&mut self) {
        if let Err(e) = self.sync.play() {
            tracing::warn!("{e}");
        }
    }

    fn seek(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let upper = self.sync.duration().unwrap_or(f64::INFINITY);
        self.sync.seek(seconds.clamp(0.0, upper));
    }

    fn set_vocal_volume(&mut self, percent: u8) {
        self.vocal_volume_percent = percent.min(100);
        self.sync
            .set_vocal_volume(self.vocal_volume_percent as f64 / 100.0);
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_time_seconds: self.clock.current_time(),
            is_playing: self.clock.is_playing(),
            vocal_volume_fraction: self.vocal_volume_percent as f64 / 100.0,
        }
    }

    pub fn view(&self) -> PlayerView {
        let time = self.clock.current_time();
        let fraction = self.active.and_then(|idx| {
            let entry = self.sheet.get(idx)?;
            let end = self.sheet.effective_end(idx)?;
            Some(reveal_fraction(entry.start_seconds, end, time))
        });
        PlayerView {
            sheet: self.sheet.clone(),
            playback: self.playback_state(),
            active: self.active,
            reveal_fraction: fraction,
            gap: self.gap.detect(time, self.sheet.entries()),
            duration: self.sync.duration(),
            display_mode: self.display_mode,
        }
    }

    /// Stops both tracks when the player view goes away.
    pub fn shutdown(&mut self) {
        self.sync.pause();
    }
}
