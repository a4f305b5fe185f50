use std::time::Instant;

use crate::event::MediaSignal;

use super::sync::{MediaTrack, TrackError};

/// A track that advances with the wall clock instead of decoded audio.
///
/// Positions follow the same rules a browser media element does: seeks are
/// clamped to the media length, playback stops at the end, and calling `play`
/// on an ended track starts over from the beginning.
#[derive(Debug)]
pub struct TimelineTrack {
    duration: Option<f64>,
    base_position: f64,
    started_at: Option<Instant>,
    signals: Option<flume::Sender<MediaSignal>>,
}

impl TimelineTrack {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration: duration.filter(|it| it.is_finite() && *it > 0.0),
            base_position: 0.0,
            started_at: None,
            signals: None,
        }
    }

    /// Makes the track report time updates and play state changes on `signals`.
    pub fn with_signals(mut self, signals: flume::Sender<MediaSignal>) -> Self {
        self.signals = Some(signals);
        self
    }

    fn emit(&self, signal: MediaSignal) {
        if let Some(signals) = &self.signals {
            // the session is gone, nobody is listening anymore
            let _ = signals.send(signal);
        }
    }

    fn clamp(&self, position: f64) -> f64 {
        let position = position.max(0.0);
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn has_ended(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.current_time() >= duration)
    }
}

impl MediaTrack for TimelineTrack {
    fn play(&mut self) -> Result<(), TrackError> {
        if self.started_at.is_some() {
            return Ok(());
        }
        if self.has_ended() {
            self.base_position = 0.0;
        }
        self.started_at = Some(Instant::now());
        self.emit(MediaSignal::Play);
        Ok(())
    }

    fn pause(&mut self) {
        if self.started_at.is_none() {
            return;
        }
        self.base_position = self.current_time();
        self.started_at = None;
        self.emit(MediaSignal::Pause);
    }

    fn current_time(&self) -> f64 {
        let elapsed = self
            .started_at
            .map_or(0.0, |started| started.elapsed().as_secs_f64());
        self.clamp(self.base_position + elapsed)
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<(), TrackError> {
        if !seconds.is_finite() {
            return Err(TrackError::Rejected(format!("invalid position {seconds}")));
        }
        self.base_position = self.clamp(seconds);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        self.emit(MediaSignal::TimeUpdate(self.base_position));
        Ok(())
    }

    fn set_volume(&mut self, fraction: f64) {
        // no audio output to attenuate
        tracing::trace!("Timeline track volume set to {fraction:.2}");
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn poll(&mut self) {
        if self.started_at.is_none() {
            return;
        }
        if self.has_ended() {
            self.base_position = self.clamp(self.current_time());
            self.started_at = None;
            self.emit(MediaSignal::TimeUpdate(self.base_position));
            self.emit(MediaSignal::Pause);
            self.emit(MediaSignal::Ended);
        } else {
            self.emit(MediaSignal::TimeUpdate(self.current_time()));
        }
    }
}
