use std::fmt;

use thiserror::Error;

/// Default tolerated distance between the vocal and instrumental positions.
pub const DEFAULT_DRIFT_TOLERANCE_SECONDS: f64 = 0.1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackError {
    #[error("track rejected the request: {0}")]
    Rejected(String),
}

/// A playable media resource on the shared song timeline.
///
/// Requests are fire-and-forget: nothing here waits for the track to actually
/// start or finish seeking.
pub trait MediaTrack: Send {
    fn play(&mut self) -> Result<(), TrackError>;
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64) -> Result<(), TrackError>;
    fn set_volume(&mut self, fraction: f64);
    /// Length of the media, if known.
    fn duration(&self) -> Option<f64>;
    /// Gives the track a chance to emit its periodic signals.
    fn poll(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRole {
    Instrumental,
    Vocal,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRole::Instrumental => write!(f, "instrumental"),
            TrackRole::Vocal => write!(f, "vocal"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{} track(s) failed to start: {}", .failures.len(), describe(.failures))]
pub struct PlayError {
    pub failures: Vec<(TrackRole, TrackError)>,
}

fn describe(failures: &[(TrackRole, TrackError)]) -> String {
    failures
        .iter()
        .map(|(role, err)| format!("{role}: {err}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of one drift check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftCorrection {
    /// A track is missing; nothing was compared.
    Unavailable,
    Aligned,
    Corrected { drift: f64 },
    /// The vocal track refused the seek; the next update tries again.
    Skipped { drift: f64 },
}

/// Owns the instrumental/vocal pair and keeps the vocal track following the
/// instrumental one, which is never moved to match the vocal.
pub struct TrackSynchronizer {
    instrumental: Option<Box<dyn MediaTrack>>,
    vocal: Option<Box<dyn MediaTrack>>,
    drift_tolerance: f64,
}

impl TrackSynchronizer {
    pub fn new(
        instrumental: Option<Box<dyn MediaTrack>>,
        vocal: Option<Box<dyn MediaTrack>>,
    ) -> Self {
        let mut sync = Self {
            instrumental,
            vocal,
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE_SECONDS,
        };
        if let Some(instrumental) = sync.instrumental.as_mut() {
            instrumental.set_volume(1.0);
        }
        sync
    }

    pub fn with_drift_tolerance(mut self, seconds: f64) -> Self {
        self.drift_tolerance = seconds;
        self
    }

    /// Both tracks, or `None` while either one is missing. Transport only ever
    /// moves the pair together.
    fn pair_mut(&mut self) -> Option<[(TrackRole, &mut Box<dyn MediaTrack>); 2]> {
        match (self.instrumental.as_mut(), self.vocal.as_mut()) {
            (Some(instrumental), Some(vocal)) => Some([
                (TrackRole::Instrumental, instrumental),
                (TrackRole::Vocal, vocal),
            ]),
            _ => None,
        }
    }

    /// Starts both tracks. A track that fails to start does not keep the other
    /// one from starting; every failure is collected into the error.
    pub fn play(&mut self) -> Result<(), PlayError> {
        let Some(tracks) = self.pair_mut() else {
            tracing::debug!("Play ignored, a track is missing");
            return Ok(());
        };
        let failures = tracks
            .into_iter()
            .filter_map(|(role, track)| track.play().err().map(|err| (role, err)))
            .collect::<Vec<_>>();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PlayError { failures })
        }
    }

    pub fn pause(&mut self) {
        for (_, track) in self.pair_mut().into_iter().flatten() {
            track.pause();
        }
    }

    /// Moves both tracks to `time`. Both assignments are issued before returning.
    pub fn seek(&mut self, time: f64) {
        for (role, track) in self.pair_mut().into_iter().flatten() {
            if let Err(err) = track.set_current_time(time) {
                tracing::warn!("Seek of {role} track to {time:.2}s rejected: {err}");
            }
        }
    }

    /// Called for every time update of the instrumental track with the position
    /// that update reported.
    pub fn on_instrumental_time_update(&mut self, time: f64) -> DriftCorrection {
        let (Some(_), Some(vocal)) = (self.instrumental.as_ref(), self.vocal.as_mut()) else {
            return DriftCorrection::Unavailable;
        };
        let drift = vocal.current_time() - time;
        if drift.abs() <= self.drift_tolerance {
            return DriftCorrection::Aligned;
        }
        if let Err(err) = vocal.set_current_time(time) {
            tracing::debug!("Skipped vocal drift correction ({drift:+.3}s): {err}");
            return DriftCorrection::Skipped { drift };
        }
        // a track may clamp the target, e.g. a vocal shorter than the instrumental
        let residual = vocal.current_time() - time;
        if residual.abs() > self.drift_tolerance {
            tracing::debug!("Vocal could not reach {time:.2}s, still {residual:+.3}s off");
            return DriftCorrection::Skipped { drift: residual };
        }
        tracing::debug!("Corrected vocal drift of {drift:+.3}s at {time:.2}s");
        DriftCorrection::Corrected { drift }
    }

    pub fn set_vocal_volume(&mut self, fraction: f64) {
        if let Some(vocal) = self.vocal.as_mut() {
            vocal.set_volume(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.instrumental.as_ref().and_then(|it| it.duration())
    }

    /// Lets the instrumental track emit its periodic signals.
    pub fn poll(&mut self) {
        if let Some(instrumental) = self.instrumental.as_mut() {
            instrumental.poll();
        }
    }
}
