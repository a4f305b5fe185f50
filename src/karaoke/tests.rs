use std::time::Duration;

use super::{
    gap::GapDetector,
    handler::run_event_loop,
    lyric_index::{resolve_active, LyricSheet},
    render::reveal_fraction,
    session::KaraokeSession,
    sync::{tests::FakeTrack, DriftCorrection, TrackSynchronizer},
    timeline_track::TimelineTrack,
    LyricEntry,
};
use crate::{
    config::TimingConfiguration,
    event::{DisplayMode, MediaSignal, PlayerEvent, TransportCommand},
};

fn two_lines() -> Vec<LyricEntry> {
    vec![LyricEntry::new(10.0, "a"), LyricEntry::new(20.0, "b")]
}

fn session_with(entries: Vec<LyricEntry>) -> (FakeTrack, FakeTrack, KaraokeSession) {
    let instrumental = FakeTrack::default();
    let vocal = FakeTrack::default();
    let sync = TrackSynchronizer::new(instrumental.boxed(), vocal.boxed());
    let session = KaraokeSession::new(
        LyricSheet::new(entries),
        sync,
        &TimingConfiguration::default(),
        0,
    );
    (instrumental, vocal, session)
}

fn time_update(session: &mut KaraokeSession, time: f64) {
    session.handle(PlayerEvent::Media(MediaSignal::TimeUpdate(time)));
}

#[test]
fn half_second_into_the_first_line() {
    let entries = two_lines();
    assert_eq!(resolve_active(10.5, &entries), Some(0));
    let fraction = reveal_fraction(10.0, 20.0, 10.5);
    assert!((fraction - 0.05).abs() < 1e-12);

    let (_, _, mut session) = session_with(entries);
    time_update(&mut session, 10.5);
    let view = session.view();
    assert_eq!(view.active, Some(0));
    assert!((view.reveal_fraction.unwrap() - 0.05).abs() < 1e-12);
    assert!(!view.gap.active);
}

#[test]
fn countdown_after_the_first_line_finishes() {
    let (_, _, mut session) = session_with(two_lines());
    time_update(&mut session, 13.0);
    let view = session.view();
    assert!(view.gap.active);
    assert_eq!(view.gap.remaining_seconds, 7);
    // the line itself stays on screen while the countdown runs
    assert_eq!(view.active, Some(0));
}

#[test]
fn no_lyrics_means_no_active_line_and_no_gap() {
    let (_, _, mut session) = session_with(Vec::new());
    for time in [0.0, 12.0, 300.0] {
        time_update(&mut session, time);
        let view = session.view();
        assert_eq!(view.active, None);
        assert_eq!(view.reveal_fraction, None);
        assert!(!view.gap.active);
        assert!(!GapDetector::default().detect(time, &[]).active);
    }
}

#[test]
fn time_updates_realign_the_vocal_track() {
    let (_, vocal, mut session) = session_with(two_lines());
    vocal.0.lock().position = 4.0;
    time_update(&mut session, 11.0);
    assert_eq!(vocal.position(), 11.0);
}

#[test]
fn paused_clock_freezes_the_highlight() {
    let (_, _, mut session) = session_with(two_lines());
    session.handle(PlayerEvent::Media(MediaSignal::Play));
    time_update(&mut session, 12.0);
    session.handle(PlayerEvent::Media(MediaSignal::Pause));
    let frozen = session.view().reveal_fraction;
    // ticks keep arriving while paused; the fake track reports nothing new
    for _ in 0..5 {
        session.handle(PlayerEvent::Tick);
    }
    assert_eq!(session.view().reveal_fraction, frozen);
    assert!(!session.view().playback.is_playing);
}

#[test]
fn toggle_follows_the_clock_state() {
    let (instrumental, vocal, mut session) = session_with(two_lines());
    session.handle(TransportCommand::TogglePlayback.into());
    assert!(instrumental.0.lock().playing);
    assert!(vocal.0.lock().playing);

    session.handle(PlayerEvent::Media(MediaSignal::Play));
    session.handle(TransportCommand::TogglePlayback.into());
    assert!(!instrumental.0.lock().playing);
    assert!(!vocal.0.lock().playing);
}

#[test]
fn seeking_to_a_line_moves_both_tracks() {
    let (instrumental, vocal, mut session) = session_with(two_lines());
    session.handle(TransportCommand::SeekToLine { index: 1 }.into());
    assert_eq!(instrumental.position(), 20.0);
    assert_eq!(vocal.position(), 20.0);

    session.handle(TransportCommand::SeekToLine { index: 9 }.into());
    assert_eq!(instrumental.position(), 20.0);
}

#[test]
fn relative_seeks_are_clamped_to_the_song() {
    let (instrumental, vocal, mut session) = session_with(two_lines());
    time_update(&mut session, 2.0);
    session.handle(TransportCommand::SeekBy { delta_seconds: -5.0 }.into());
    assert_eq!(instrumental.position(), 0.0);
    assert_eq!(vocal.position(), 0.0);

    session.handle(TransportCommand::Seek { seconds: 1e9 }.into());
    // fake tracks report a 240 second length
    assert_eq!(instrumental.position(), 240.0);
}

#[test]
fn vocal_volume_steps_stay_in_range() {
    let (instrumental, vocal, mut session) = session_with(two_lines());
    assert_eq!(vocal.0.lock().volume, 0.0);
    session.handle(TransportCommand::AdjustVocalVolume { delta_percent: 30 }.into());
    assert!((vocal.0.lock().volume - 0.3).abs() < 1e-12);
    session.handle(TransportCommand::AdjustVocalVolume { delta_percent: 200 }.into());
    assert_eq!(vocal.0.lock().volume, 1.0);
    session.handle(TransportCommand::AdjustVocalVolume { delta_percent: -500 }.into());
    assert_eq!(vocal.0.lock().volume, 0.0);
    session.handle(TransportCommand::SetVocalVolume { percent: 55 }.into());
    assert!((session.view().playback.vocal_volume_fraction - 0.55).abs() < 1e-12);
    assert_eq!(instrumental.0.lock().volume, 1.0);
}

#[test]
fn ended_track_stops_the_vocal_too() {
    let (_, vocal, mut session) = session_with(two_lines());
    session.handle(TransportCommand::Play.into());
    session.handle(PlayerEvent::Media(MediaSignal::Play));
    session.handle(PlayerEvent::Media(MediaSignal::Ended));
    assert!(!session.view().playback.is_playing);
    assert!(!vocal.0.lock().playing);
}

#[test]
fn display_mode_is_reported_in_the_view() {
    let (_, _, mut session) = session_with(two_lines());
    session.handle(PlayerEvent::DisplayModeChanged(DisplayMode::Fullscreen));
    assert_eq!(session.view().display_mode, DisplayMode::Fullscreen);
}

#[test]
fn missing_tracks_leave_the_session_usable() {
    let session_sync = TrackSynchronizer::new(None, None);
    let mut session = KaraokeSession::new(
        LyricSheet::new(two_lines()),
        session_sync,
        &TimingConfiguration::default(),
        50,
    );
    session.handle(TransportCommand::TogglePlayback.into());
    session.handle(TransportCommand::SeekBy { delta_seconds: 5.0 }.into());
    session.handle(PlayerEvent::Tick);
    let view = session.view();
    assert_eq!(view.active, None);
    assert_eq!(view.duration, None);
    assert_eq!(view.progress_ratio(), 0.0);
}

#[test]
fn a_lone_vocal_track_stays_put() {
    let vocal = FakeTrack::default();
    let mut session = KaraokeSession::new(
        LyricSheet::new(two_lines()),
        TrackSynchronizer::new(None, vocal.boxed()),
        &TimingConfiguration::default(),
        0,
    );
    session.handle(TransportCommand::TogglePlayback.into());
    assert!(!vocal.0.lock().playing);
    session.handle(TransportCommand::TogglePlayback.into());
    assert!(!vocal.0.lock().playing);
    session.handle(TransportCommand::Seek { seconds: 30.0 }.into());
    assert_eq!(vocal.position(), 0.0);
    assert!(!session.view().playback.is_playing);
}

#[test]
fn shorter_vocal_track_is_not_reported_as_aligned() {
    let instrumental = TimelineTrack::new(Some(60.0));
    let vocal = TimelineTrack::new(Some(30.0));
    let mut sync = TrackSynchronizer::new(Some(Box::new(instrumental)), Some(Box::new(vocal)));
    for _ in 0..3 {
        assert_eq!(
            sync.on_instrumental_time_update(40.0),
            DriftCorrection::Skipped { drift: -10.0 }
        );
    }
}

#[tokio::test]
async fn closing_the_view_pauses_both_tracks() {
    let instrumental = FakeTrack::default();
    let vocal = FakeTrack::default();
    let session = KaraokeSession::new(
        LyricSheet::new(two_lines()),
        TrackSynchronizer::new(instrumental.boxed(), vocal.boxed()),
        &TimingConfiguration::default(),
        0,
    );
    let view = std::sync::Arc::new(parking_lot::Mutex::new(session.view()));
    let (_media_tx, media_rx) = flume::unbounded();
    let (events_tx, events_rx) = flume::unbounded();
    let handle = tokio::spawn(run_event_loop(
        session,
        media_rx,
        events_rx,
        view,
        Duration::from_millis(10),
    ));

    events_tx.send(TransportCommand::Play.into()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(instrumental.0.lock().playing);
    assert!(vocal.0.lock().playing);

    drop(events_tx);
    handle.await.unwrap().unwrap();
    assert!(!instrumental.0.lock().playing);
    assert!(!vocal.0.lock().playing);
}

#[tokio::test]
async fn event_loop_drives_a_timeline_session_until_the_view_closes() {
    let (media_tx, media_rx) = flume::unbounded();
    let instrumental = TimelineTrack::new(Some(60.0)).with_signals(media_tx);
    let vocal = TimelineTrack::new(Some(60.0));
    let sync = TrackSynchronizer::new(Some(Box::new(instrumental)), Some(Box::new(vocal)));
    let session = KaraokeSession::new(
        LyricSheet::new(two_lines()),
        sync,
        &TimingConfiguration::default(),
        0,
    );
    let view = std::sync::Arc::new(parking_lot::Mutex::new(session.view()));
    let (events_tx, events_rx) = flume::unbounded();

    let handle = tokio::spawn(run_event_loop(
        session,
        media_rx,
        events_rx,
        view.clone(),
        Duration::from_millis(10),
    ));

    events_tx
        .send(TransportCommand::Seek { seconds: 10.5 }.into())
        .unwrap();
    events_tx.send(TransportCommand::Play.into()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    {
        let view = view.lock();
        assert!(view.playback.is_playing);
        assert_eq!(view.active, Some(0));
        assert!(view.playback.current_time_seconds >= 10.5);
        assert_eq!(view.duration, Some(60.0));
    }

    drop(events_tx);
    handle.await.unwrap().unwrap();
}
