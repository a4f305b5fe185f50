use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use crate::{
    config::KaraokeConfig,
    event::{MediaSignal, PlayerEvent},
};

use super::session::{KaraokeSession, PlayerView};

pub type SharedView = Arc<Mutex<PlayerView>>;

/// Presents a running session and turns user input into [`PlayerEvent`]s.
///
/// Returning from `run_backend` drops `events`, which ends the session.
#[async_trait::async_trait]
pub trait KaraokeBackend {
    async fn run_backend(
        &mut self,
        view: SharedView,
        events: flume::Sender<PlayerEvent>,
        config: Arc<KaraokeConfig>,
    ) -> anyhow::Result<()>;
}

pub struct KaraokeHandler<T: KaraokeBackend> {
    session: KaraokeSession,
    media_rx: flume::Receiver<MediaSignal>,
    view: SharedView,
    backend: T,
}

impl<T: KaraokeBackend + Send + Sync + 'static> KaraokeHandler<T> {
    /// `media_rx` receives the signals of the session's instrumental track.
    pub fn new(
        session: KaraokeSession,
        media_rx: flume::Receiver<MediaSignal>,
        backend: T,
    ) -> Self {
        let view = Arc::new(Mutex::new(session.view()));
        Self {
            session,
            media_rx,
            view,
            backend,
        }
    }

    pub async fn run(self, config: Arc<KaraokeConfig>) -> anyhow::Result<()> {
        let (events_tx, events_rx) = flume::unbounded();
        let tick = Duration::from_millis(config.general.tick_interval_ms.max(10));

        let Self {
            session,
            media_rx,
            view,
            mut backend,
        } = self;
        let view_w = view.clone();
        let event_handler = tokio::task::spawn(async move {
            run_event_loop(session, media_rx, events_rx, view_w, tick).await
        });
        let backend_handler =
            tokio::task::spawn(async move { backend.run_backend(view, events_tx, config).await });
        let (events, backend) = tokio::join!(event_handler, backend_handler);
        events??;
        backend??;
        Ok(())
    }
}

/// Processes media signals, view events and ticks strictly one after another and
/// publishes a fresh [`PlayerView`] after each. Ends once every event sender is gone.
pub async fn run_event_loop(
    mut session: KaraokeSession,
    media_rx: flume::Receiver<MediaSignal>,
    events_rx: flume::Receiver<PlayerEvent>,
    view: SharedView,
    tick: Duration,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            Ok(signal) = media_rx.recv_async() => PlayerEvent::Media(signal),
            event = events_rx.recv_async() => match event {
                Ok(event) => event,
                Err(_) => break,
            },
            _ = ticker.tick() => PlayerEvent::Tick,
        };
        session.handle(event);
        *view.lock() = session.view();
    }

    tracing::debug!("Player view closed, stopping playback");
    session.shutdown();
    Ok(())
}
