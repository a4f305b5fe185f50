/// Signals a media track raises about itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaSignal {
    TimeUpdate(f64),
    Play,
    Pause,
    Ended,
}

/// Requests coming from the player view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    Play,
    Pause,
    TogglePlayback,
    Seek { seconds: f64 },
    SeekBy { delta_seconds: f64 },
    SeekToLine { index: usize },
    SetVocalVolume { percent: u8 },
    AdjustVocalVolume { delta_percent: i16 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Windowed,
    Fullscreen,
}

/// Everything the player session reacts to, processed one at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Media(MediaSignal),
    Command(TransportCommand),
    DisplayModeChanged(DisplayMode),
    Tick,
}

impl From<TransportCommand> for PlayerEvent {
    fn from(value: TransportCommand) -> Self {
        PlayerEvent::Command(value)
    }
}
