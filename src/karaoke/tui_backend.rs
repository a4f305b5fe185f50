use std::{io::Stdout, sync::Arc, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use handlebars::Handlebars;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::{
    config::{DisplayConfig, KaraokeConfig, ThemeConfiguration},
    event::{DisplayMode, PlayerEvent, TransportCommand},
    library::SongMetadata,
};

use super::{
    handler::{KaraokeBackend, SharedView},
    render::split_reveal,
    session::PlayerView,
};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Frame pacing of the terminal; the highlight itself only moves with playback time.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub struct TerminalUiBackend {
    header: String,
    subtitle: String,
    selected_line: Option<usize>,
}

impl TerminalUiBackend {
    pub fn new(metadata: &SongMetadata, display: &DisplayConfig) -> anyhow::Result<Self> {
        let registry = Handlebars::new();
        let data = serde_json::json!({
            "title": metadata.title,
            "artist": metadata.artist,
        });
        Ok(Self {
            header: registry.render_template(&display.header_format, &data)?,
            subtitle: registry.render_template(&display.subtitle_format, &data)?,
            selected_line: None,
        })
    }
}

#[async_trait::async_trait]
impl KaraokeBackend for TerminalUiBackend {
    async fn run_backend(
        &mut self,
        view: SharedView,
        events: flume::Sender<PlayerEvent>,
        config: Arc<KaraokeConfig>,
    ) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;

        let result = self.tui_loop(&view, &events, &config, &mut terminal).await;

        restore_terminal(&mut terminal)?;
        result
    }
}

enum Input {
    Send(PlayerEvent),
    Quit,
    Nothing,
}

impl TerminalUiBackend {
    async fn tui_loop(
        &mut self,
        view: &SharedView,
        events: &flume::Sender<PlayerEvent>,
        config: &KaraokeConfig,
        terminal: &mut Term,
    ) -> anyhow::Result<()> {
        loop {
            let snapshot = view.lock().clone();
            terminal.draw(|frame| self.handle_ui(&snapshot, config, frame))?;

            if event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    match self.handle_key(key.code, &snapshot, config) {
                        Input::Quit => break,
                        Input::Send(event) => {
                            if events.send(event).is_err() {
                                break;
                            }
                        }
                        Input::Nothing => {}
                    }
                    continue;
                }
            }
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, view: &PlayerView, config: &KaraokeConfig) -> Input {
        let general = &config.general;
        let line_count = view.sheet.len();
        let command = match code {
            KeyCode::Char('q') | KeyCode::Esc => return Input::Quit,
            KeyCode::Char(' ') => TransportCommand::TogglePlayback,
            KeyCode::Char('p') => TransportCommand::Play,
            KeyCode::Char('s') => TransportCommand::Pause,
            KeyCode::Char(digit @ '0'..='9') => TransportCommand::SetVocalVolume {
                percent: (digit as u8 - b'0') * 10,
            },
            KeyCode::Char('=') => TransportCommand::SetVocalVolume { percent: 100 },
            KeyCode::Left => TransportCommand::SeekBy {
                delta_seconds: -general.seek_step_seconds,
            },
            KeyCode::Right => TransportCommand::SeekBy {
                delta_seconds: general.seek_step_seconds,
            },
            KeyCode::Home => TransportCommand::Seek { seconds: 0.0 },
            KeyCode::Up | KeyCode::Char('+') => TransportCommand::AdjustVocalVolume {
                delta_percent: general.volume_step_percent as i16,
            },
            KeyCode::Down | KeyCode::Char('-') => TransportCommand::AdjustVocalVolume {
                delta_percent: -(general.volume_step_percent as i16),
            },
            KeyCode::Char('f') => {
                let mode = match view.display_mode {
                    DisplayMode::Windowed => DisplayMode::Fullscreen,
                    DisplayMode::Fullscreen => DisplayMode::Windowed,
                };
                return Input::Send(PlayerEvent::DisplayModeChanged(mode));
            }
            KeyCode::Char('j') if line_count > 0 => {
                let from = self.selected_line.or(view.active);
                self.selected_line = Some(from.map_or(0, |it| (it + 1).min(line_count - 1)));
                return Input::Nothing;
            }
            KeyCode::Char('k') if line_count > 0 => {
                let from = self.selected_line.or(view.active);
                self.selected_line = Some(from.map_or(0, |it| it.saturating_sub(1)));
                return Input::Nothing;
            }
            KeyCode::Enter => match self.selected_line.take() {
                Some(index) => TransportCommand::SeekToLine { index },
                None => return Input::Nothing,
            },
            _ => return Input::Nothing,
        };
        Input::Send(command.into())
    }

    fn handle_ui(
        &self,
        view: &PlayerView,
        config: &KaraokeConfig,
        f: &mut Frame<CrosstermBackend<Stdout>>,
    ) {
        let theme = &config.theme;
        let size = f.size();
        let fullscreen = view.display_mode == DisplayMode::Fullscreen;
        let show_timeline = !fullscreen && config.general.display.show_timeline;

        let constraints = if fullscreen {
            vec![
                Constraint::Length(4),
                Constraint::Min(6),
                Constraint::Length(3),
            ]
        } else {
            vec![
                Constraint::Length(4),
                Constraint::Length(8),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(if show_timeline { 5 } else { 0 }),
            ]
        };
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(size);

        // Header
        let header = Paragraph::new(vec![
            Line::from(self.header.as_str().bold()),
            Line::from(self.subtitle.as_str().fg(Color::Gray)),
        ])
        .alignment(Alignment::Center)
        .block(bordered(theme, None));
        f.render_widget(header, layout[0]);

        // Current lyric
        let lyric = Paragraph::new(lyric_lines(view, theme))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .block(bordered(theme, None));
        f.render_widget(lyric, layout[1]);

        if fullscreen {
            f.render_widget(progress_gauge(view, theme), layout[2]);
            return;
        }

        // Vocal mix
        let vocal_volume = view.playback.vocal_volume_fraction;
        let volume = Gauge::default()
            .block(bordered(theme, Some("Vocals")))
            .gauge_style(Style::default().fg(theme.progress_bar.volume_color.0))
            .ratio(vocal_volume)
            .label(format!("{:.0}%", vocal_volume * 100.0));
        f.render_widget(volume, layout[2]);

        f.render_widget(progress_gauge(view, theme), layout[3]);

        if show_timeline {
            self.render_timeline(view, theme, f, layout[4]);
        }
    }

    fn render_timeline(
        &self,
        view: &PlayerView,
        theme: &ThemeConfiguration,
        f: &mut Frame<CrosstermBackend<Stdout>>,
        area: Rect,
    ) {
        let timeline = &theme.timeline;
        let lines = view
            .sheet
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let marker = if self.selected_line == Some(idx) { ">" } else { " " };
                let time = format!("{marker}{:>6}  ", fmt_duration(entry.start_seconds));
                if view.active == Some(idx) {
                    let style = Style::default()
                        .bg(timeline.active_line_color.0)
                        .fg(timeline.active_text_color.0);
                    Line::from(vec![
                        Span::styled(time, style),
                        Span::styled(entry.text.as_str(), style.add_modifier(Modifier::BOLD)),
                    ])
                } else {
                    Line::from(vec![
                        Span::styled(time, Style::default().fg(timeline.time_color.0)),
                        Span::raw(entry.text.as_str()),
                    ])
                }
            })
            .collect::<Vec<_>>();

        let focus = self.selected_line.or(view.active).unwrap_or(0);
        let visible = area.height.saturating_sub(2) as usize;
        let scroll = focus.saturating_sub(visible / 2) as u16;
        let timeline = Paragraph::new(lines)
            .scroll((scroll, 0))
            .block(bordered(theme, Some("Lyrics Timeline")));
        f.render_widget(timeline, area);
    }
}

fn bordered<'a>(theme: &ThemeConfiguration, title: Option<&'a str>) -> Block<'a> {
    let borders = &theme.borders;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(borders.border_style.0)
        .border_style(Style::default().fg(borders.border_color.0));
    match title {
        Some(title) => block.title(Span::styled(
            title,
            Style::default().fg(borders.border_text_color.0),
        )),
        None => block,
    }
}

fn lyric_lines<'a>(view: &'a PlayerView, theme: &ThemeConfiguration) -> Vec<Line<'a>> {
    let lyrics = &theme.lyrics;
    let mut lines = vec![Line::default()];

    let current = view
        .active
        .and_then(|idx| view.sheet.get(idx))
        .zip(view.reveal_fraction);
    match current {
        Some((entry, fraction)) => {
            let (highlighted, pending) = split_reveal(&entry.text, fraction);
            lines.push(Line::from(vec![
                Span::styled(
                    highlighted,
                    Style::default()
                        .fg(lyrics.highlighted_text_color.0)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    pending,
                    Style::default()
                        .fg(lyrics.pending_text_color.0)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        }
        None => lines.push(Line::from(Span::styled(
            placeholder(view),
            Style::default().fg(lyrics.placeholder_text_color.0),
        ))),
    }

    if let Some(next) = view.active.and_then(|idx| view.sheet.get(idx + 1)) {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            next.text.as_str(),
            Style::default().fg(lyrics.preview_text_color.0),
        )));
    }

    if view.gap.active {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("Next line in {}", view.gap.remaining_seconds),
            Style::default().fg(lyrics.placeholder_text_color.0),
        )));
    }
    lines
}

/// Text shown while no lyric line is active.
pub fn placeholder(view: &PlayerView) -> &'static str {
    if view.sheet.is_empty() {
        "No synced lyrics for this song"
    } else if view.playback.is_playing {
        "♪ Instrumental ♪"
    } else {
        "Press play to start karaoke"
    }
}

fn progress_gauge<'a>(view: &PlayerView, theme: &'a ThemeConfiguration) -> Gauge<'a> {
    let ratio = view.progress_ratio();
    let label = if theme.progress_bar.is_percentage {
        format!("{:.0}%", ratio * 100.0)
    } else {
        format!(
            "{} / {}",
            fmt_duration(view.playback.current_time_seconds),
            fmt_duration(view.duration.unwrap_or(0.0))
        )
    };
    let title = if view.playback.is_playing {
        "Playing"
    } else {
        "Paused"
    };
    Gauge::default()
        .block(bordered(theme, Some(title)))
        .gauge_style(Style::default().fg(theme.progress_bar.color.0))
        .ratio(ratio)
        .label(label)
}

/// `m:ss`, minutes unpadded.
pub fn fmt_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let minutes = total / 60;
    let seconds = total % 60;
    format!("{minutes}:{seconds:0>2}")
}

fn setup_terminal() -> anyhow::Result<Term> {
    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen,)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> anyhow::Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor().map_err(anyhow::Error::from)
}
