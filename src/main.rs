use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    config::KaraokeConfig,
    event::MediaSignal,
    karaoke::{
        handler::KaraokeHandler,
        lyric_index::LyricSheet,
        session::KaraokeSession,
        sync::{MediaTrack, TrackSynchronizer},
        timeline_track::TimelineTrack,
        tui_backend::{fmt_duration, TerminalUiBackend},
    },
    library::{probe_duration, Song, SongLibrary},
};

mod config;
mod event;
mod karaoke;
mod library;

#[derive(Debug, Parser)]
#[command(version, about = "Karaoke with time-synced lyrics in your terminal")]
struct Cli {
    /// Config file, defaults to ~/.config/karaoke/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding one sub-directory per song
    #[arg(long, global = true)]
    songs_dir: Option<PathBuf>,
    /// Where logs are written, defaults to ~/.config/karaoke/karaoke.log
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the songs in the library
    List,
    /// Print the lyrics of a song
    Lyrics {
        id: String,
        /// Print lyrics.txt instead of the timed lines
        #[arg(long)]
        raw: bool,
    },
    /// Open the karaoke player for a song
    Play { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(path) => path,
        None => KaraokeConfig::config_dir()?.join("karaoke.log"),
    };
    init_logging(&log_file)?;

    let mut config = KaraokeConfig::load(cli.config.as_deref()).await?;
    if let Some(songs_dir) = cli.songs_dir {
        config.general.songs_dir = songs_dir;
    }
    let library = SongLibrary::new(&config.general.songs_dir);

    match cli.command {
        Command::List => list_songs(&library).await,
        Command::Lyrics { id, raw } => print_lyrics(&library, &config, &id, raw).await,
        Command::Play { id } => {
            let song = library.load(&id).await?;
            play(song, Arc::new(config)).await
        }
    }
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn list_songs(library: &SongLibrary) -> anyhow::Result<()> {
    let songs = library.list().await?;
    if songs.is_empty() {
        println!("No songs in {}", library.root().display());
    }
    for song in songs {
        let synced = if song.has_transcription { "synced" } else { "" };
        let length = song.duration.map(fmt_duration).unwrap_or_else(|| "-:--".to_owned());
        println!(
            "{:>4}  {length:>6}  {} by {}  {synced}",
            song.id, song.metadata.title, song.metadata.artist
        );
    }
    Ok(())
}

async fn print_lyrics(
    library: &SongLibrary,
    config: &KaraokeConfig,
    id: &str,
    raw: bool,
) -> anyhow::Result<()> {
    let song = library.load(id).await?;
    println!("{} by {}\n", song.metadata.title, song.metadata.artist);
    if raw {
        print!("{}", song.raw_lyrics);
        return Ok(());
    }
    let sheet = lyric_sheet(&song, config);
    if sheet.is_empty() {
        println!("No synced lyrics for this song");
    }
    for entry in sheet.entries() {
        println!("{:>6}  {}", fmt_duration(entry.start_seconds), entry.text);
    }
    Ok(())
}

fn lyric_sheet(song: &Song, config: &KaraokeConfig) -> LyricSheet {
    let entries = song
        .transcription
        .as_ref()
        .map(|it| it.lyric_entries())
        .unwrap_or_default();
    let sheet = LyricSheet::new(entries).with_last_line_seconds(config.timing.last_line_seconds);
    if config.general.romanize_lyrics {
        sheet.romanized()
    } else {
        sheet
    }
}

/// A track for `path`, or `None` when the file is missing. The duration comes
/// from the file headers, falling back to the end of the last lyric line.
fn open_track(
    path: &Path,
    fallback_duration: Option<f64>,
    signals: Option<flume::Sender<MediaSignal>>,
) -> Option<Box<dyn MediaTrack>> {
    if !path.exists() {
        tracing::warn!("Audio file {} is missing, track disabled", path.display());
        return None;
    }
    let duration = match probe_duration(path) {
        Ok(duration) => Some(duration),
        Err(e) => {
            tracing::warn!("Could not read the length of {}: {e:#}", path.display());
            fallback_duration
        }
    };
    let track = TimelineTrack::new(duration);
    Some(Box::new(match signals {
        Some(signals) => track.with_signals(signals),
        None => track,
    }))
}

async fn play(song: Song, config: Arc<KaraokeConfig>) -> anyhow::Result<()> {
    let sheet = lyric_sheet(&song, &config);
    let fallback_duration = sheet
        .entries()
        .last()
        .map(|it| it.start_seconds + config.timing.last_line_seconds);

    let (media_tx, media_rx) = flume::unbounded();
    let instrumental = open_track(&song.audio.instrumental, fallback_duration, Some(media_tx));
    let vocal = open_track(&song.audio.vocal, fallback_duration, None);
    let sync = TrackSynchronizer::new(instrumental, vocal);

    let session = KaraokeSession::new(
        sheet,
        sync,
        &config.timing,
        config.general.initial_vocal_volume_percent,
    );
    let backend = TerminalUiBackend::new(&song.metadata, &config.general.display)?;
    tracing::info!("Starting player for song {}", song.id);
    KaraokeHandler::new(session, media_rx, backend)
        .run(config)
        .await
}
