use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use lofty::{file::AudioFile, probe::Probe};
use serde::Deserialize;

use crate::karaoke::Transcription;

const METADATA_FILE: &str = "metadata.json";
const LYRICS_FILE: &str = "lyrics.txt";
const TRANSCRIPTION_FILE: &str = "matched_transcription.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SongMetadata {
    pub title: String,
    pub artist: String,
}

impl Default for SongMetadata {
    fn default() -> Self {
        Self {
            title: "Unknown Song".to_owned(),
            artist: "Unknown Artist".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioLocators {
    pub instrumental: PathBuf,
    pub vocal: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SongSummary {
    pub id: String,
    pub metadata: SongMetadata,
    pub has_transcription: bool,
    /// Length of the instrumental track, when it can be read.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Song {
    pub id: String,
    pub metadata: SongMetadata,
    /// Plain `lyrics.txt`, empty when the song has none.
    pub raw_lyrics: String,
    pub transcription: Option<Transcription>,
    pub audio: AudioLocators,
}

/// A directory of songs laid out as `<root>/<id>/output/...`.
#[derive(Debug, Clone)]
pub struct SongLibrary {
    root: PathBuf,
}

impl SongLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn output_dir(&self, id: &str) -> PathBuf {
        self.root.join(id).join("output")
    }

    fn audio_locators(output: &Path) -> AudioLocators {
        let audio_dir = output.join("songs_audio");
        AudioLocators {
            instrumental: audio_dir.join("instrumental.mp3"),
            vocal: audio_dir.join("vocal.mp3"),
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<SongSummary>> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read songs directory {}", self.root.display()))?;
        let mut songs = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!("Skipping song directory with a non UTF-8 name: {:?}", entry.path());
                continue;
            };
            let output = self.output_dir(&id);
            let metadata = match read_metadata(&output).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Skipping song {id}: {e:#}");
                    continue;
                }
            };
            let has_transcription = tokio::fs::try_exists(output.join(TRANSCRIPTION_FILE))
                .await
                .unwrap_or(false);
            let instrumental = Self::audio_locators(&output).instrumental;
            let duration = match probe_duration(&instrumental) {
                Ok(duration) => Some(duration),
                Err(e) => {
                    tracing::debug!("No length for song {id}: {e:#}");
                    None
                }
            };
            songs.push(SongSummary {
                id,
                metadata,
                has_transcription,
                duration,
            });
        }
        songs.sort_by(|a, b| song_order(&a.id, &b.id));
        Ok(songs)
    }

    pub async fn load(&self, id: &str) -> anyhow::Result<Song> {
        if id.is_empty() {
            bail!("Song ID is required");
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            bail!("Invalid song ID {id:?}");
        }
        let output = self.output_dir(id);
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            bail!("Song not found: {id}");
        }

        let metadata = read_metadata(&output).await?;
        let raw_lyrics = read_optional(&output.join(LYRICS_FILE))
            .await?
            .unwrap_or_default();
        let transcription = match read_optional(&output.join(TRANSCRIPTION_FILE)).await? {
            Some(content) => Some(
                serde_json::from_str::<Transcription>(&content)
                    .with_context(|| format!("Malformed {TRANSCRIPTION_FILE} for song {id}"))?,
            ),
            None => None,
        };

        tracing::info!(
            "Loaded song {id}: {} by {}",
            metadata.title,
            metadata.artist
        );
        Ok(Song {
            id: id.to_owned(),
            metadata,
            raw_lyrics,
            transcription,
            audio: Self::audio_locators(&output),
        })
    }
}

/// Numeric ids sort numerically and before any other id.
fn song_order(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

async fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

async fn read_metadata(output: &Path) -> anyhow::Result<SongMetadata> {
    match read_optional(&output.join(METADATA_FILE)).await? {
        Some(content) => serde_json::from_str(&content)
            .with_context(|| format!("Malformed {METADATA_FILE} in {}", output.display())),
        None => Ok(SongMetadata::default()),
    }
}

/// Length of an audio file from its container headers. Nothing is decoded.
pub fn probe_duration(path: &Path) -> anyhow::Result<f64> {
    let tagged_file = Probe::open(path)
        .with_context(|| format!("Failed to open audio file {}", path.display()))?
        .read()
        .with_context(|| format!("Failed to read audio file {}", path.display()))?;
    Ok(tagged_file.properties().duration().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_song(root: &Path, id: &str, files: &[(&str, &str)]) {
        let output = root.join(id).join("output");
        tokio::fs::create_dir_all(&output).await.unwrap();
        for (name, content) in files {
            tokio::fs::write(output.join(name), content).await.unwrap();
        }
    }

    #[tokio::test]
    async fn loads_a_complete_song() {
        let dir = tempfile::tempdir().unwrap();
        write_song(
            dir.path(),
            "3",
            &[
                (METADATA_FILE, r#"{"title": "The Next Episode", "artist": "Dr. Dre"}"#),
                (LYRICS_FILE, "la la la\n"),
                (
                    TRANSCRIPTION_FILE,
                    r#"{"result": [{"start": 1.5, "correct_lyric": "la la la"}]}"#,
                ),
            ],
        )
        .await;

        let song = SongLibrary::new(dir.path()).load("3").await.unwrap();
        assert_eq!(song.metadata.title, "The Next Episode");
        assert_eq!(song.raw_lyrics, "la la la\n");
        let entries = song.transcription.unwrap().lyric_entries();
        assert_eq!(entries.len(), 1);
        assert!(song.audio.instrumental.ends_with("output/songs_audio/instrumental.mp3"));
        assert!(song.audio.vocal.ends_with("output/songs_audio/vocal.mp3"));
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_song(dir.path(), "7", &[]).await;
        let song = SongLibrary::new(dir.path()).load("7").await.unwrap();
        assert_eq!(song.metadata, SongMetadata::default());
        assert!(song.raw_lyrics.is_empty());
        assert!(song.transcription.is_none());
    }

    #[tokio::test]
    async fn rejects_bad_ids() {
        let dir = tempfile::tempdir().unwrap();
        let library = SongLibrary::new(dir.path());
        assert!(library.load("").await.is_err());
        assert!(library.load("../etc").await.is_err());
        assert!(library.load("..").await.is_err());
        assert!(library.load("404").await.is_err());
    }

    #[tokio::test]
    async fn malformed_transcription_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_song(dir.path(), "1", &[(TRANSCRIPTION_FILE, "{not json")]).await;
        assert!(SongLibrary::new(dir.path()).load("1").await.is_err());
    }

    #[tokio::test]
    async fn lists_songs_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        write_song(dir.path(), "10", &[(TRANSCRIPTION_FILE, "{}")]).await;
        write_song(dir.path(), "2", &[(METADATA_FILE, r#"{"title": "Ms. Jackson"}"#)]).await;
        write_song(dir.path(), "demo", &[]).await;
        tokio::fs::write(dir.path().join("README"), "not a song").await.unwrap();

        let songs = SongLibrary::new(dir.path()).list().await.unwrap();
        let ids = songs.iter().map(|it| it.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["2", "10", "demo"]);
        assert_eq!(songs[0].metadata.title, "Ms. Jackson");
        assert_eq!(songs[0].metadata.artist, "Unknown Artist");
        assert!(songs[1].has_transcription);
        assert!(!songs[2].has_transcription);
    }

    #[tokio::test]
    async fn unreadable_audio_lists_without_a_length() {
        let dir = tempfile::tempdir().unwrap();
        write_song(dir.path(), "1", &[]).await;
        write_song(dir.path(), "2", &[]).await;
        let audio_dir = dir.path().join("2").join("output").join("songs_audio");
        tokio::fs::create_dir_all(&audio_dir).await.unwrap();
        tokio::fs::write(audio_dir.join("instrumental.mp3"), "not audio")
            .await
            .unwrap();

        let songs = SongLibrary::new(dir.path()).list().await.unwrap();
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().all(|it| it.duration.is_none()));
    }
}
