use serde::Deserialize;

pub mod clock;
pub mod gap;
pub mod handler;
pub mod lyric_index;
pub mod render;
pub mod session;
pub mod sync;
pub mod timeline_track;
pub mod tui_backend;

#[cfg(test)]
mod tests;

/// How long the last lyric line stays "sung" when there is no next line to end it.
pub const DEFAULT_LAST_LINE_SECONDS: f64 = 3.0;

/// One timestamped lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricEntry {
    pub start_seconds: f64,
    pub text: String,
}

impl LyricEntry {
    pub fn new(start_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Contents of `matched_transcription.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub result: Vec<TranscriptionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionRecord {
    pub start: f64,
    #[serde(default)]
    pub correct_lyric: Option<String>,
}

impl Transcription {
    /// Records that carry a lyric, in file order. Blank records are dropped here so
    /// that every downstream index refers to a displayable line.
    pub fn lyric_entries(&self) -> Vec<LyricEntry> {
        self.result
            .iter()
            .filter_map(|record| {
                let text = record.correct_lyric.as_deref()?;
                if text.trim().is_empty() {
                    return None;
                }
                Some(LyricEntry::new(record.start, text))
            })
            .collect()
    }
}
