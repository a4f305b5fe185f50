use super::{LyricEntry, DEFAULT_LAST_LINE_SECONDS};

/// Index of the lyric whose window `[start, next.start)` contains `time`.
///
/// The last entry's window is open ended. Returns `None` before the first entry
/// and for an empty slice. When two entries share a start time the first one
/// has an empty window, so the first *matching* entry is the later one.
pub fn resolve_active(time: f64, entries: &[LyricEntry]) -> Option<usize> {
    (0..entries.len()).find(|&idx| window_contains(entries, idx, time))
}

/// When the entry at `idx` stops being sung: the next entry's start, or
/// `start + last_line_seconds` for the final entry.
pub fn effective_end(entries: &[LyricEntry], idx: usize, last_line_seconds: f64) -> Option<f64> {
    let entry = entries.get(idx)?;
    Some(match entries.get(idx + 1) {
        Some(next) => next.start_seconds,
        None => entry.start_seconds + last_line_seconds,
    })
}

fn window_contains(entries: &[LyricEntry], idx: usize, time: f64) -> bool {
    let Some(entry) = entries.get(idx) else {
        return false;
    };
    time >= entry.start_seconds
        && entries
            .get(idx + 1)
            .map_or(true, |next| time < next.start_seconds)
}

/// Normalized, displayable lyric lines of one song.
#[derive(Debug, Clone)]
pub struct LyricSheet {
    entries: Vec<LyricEntry>,
    last_line_seconds: f64,
}

impl Default for LyricSheet {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            last_line_seconds: DEFAULT_LAST_LINE_SECONDS,
        }
    }
}

impl LyricSheet {
    /// Drops blank and non-finite entries and stable-sorts the rest by start time,
    /// so out-of-order input can never make resolution misbehave.
    pub fn new(entries: impl IntoIterator<Item = LyricEntry>) -> Self {
        let mut entries = entries
            .into_iter()
            .filter(|it| !it.is_blank() && it.start_seconds.is_finite())
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn with_last_line_seconds(mut self, seconds: f64) -> Self {
        self.last_line_seconds = seconds;
        self
    }

    pub fn entries(&self) -> &[LyricEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&LyricEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn effective_end(&self, idx: usize) -> Option<f64> {
        effective_end(&self.entries, idx, self.last_line_seconds)
    }

    /// Replaces every lyric with its ASCII transliteration.
    pub fn romanized(mut self) -> Self {
        for entry in &mut self.entries {
            entry.text = deunicode::deunicode(&entry.text);
        }
        self
    }
}

/// Remembers the last resolved index and tries it (and its successor) before
/// falling back to a full scan.
///
/// Only valid over sorted entries such as [`LyricSheet::entries`], where the
/// windows are disjoint and a hit on the hint is the unique match.
#[derive(Debug, Clone, Copy, Default)]
pub struct LyricCursor {
    hint: Option<usize>,
}

impl LyricCursor {
    pub fn resolve(&mut self, time: f64, entries: &[LyricEntry]) -> Option<usize> {
        let hinted = self
            .hint
            .into_iter()
            .flat_map(|idx| [idx, idx + 1])
            .find(|&idx| window_contains(entries, idx, time));
        let resolved = hinted.or_else(|| resolve_active(time, entries));
        self.hint = resolved;
        resolved
    }
}
