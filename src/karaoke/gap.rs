use super::LyricEntry;

/// Default length a gap has to exceed before a countdown is shown.
pub const DEFAULT_GAP_THRESHOLD_SECONDS: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GapWindow {
    pub remaining_seconds: u32,
    pub active: bool,
}

/// Decides whether playback sits in a vocal-free stretch long enough for a
/// countdown to the next line.
#[derive(Debug, Clone, Copy)]
pub struct GapDetector {
    /// How long a line counts as sung after its start.
    pub line_seconds: f64,
    pub threshold_seconds: f64,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self {
            line_seconds: super::DEFAULT_LAST_LINE_SECONDS,
            threshold_seconds: DEFAULT_GAP_THRESHOLD_SECONDS,
        }
    }
}

impl GapDetector {
    /// `entries` must be the displayed (sorted, blank-free) lines, so that the
    /// entry before the next one is also the line that was last on screen.
    pub fn detect(&self, time: f64, entries: &[LyricEntry]) -> GapWindow {
        let Some(next_idx) = entries.iter().position(|it| it.start_seconds > time) else {
            // past the last line, nothing to count down to
            return GapWindow::default();
        };
        let previous = next_idx.checked_sub(1).map(|idx| &entries[idx]);
        let previous_tail = previous.map(|it| it.start_seconds + self.line_seconds);
        if previous_tail.is_some_and(|tail| time < tail) {
            return GapWindow::default();
        }

        let time_to_next = entries[next_idx].start_seconds - time;
        let time_since_last = previous_tail.map_or(0.0, |tail| time - tail);
        if time_since_last > self.threshold_seconds || time_to_next > self.threshold_seconds {
            GapWindow {
                remaining_seconds: time_to_next.ceil() as u32,
                active: true,
            }
        } else {
            GapWindow::default()
        }
    }
}
