//! Progressive highlighting of the active lyric line.
//!
//! Everything here is a function of playback time only. The view redraws as
//! often as it likes; a paused clock yields the same frame every time.

/// Portion of the line between `start` and `end` that `time` has reached,
/// clamped to `[0, 1]`. A zero-length line counts as fully sung once reached.
pub fn reveal_fraction(start: f64, end: f64, time: f64) -> f64 {
    let duration = end - start;
    if !(duration > 0.0) {
        return if time >= start { 1.0 } else { 0.0 };
    }
    ((time - start) / duration).clamp(0.0, 1.0)
}

/// Splits `text` into its highlighted prefix and pending suffix.
pub fn split_reveal(text: &str, fraction: f64) -> (&str, &str) {
    let chars = text.chars().count();
    let highlighted = (fraction.clamp(0.0, 1.0) * chars as f64).floor() as usize;
    let at = text
        .char_indices()
        .nth(highlighted)
        .map_or(text.len(), |(byte, _)| byte);
    text.split_at(at)
}
