//! Word splitting helpers for highlight alignment and pagination.

/// Whitespace-delimited tokens of a segment.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimate which word is being spoken from the playback position.
///
/// Returns `None` when the segment has no words or the duration is unknown.
/// The result is `floor(position / duration * word_count)` clamped to
/// `0..word_count`.
pub fn highlight_index(position_secs: f64, duration_secs: f64, word_count: usize) -> Option<usize> {
    if word_count == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return None;
    }
    let position = if position_secs.is_finite() {
        position_secs.clamp(0.0, duration_secs)
    } else {
        0.0
    };
    let estimate = (position / duration_secs * word_count as f64).floor() as usize;
    Some(estimate.min(word_count - 1))
}

/// Short preview used in log lines and bookmark listings.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
