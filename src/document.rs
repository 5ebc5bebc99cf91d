//! Segment store: the ordered text segments of the loaded document and the
//! active segment index.

use crate::text_utils::word_count;
use serde::{Deserialize, Serialize};

/// A document as returned by the upload endpoint. Immutable once loaded;
/// a new upload replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub session_id: String,
    pub segments: Vec<String>,
}

impl Document {
    pub fn new(session_id: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            segments,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    session_id: Option<String>,
    segments: Vec<String>,
    word_counts: Vec<usize>,
    active: usize,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current document and reset the active index to 0.
    pub fn load(&mut self, document: Document) {
        self.word_counts = document.segments.iter().map(|s| word_count(s)).collect();
        self.segments = document.segments;
        self.session_id = Some(document.session_id);
        self.active = 0;
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn word_counts(&self) -> &[usize] {
        &self.word_counts
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_text(&self) -> Option<&str> {
        self.segments.get(self.active).map(String::as_str)
    }

    pub fn active_word_count(&self) -> usize {
        self.word_counts.get(self.active).copied().unwrap_or(0)
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn is_first(&self) -> bool {
        self.active == 0
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 >= self.segments.len()
    }

    /// Set the active index, clamped to the valid range. Returns whether the
    /// index changed.
    pub(crate) fn set_active_clamped(&mut self, index: usize) -> bool {
        let clamped = index.min(self.segments.len().saturating_sub(1));
        let changed = clamped != self.active;
        self.active = clamped;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(segments: &[&str]) -> SegmentStore {
        let mut store = SegmentStore::new();
        store.load(Document::new(
            "s1",
            segments.iter().map(|s| s.to_string()).collect(),
        ));
        store
    }

    #[test]
    fn load_resets_active_index() {
        let mut store = store(&["a b", "c"]);
        store.set_active_clamped(1);
        store.load(Document::new("s2", vec!["x".into()]));
        assert_eq!(store.active_index(), 0);
        assert_eq!(store.session_id(), Some("s2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clamps_active_index() {
        let mut store = store(&["a", "b", "c"]);
        assert!(store.set_active_clamped(9));
        assert_eq!(store.active_index(), 2);
        assert!(store.is_last());
        assert!(!store.set_active_clamped(2));
    }

    #[test]
    fn caches_word_counts() {
        let store = store(&["w1 w2 w3", "w4 w5 w6 w7"]);
        assert_eq!(store.word_counts(), &[3, 4]);
        assert_eq!(store.active_word_count(), 3);
    }
}
