//! Bookmark manager: a local, insertion-ordered mirror of the session's
//! bookmarks.
//!
//! Every mutation goes to the server first; the cache only changes once the
//! server has accepted it. [`BookmarkManager::prepare`] validates a request,
//! the caller runs it against the backend on a worker thread, and the
//! `apply_*` methods feed the response back in.

use crate::api::{Bookmark, BookmarkDraft};
use crate::document::SegmentStore;
use crate::error::{ReaderError, Result};
use crate::text_utils::preview;
use tracing::{debug, info, warn};

const BOOKMARK_TEXT_PREVIEW: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct BookmarkManager {
    session_id: Option<String>,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a new session and forget the old session's bookmarks.
    pub fn reset(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
        self.bookmarks.clear();
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn list(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn get(&self, bookmark_id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|bookmark| bookmark.id == bookmark_id)
    }

    /// Segment a bookmark points at, with the saved position inside it.
    pub fn jump_target(&self, bookmark_id: &str) -> Option<(usize, f64)> {
        self.get(bookmark_id)
            .map(|bookmark| (bookmark.segment_index, bookmark.position))
    }

    fn require_session(&self) -> Result<&str> {
        self.session_id
            .as_deref()
            .ok_or_else(|| ReaderError::InvalidInput("no document is loaded".into()))
    }

    /// Validate a bookmark request against the loaded document.
    pub fn prepare(
        &self,
        segments: &SegmentStore,
        segment_index: usize,
        position_secs: f64,
        note: &str,
    ) -> Result<(String, BookmarkDraft)> {
        let session_id = self.require_session()?.to_string();
        let Some(text) = segments.text(segment_index) else {
            return Err(ReaderError::InvalidInput(format!(
                "segment {segment_index} does not exist"
            )));
        };
        let draft = BookmarkDraft {
            segment_index,
            position: position_secs.max(0.0),
            note: note.trim().to_string(),
            text: Some(preview(text, BOOKMARK_TEXT_PREVIEW)),
        };
        Ok((session_id, draft))
    }

    pub fn apply_listed(&mut self, session_id: &str, bookmarks: Vec<Bookmark>) {
        if !self.is_current(session_id) {
            return;
        }
        info!(session = session_id, count = bookmarks.len(), "Refreshed bookmarks");
        self.bookmarks = bookmarks;
    }

    /// Append in creation order; the list is never re-sorted by segment.
    pub fn apply_created(&mut self, session_id: &str, bookmark: Bookmark) {
        if !self.is_current(session_id) {
            return;
        }
        info!(
            session = session_id,
            id = %bookmark.id,
            segment = bookmark.segment_index,
            "Bookmark created"
        );
        self.bookmarks.retain(|existing| existing.id != bookmark.id);
        self.bookmarks.push(bookmark);
    }

    pub fn apply_deleted(&mut self, session_id: &str, bookmark_id: &str) {
        if !self.is_current(session_id) {
            return;
        }
        let before = self.bookmarks.len();
        self.bookmarks.retain(|bookmark| bookmark.id != bookmark_id);
        if self.bookmarks.len() == before {
            warn!(id = bookmark_id, "Deleted bookmark was not in the local list");
        } else {
            info!(session = session_id, id = bookmark_id, "Bookmark deleted");
        }
    }

    fn is_current(&self, session_id: &str) -> bool {
        let current = self.session_id.as_deref() == Some(session_id);
        if !current {
            debug!(
                session = session_id,
                current = ?self.session_id,
                "Ignoring bookmark update for another session"
            );
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ReaderApi, SessionProgress, UploadedDocument, Voice};
    use crate::document::Document;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct BookmarkServer {
        stored: Mutex<Vec<Bookmark>>,
        next_id: Mutex<u32>,
        fail: Mutex<bool>,
    }

    impl BookmarkServer {
        fn failing(&self, fail: bool) {
            *self.fail.lock().expect("lock") = fail;
        }

        fn check(&self) -> Result<()> {
            if *self.fail.lock().expect("lock") {
                Err(ReaderError::Network("503 Service Unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    impl ReaderApi for BookmarkServer {
        fn upload_document(&self, _path: &Path) -> Result<UploadedDocument> {
            unimplemented!()
        }

        fn list_voices(&self) -> Result<Vec<Voice>> {
            Ok(Vec::new())
        }

        fn text_to_speech(&self, _text: &str, _voice_id: Option<&str>) -> Result<Vec<u8>> {
            unimplemented!()
        }

        fn ask_question(&self, _: &str, _: &str, _: &str) -> Result<String> {
            unimplemented!()
        }

        fn list_bookmarks(&self, session_id: &str) -> Result<Vec<Bookmark>> {
            self.check()?;
            Ok(self
                .stored
                .lock()
                .expect("lock")
                .iter()
                .filter(|b| b.session_id == session_id)
                .cloned()
                .collect())
        }

        fn create_bookmark(&self, session_id: &str, draft: &BookmarkDraft) -> Result<Bookmark> {
            self.check()?;
            let mut next_id = self.next_id.lock().expect("lock");
            *next_id += 1;
            let bookmark = Bookmark {
                id: format!("b{next_id}"),
                session_id: session_id.to_string(),
                segment_index: draft.segment_index,
                position: draft.position,
                note: Some(draft.note.clone()),
                created_at: None,
            };
            self.stored.lock().expect("lock").push(bookmark.clone());
            Ok(bookmark)
        }

        fn delete_bookmark(&self, _session_id: &str, bookmark_id: &str) -> Result<()> {
            self.check()?;
            self.stored.lock().expect("lock").retain(|b| b.id != bookmark_id);
            Ok(())
        }

        fn save_progress(&self, _: &str, _: &SessionProgress) -> Result<()> {
            Ok(())
        }
    }

    fn loaded() -> (BookmarkManager, SegmentStore) {
        let mut segments = SegmentStore::new();
        segments.load(Document::new(
            "s1",
            vec!["zero".into(), "one".into(), "two".into()],
        ));
        let mut manager = BookmarkManager::new();
        manager.reset(Some("s1".into()));
        (manager, segments)
    }

    /// Same round trip the reader runs: prepare, call the backend, apply.
    fn create(
        manager: &mut BookmarkManager,
        server: &BookmarkServer,
        segments: &SegmentStore,
        segment_index: usize,
        position_secs: f64,
        note: &str,
    ) -> Result<Bookmark> {
        let (session_id, draft) = manager.prepare(segments, segment_index, position_secs, note)?;
        let created = server.create_bookmark(&session_id, &draft)?;
        manager.apply_created(&session_id, created.clone());
        Ok(created)
    }

    fn refresh(manager: &mut BookmarkManager, server: &BookmarkServer) -> Result<Vec<Bookmark>> {
        let session_id = manager.session_id().expect("session").to_string();
        let listed = server.list_bookmarks(&session_id)?;
        manager.apply_listed(&session_id, listed);
        Ok(manager.list().to_vec())
    }

    fn delete(manager: &mut BookmarkManager, server: &BookmarkServer, id: &str) -> Result<()> {
        let session_id = manager.session_id().expect("session").to_string();
        server.delete_bookmark(&session_id, id)?;
        manager.apply_deleted(&session_id, id);
        Ok(())
    }

    #[test]
    fn created_bookmark_is_listed_then_deleted() {
        let server = BookmarkServer::default();
        let (mut manager, segments) = loaded();

        let created =
            create(&mut manager, &server, &segments, 2, 0.0, "important").expect("created");
        let listed = refresh(&mut manager, &server).expect("listed");
        assert!(listed
            .iter()
            .any(|b| b.segment_index == 2 && b.note.as_deref() == Some("important")));

        delete(&mut manager, &server, &created.id).expect("deleted");
        assert!(refresh(&mut manager, &server).expect("listed").is_empty());
    }

    #[test]
    fn keeps_creation_order() {
        let server = BookmarkServer::default();
        let (mut manager, segments) = loaded();
        create(&mut manager, &server, &segments, 2, 0.0, "later").expect("created");
        create(&mut manager, &server, &segments, 0, 0.0, "earlier").expect("created");
        let order: Vec<usize> = manager.list().iter().map(|b| b.segment_index).collect();
        assert_eq!(order, vec![2, 0]);
    }

    #[test]
    fn failures_leave_cache_untouched() {
        let server = BookmarkServer::default();
        let (mut manager, segments) = loaded();
        let kept = create(&mut manager, &server, &segments, 1, 2.5, "").expect("created");

        server.failing(true);
        assert!(create(&mut manager, &server, &segments, 0, 0.0, "x").is_err());
        assert!(delete(&mut manager, &server, &kept.id).is_err());
        assert_eq!(manager.list(), &[kept]);
    }

    #[test]
    fn requires_loaded_document_and_valid_segment() {
        let manager = BookmarkManager::new();
        let segments = SegmentStore::new();
        let err = manager.prepare(&segments, 0, 0.0, "x").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));

        let (manager, segments) = loaded();
        let err = manager.prepare(&segments, 7, 0.0, "x").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));
    }

    #[test]
    fn responses_for_previous_session_are_ignored() {
        let (mut manager, _segments) = loaded();
        manager.apply_created(
            "old",
            Bookmark {
                id: "b1".into(),
                session_id: "old".into(),
                segment_index: 0,
                position: 0.0,
                note: None,
                created_at: None,
            },
        );
        assert!(manager.is_empty());
    }

    #[test]
    fn jump_target_returns_segment_and_position() {
        let server = BookmarkServer::default();
        let (mut manager, segments) = loaded();
        let created = create(&mut manager, &server, &segments, 1, 3.25, "").expect("created");
        assert_eq!(manager.jump_target(&created.id), Some((1, 3.25)));
        assert_eq!(manager.jump_target("missing"), None);
    }
}
