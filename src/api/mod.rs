//! Request/response boundary to the reading backend.
//!
//! Everything the core needs from the server goes through [`ReaderApi`]. The
//! trait is blocking; callers that must not block run it on a worker thread
//! and feed the result back through their event inbox.

mod http;
mod models;

pub use http::HttpApi;
pub use models::{
    AnswerPayload, Bookmark, BookmarkDraft, DocumentMetadata, SessionProgress, UploadedDocument,
    Voice,
};

use crate::error::Result;
use std::path::Path;

pub trait ReaderApi: Send + Sync {
    /// Upload a document; the server segments it and opens a session.
    fn upload_document(&self, path: &Path) -> Result<UploadedDocument>;
    fn list_voices(&self) -> Result<Vec<Voice>>;
    /// Synthesize `text`, returning playable WAV bytes.
    fn text_to_speech(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>>;
    fn ask_question(&self, session_id: &str, question: &str, context: &str) -> Result<String>;
    fn list_bookmarks(&self, session_id: &str) -> Result<Vec<Bookmark>>;
    fn create_bookmark(&self, session_id: &str, draft: &BookmarkDraft) -> Result<Bookmark>;
    fn delete_bookmark(&self, session_id: &str, bookmark_id: &str) -> Result<()>;
    fn save_progress(&self, session_id: &str, progress: &SessionProgress) -> Result<()>;
}
