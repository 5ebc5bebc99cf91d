use crate::document::Document;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub word_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadedDocument {
    pub session_id: String,
    pub segments: Vec<String>,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

impl UploadedDocument {
    pub fn into_document(self) -> Document {
        Document::new(self.session_id, self.segments)
    }
}

/// A synthesis voice. The backend only sends `{id: description}`; name and
/// language are derived from ids shaped like `en-US-JennyNeural`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    pub description: String,
}

impl Voice {
    pub fn from_catalog_entry(id: &str, description: &str) -> Self {
        let parts: Vec<&str> = id.split('-').collect();
        let language = parts.iter().take(2).copied().collect::<Vec<_>>().join("-");
        let name = parts
            .iter()
            .skip(2)
            .copied()
            .collect::<Vec<_>>()
            .join("-")
            .replace("Neural", "");
        Self {
            id: id.to_string(),
            name: if name.is_empty() { id.to_string() } else { name },
            language,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bookmark {
    pub id: String,
    /// Not sent by the server; filled in by the client.
    #[serde(default)]
    pub session_id: String,
    pub segment_index: usize,
    #[serde(default)]
    pub position: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmarkDraft {
    pub segment_index: usize,
    pub position: f64,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionProgress {
    pub current_segment: usize,
    pub current_position: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnswerPayload {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TtsRequest<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(super) struct AskRequest<'a> {
    pub session_id: &'a str,
    pub question: &'a str,
    pub context: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: String,
}
