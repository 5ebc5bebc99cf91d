use super::models::{
    AnswerPayload, AskRequest, Bookmark, BookmarkDraft, ErrorBody, SessionProgress, TtsRequest,
    UploadedDocument, Voice,
};
use super::ReaderApi;
use crate::error::{ReaderError, Result};
use reqwest::blocking::{Client, Response, multipart};
use reqwest::header::CONTENT_TYPE;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

const WAV_CONTENT_TYPES: [&str; 3] = ["audio/wav", "audio/x-wav", "audio/wave"];

/// [`ReaderApi`] over HTTP using a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|err| ReaderError::Network(format!("building HTTP client: {err}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-success response into an error built by `kind`, preferring the
/// server's `{"error": ...}` message over the raw body.
fn ensure_success(response: Response, kind: fn(String) -> ReaderError) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(kind(format!("{status}: {}", server_message(&body))))
}

fn server_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

fn network(err: reqwest::Error) -> ReaderError {
    ReaderError::Network(err.to_string())
}

impl ReaderApi for HttpApi {
    fn upload_document(&self, path: &Path) -> Result<UploadedDocument> {
        info!(path = %path.display(), "Uploading document");
        let form = multipart::Form::new()
            .file("file", path)
            .map_err(|err| ReaderError::UploadFailed(format!("{}: {err}", path.display())))?;
        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .map_err(|err| ReaderError::UploadFailed(err.to_string()))?;
        let uploaded: UploadedDocument = ensure_success(response, ReaderError::UploadFailed)?
            .json()
            .map_err(|err| ReaderError::UploadFailed(format!("invalid upload response: {err}")))?;
        info!(
            session = %uploaded.session_id,
            segments = uploaded.segments.len(),
            "Document uploaded"
        );
        Ok(uploaded)
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        let response = self.client.get(self.url("/voices")).send().map_err(network)?;
        let catalog: BTreeMap<String, String> = ensure_success(response, ReaderError::Network)?
            .json()
            .map_err(network)?;
        debug!(count = catalog.len(), "Fetched voice catalog");
        Ok(catalog
            .iter()
            .map(|(id, description)| Voice::from_catalog_entry(id, description))
            .collect())
    }

    fn text_to_speech(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>> {
        debug!(chars = text.len(), voice = ?voice_id, "Requesting speech synthesis");
        let response = self
            .client
            .post(self.url("/tts"))
            .json(&TtsRequest { text, voice_id })
            .send()
            .map_err(|err| ReaderError::SynthesisFailed(err.to_string()))?;
        let response = ensure_success(response, ReaderError::SynthesisFailed)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !WAV_CONTENT_TYPES.contains(&content_type.as_str()) {
            warn!(%content_type, "Synthesis returned non-audio content");
            return Err(ReaderError::InvalidFormat(format!(
                "expected audio/wav, got {content_type:?}"
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|err| ReaderError::SynthesisFailed(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn ask_question(&self, session_id: &str, question: &str, context: &str) -> Result<String> {
        info!(session = session_id, chars = question.len(), "Asking assistant");
        let response = self
            .client
            .post(self.url("/ask"))
            .json(&AskRequest {
                session_id,
                question,
                context,
            })
            .send()
            .map_err(network)?;
        let payload: AnswerPayload = ensure_success(response, ReaderError::Network)?
            .json()
            .map_err(network)?;
        Ok(payload.response)
    }

    fn list_bookmarks(&self, session_id: &str) -> Result<Vec<Bookmark>> {
        let response = self
            .client
            .get(self.url(&format!("/session/{session_id}/bookmark")))
            .send()
            .map_err(network)?;
        let mut bookmarks: Vec<Bookmark> = ensure_success(response, ReaderError::Network)?
            .json()
            .map_err(network)?;
        for bookmark in &mut bookmarks {
            bookmark.session_id = session_id.to_string();
        }
        Ok(bookmarks)
    }

    fn create_bookmark(&self, session_id: &str, draft: &BookmarkDraft) -> Result<Bookmark> {
        let response = self
            .client
            .post(self.url(&format!("/session/{session_id}/bookmark")))
            .json(draft)
            .send()
            .map_err(network)?;
        let mut bookmark: Bookmark = ensure_success(response, ReaderError::Network)?
            .json()
            .map_err(network)?;
        bookmark.session_id = session_id.to_string();
        Ok(bookmark)
    }

    fn delete_bookmark(&self, session_id: &str, bookmark_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/session/{session_id}/bookmark")))
            .query(&[("bookmark_id", bookmark_id)])
            .send()
            .map_err(network)?;
        ensure_success(response, ReaderError::Network)?;
        Ok(())
    }

    fn save_progress(&self, session_id: &str, progress: &SessionProgress) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("/session/{session_id}")))
            .json(progress)
            .send()
            .map_err(network)?;
        ensure_success(response, ReaderError::Network)?;
        Ok(())
    }
}
