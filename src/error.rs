//! Error kinds surfaced by the reading assistant.
//!
//! Every variant is recoverable: callers turn them into a dismissible notice
//! and the user retries the triggering action. Payloads are plain strings so
//! errors can travel across the event inbox and be cloned into notices.

use thiserror::Error;

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    #[error("document upload failed: {0}")]
    UploadFailed(String),
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("synthesized audio is not playable: {0}")]
    InvalidFormat(String),
    #[error("audio device error: {0}")]
    PlaybackDevice(String),
    #[error("network request failed: {0}")]
    Network(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("settings persistence failed: {0}")]
    Settings(String),
}

impl ReaderError {
    /// Short machine-readable label, used in logs and notices.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UploadFailed(_) => "upload_failed",
            Self::SynthesisFailed(_) => "synthesis_failed",
            Self::InvalidFormat(_) => "invalid_format",
            Self::PlaybackDevice(_) => "playback_device_error",
            Self::Network(_) => "network_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::Settings(_) => "settings_error",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Synthesis failures reach the controller either from the transport or
    /// from decoding the returned bytes; both surface as `SynthesisFailed`.
    pub fn into_synthesis_failure(self) -> Self {
        match self {
            Self::SynthesisFailed(_) => self,
            Self::InvalidFormat(msg) => Self::SynthesisFailed(format!("invalid audio: {msg}")),
            other => Self::SynthesisFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReaderError;

    #[test]
    fn invalid_format_folds_into_synthesis_failure() {
        let err = ReaderError::InvalidFormat("text/html".into()).into_synthesis_failure();
        assert_eq!(err.kind(), "synthesis_failed");
        assert!(err.to_string().contains("text/html"));
    }

    #[test]
    fn network_error_keeps_message_when_folded() {
        let err = ReaderError::Network("connection refused".into()).into_synthesis_failure();
        assert!(matches!(err, ReaderError::SynthesisFailed(ref msg) if msg.contains("connection refused")));
    }
}
