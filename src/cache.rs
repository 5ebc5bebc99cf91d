//! On-disk cache of synthesized speech.
//!
//! Files live under `<cache_dir>/tts/` named by a SHA-256 of the voice and
//! the segment text, so the same segment spoken with the same voice is only
//! synthesized once. Write failures are logged and otherwise ignored; the
//! cache is an optimisation, never a source of errors for playback.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AudioCache {
    root: PathBuf,
}

impl AudioCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            root: cache_dir.as_ref().join("tts"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self, text: &str, voice: Option<&str>) -> Option<Vec<u8>> {
        let path = self.entry_path(text, voice);
        let bytes = fs::read(&path).ok()?;
        debug!(path = %path.display(), "Audio cache hit");
        Some(bytes)
    }

    pub fn store(&self, text: &str, voice: Option<&str>, bytes: &[u8]) {
        let path = self.entry_path(text, voice);
        if let Err(err) = fs::create_dir_all(&self.root) {
            warn!(dir = %self.root.display(), "Failed to create audio cache dir: {err}");
            return;
        }
        // Write to a sibling first so a crash never leaves a truncated entry.
        let temp = path.with_extension("wav.tmp");
        let result = fs::write(&temp, bytes).and_then(|_| fs::rename(&temp, &path));
        match result {
            Ok(()) => debug!(path = %path.display(), bytes = bytes.len(), "Cached synthesized audio"),
            Err(err) => {
                let _ = fs::remove_file(&temp);
                warn!(path = %path.display(), "Failed to cache synthesized audio: {err}");
            }
        }
    }

    fn entry_path(&self, text: &str, voice: Option<&str>) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(voice.unwrap_or("default").as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.root.join(format!("tts-{hash}.wav"))
    }
}
