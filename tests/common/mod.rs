#![allow(dead_code)]

use readit::api::{
    Bookmark, BookmarkDraft, ReaderApi, SessionProgress, UploadedDocument, Voice,
};
use readit::audio::{
    AudioOutput, AudioSink, DeviceEvent, DeviceSignal, HandleId, SynthesizedAudio,
};
use readit::config::AppConfig;
use readit::settings::SettingsStore;
use readit::{ReaderApp, ReaderError, Result};
use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Mono 16-bit silence of the given length.
pub fn wav_bytes(duration_secs: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for _ in 0..(duration_secs * 8_000.0) as usize {
            writer.write_sample(0i16).expect("sample");
        }
        writer.finalize().expect("finalize");
    }
    cursor.into_inner()
}

#[derive(Debug, Default)]
pub struct ApiLog {
    pub document: Option<UploadedDocument>,
    pub voices: Vec<Voice>,
    pub tts_calls: Vec<(String, Option<String>)>,
    pub fail_tts: bool,
    pub questions: Vec<(String, String, String)>,
    pub bookmarks: Vec<Bookmark>,
    pub next_bookmark: u32,
    pub progress: Vec<(String, SessionProgress)>,
}

/// In-memory backend. Clones share state so a test can inspect what the app
/// sent after handing one clone over.
#[derive(Debug, Clone, Default)]
pub struct FakeApi {
    log: Arc<Mutex<ApiLog>>,
}

impl FakeApi {
    pub fn with_voices(voices: &[&str]) -> Self {
        let api = Self::default();
        api.log().voices = voices
            .iter()
            .map(|id| Voice::from_catalog_entry(id, "test voice"))
            .collect();
        api
    }

    pub fn log(&self) -> MutexGuard<'_, ApiLog> {
        self.log.lock().expect("api log")
    }

    pub fn tts_texts(&self) -> Vec<String> {
        self.log().tts_calls.iter().map(|(text, _)| text.clone()).collect()
    }
}

impl ReaderApi for FakeApi {
    fn upload_document(&self, path: &Path) -> Result<UploadedDocument> {
        self.log()
            .document
            .clone()
            .ok_or_else(|| ReaderError::UploadFailed(format!("{} rejected", path.display())))
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(self.log().voices.clone())
    }

    fn text_to_speech(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>> {
        let mut log = self.log();
        log.tts_calls
            .push((text.to_string(), voice_id.map(str::to_string)));
        if log.fail_tts {
            return Err(ReaderError::SynthesisFailed("500: voice unavailable".into()));
        }
        Ok(wav_bytes(1.0))
    }

    fn ask_question(&self, session_id: &str, question: &str, context: &str) -> Result<String> {
        self.log().questions.push((
            session_id.to_string(),
            question.to_string(),
            context.to_string(),
        ));
        Ok(format!("answer to {question}"))
    }

    fn list_bookmarks(&self, session_id: &str) -> Result<Vec<Bookmark>> {
        Ok(self
            .log()
            .bookmarks
            .iter()
            .filter(|bookmark| bookmark.session_id == session_id)
            .cloned()
            .collect())
    }

    fn create_bookmark(&self, session_id: &str, draft: &BookmarkDraft) -> Result<Bookmark> {
        let mut log = self.log();
        log.next_bookmark += 1;
        let bookmark = Bookmark {
            id: format!("bm-{}", log.next_bookmark),
            session_id: session_id.to_string(),
            segment_index: draft.segment_index,
            position: draft.position,
            note: Some(draft.note.clone()),
            created_at: Some("2026-01-01T00:00:00".into()),
        };
        log.bookmarks.push(bookmark.clone());
        Ok(bookmark)
    }

    fn delete_bookmark(&self, _session_id: &str, bookmark_id: &str) -> Result<()> {
        let mut log = self.log();
        let before = log.bookmarks.len();
        log.bookmarks.retain(|bookmark| bookmark.id != bookmark_id);
        if log.bookmarks.len() == before {
            return Err(ReaderError::Network("404 Not Found: Bookmark not found".into()));
        }
        Ok(())
    }

    fn save_progress(&self, session_id: &str, progress: &SessionProgress) -> Result<()> {
        self.log().progress.push((session_id.to_string(), *progress));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeviceLog {
    pub live: usize,
    pub max_live: usize,
    pub opened: Vec<HandleId>,
    pub plays: Vec<(HandleId, f64)>,
    pub speeds: Vec<(HandleId, f32)>,
    senders: Vec<(HandleId, Sender<DeviceEvent>)>,
}

#[derive(Clone, Default)]
pub struct FakeOutput {
    pub log: Rc<RefCell<DeviceLog>>,
}

impl FakeOutput {
    pub fn live(&self) -> usize {
        self.log.borrow().live
    }

    pub fn max_live(&self) -> usize {
        self.log.borrow().max_live
    }

    pub fn last_opened(&self) -> HandleId {
        *self.log.borrow().opened.last().expect("a sink was opened")
    }

    /// Report `signal` from sink `handle` on the channel it was opened with.
    pub fn emit(&self, handle: HandleId, signal: DeviceSignal) {
        let log = self.log.borrow();
        let (_, events) = log
            .senders
            .iter()
            .find(|(id, _)| *id == handle)
            .expect("sink was opened");
        events
            .send(DeviceEvent { handle, signal })
            .expect("device channel open");
    }
}

impl AudioOutput for FakeOutput {
    fn open(
        &mut self,
        id: HandleId,
        _audio: SynthesizedAudio,
        events: Sender<DeviceEvent>,
    ) -> Result<Box<dyn AudioSink>> {
        let mut log = self.log.borrow_mut();
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        log.opened.push(id);
        log.senders.push((id, events));
        Ok(Box::new(FakeSink {
            id,
            position: 0.0,
            stopped: false,
            log: Rc::clone(&self.log),
        }))
    }
}

struct FakeSink {
    id: HandleId,
    position: f64,
    stopped: bool,
    log: Rc<RefCell<DeviceLog>>,
}

impl AudioSink for FakeSink {
    fn play_from(&mut self, position_secs: f64) -> Result<()> {
        self.position = position_secs;
        self.log.borrow_mut().plays.push((self.id, position_secs));
        Ok(())
    }

    fn pause(&mut self) -> f64 {
        self.position
    }

    fn set_speed(&mut self, speed: f32) {
        self.log.borrow_mut().speeds.push((self.id, speed));
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.log.borrow_mut().live -= 1;
        }
    }
}

pub fn segments(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

/// A reader wired to fakes, with settings and cache in a scratch dir.
pub struct Harness {
    pub app: ReaderApp<FakeApi, FakeOutput>,
    pub api: FakeApi,
    pub reader_output: FakeOutput,
    pub answer_output: FakeOutput,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(api: FakeApi, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig {
            settings_path: dir.path().join("settings.toml").display().to_string(),
            cache_dir: dir.path().join("cache").display().to_string(),
            audio_cache: false,
            ..AppConfig::default()
        };
        configure(&mut config);
        let settings = SettingsStore::load(&config.settings_path);
        let reader_output = FakeOutput::default();
        let answer_output = FakeOutput::default();
        let app = ReaderApp::new(
            api.clone(),
            config,
            settings,
            reader_output.clone(),
            answer_output.clone(),
        );
        Self {
            app,
            api,
            reader_output,
            answer_output,
            dir,
        }
    }

    /// Upload a document made of `texts` and wait for it to load.
    pub fn open(&mut self, texts: &[&str]) {
        self.api.log().document = Some(UploadedDocument {
            session_id: "s1".into(),
            segments: segments(texts),
            metadata: None,
        });
        let path = self.dir.path().join("book.txt");
        std::fs::write(&path, texts.join("\n\n")).expect("write document");
        self.app.open_document(path);
        self.settle();
    }

    /// Have the newest reader sink report `signal`, then pump it through.
    pub fn device(&mut self, signal: DeviceSignal) {
        let handle = self.reader_output.last_opened();
        self.reader_output.emit(handle, signal);
        self.app.pump();
    }

    pub fn settle(&mut self) {
        assert!(
            self.app.pump_until_idle(IDLE_TIMEOUT),
            "worker requests did not finish"
        );
    }
}
