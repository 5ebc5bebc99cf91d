//! Runtime wiring for the reading assistant.
//!
//! [`ReaderApp`] owns every component and is driven from a single thread.
//! Network calls run on short-lived worker threads and post their result to
//! the app's inbox; audio sinks post to a device channel. Nothing mutates
//! state outside [`ReaderApp::pump`] and [`ReaderApp::dispatch`], so all
//! transitions happen one event at a time.

mod messages;

pub use messages::Command;

use crate::api::{ReaderApi, SessionProgress, Voice};
use crate::assistant::{AssistantSession, Exchange};
use crate::audio::{AudioOutput, DeviceEvent, SynthesizedAudio};
use crate::bookmarks::BookmarkManager;
use crate::cache::AudioCache;
use crate::config::AppConfig;
use crate::document::Document;
use crate::error::{ReaderError, Result};
use crate::playback::{PlaybackAction, PlaybackController, PlaybackState};
use crate::settings::{Settings, SettingsStore};
use crate::text_utils::words;
use messages::Message;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A dismissible, user-visible error report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: &'static str,
    pub message: String,
}

/// Everything a view needs to render the reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReaderSnapshot {
    pub session_id: Option<String>,
    pub segment_count: usize,
    pub active_text: Option<String>,
    /// The word under the highlight, if any.
    pub spoken_word: Option<String>,
    pub playback: PlaybackState,
    pub current_page: usize,
    pub total_pages: usize,
    pub bookmark_count: usize,
    pub speaking_answer: bool,
    pub settings: Settings,
    pub notices: Vec<Notice>,
}

pub struct ReaderApp<A: ReaderApi + 'static, O: AudioOutput> {
    api: Arc<A>,
    config: AppConfig,
    settings: SettingsStore,
    playback: PlaybackController<O>,
    device_rx: Receiver<DeviceEvent>,
    bookmarks: BookmarkManager,
    assistant: AssistantSession<O>,
    cache: Option<AudioCache>,
    voices: Vec<Voice>,
    inbox_tx: Sender<Message>,
    inbox_rx: Receiver<Message>,
    in_flight: usize,
    notices: VecDeque<Notice>,
    next_notice_id: u64,
    finished: bool,
}

impl<A: ReaderApi + 'static, O: AudioOutput> ReaderApp<A, O> {
    /// `output` backs document playback; `answer_output` backs spoken
    /// assistant answers.
    pub fn new(
        api: A,
        config: AppConfig,
        settings: SettingsStore,
        output: O,
        answer_output: O,
    ) -> Self {
        let (device_tx, device_rx) = mpsc::channel();
        let (inbox_tx, inbox_rx) = mpsc::channel();
        let cache = config
            .audio_cache
            .then(|| AudioCache::new(&config.cache_dir));
        let mut playback = PlaybackController::new(output, device_tx, config.continuous_playback);
        playback.set_playback_speed(settings.get().playback_speed);
        Self {
            api: Arc::new(api),
            playback,
            assistant: AssistantSession::new(answer_output),
            config,
            settings,
            device_rx,
            bookmarks: BookmarkManager::new(),
            cache,
            voices: Vec::new(),
            inbox_tx,
            inbox_rx,
            in_flight: 0,
            notices: VecDeque::new(),
            next_notice_id: 1,
            finished: false,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        self.settings.get()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn bookmarks(&self) -> &BookmarkManager {
        &self.bookmarks
    }

    pub fn answers(&self) -> &[Exchange] {
        self.assistant.history()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    /// True once the last segment has played to the end.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Requests still running on worker threads.
    pub fn pending_requests(&self) -> usize {
        self.in_flight
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let segments = self.playback.segments();
        let pages = self.playback.page_state(self.settings.get().words_per_page);
        let playback = self.playback.state();
        let spoken_word = segments
            .active_text()
            .zip(playback.highlighted_word)
            .and_then(|(text, index)| words(text).get(index).map(|word| word.to_string()));
        ReaderSnapshot {
            session_id: segments.session_id().map(str::to_string),
            segment_count: segments.len(),
            active_text: segments.active_text().map(str::to_string),
            spoken_word,
            playback,
            current_page: pages.current_page,
            total_pages: pages.total_pages,
            bookmark_count: self.bookmarks.len(),
            speaking_answer: self.assistant.is_speaking(),
            settings: self.settings.get().clone(),
            notices: self.notices.iter().cloned().collect(),
        }
    }

    /// Upload a file; the document is loaded once the server answers.
    pub fn open_document(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!(path = %path.display(), "Opening document");
        self.spawn(move |api| Message::DocumentUploaded(api.upload_document(&path)));
    }

    pub fn load_document(&mut self, document: Document) {
        let session_id = document.session_id.clone();
        self.finished = false;
        self.assistant.stop_speaking();
        self.playback.load_document(document);
        self.bookmarks.reset(Some(session_id));
        self.refresh_bookmarks();
    }

    pub fn dispatch(&mut self, command: Command) {
        debug!(?command, "Dispatching command");
        match command {
            Command::TogglePlayPause => {
                let actions = self.playback.toggle_play_pause();
                self.run_playback_actions(actions);
            }
            Command::Play => {
                let actions = self.playback.play();
                self.run_playback_actions(actions);
            }
            Command::Pause => {
                let actions = self.playback.pause();
                self.run_playback_actions(actions);
            }
            Command::Stop => {
                let actions = self.playback.stop();
                self.run_playback_actions(actions);
            }
            Command::Next => {
                let actions = self.playback.next();
                self.run_playback_actions(actions);
            }
            Command::Previous => {
                let actions = self.playback.previous();
                self.run_playback_actions(actions);
            }
            Command::JumpToPage(page) => {
                let words_per_page = self.settings.get().words_per_page;
                let actions = self.playback.jump_to_page(page, words_per_page);
                self.run_playback_actions(actions);
            }
            Command::JumpToBookmark(id) => match self.bookmarks.jump_target(&id) {
                Some((segment_index, position_secs)) => {
                    let actions = self.playback.jump_to_segment(segment_index, position_secs);
                    self.run_playback_actions(actions);
                }
                None => self.notify(ReaderError::InvalidInput(format!("no bookmark {id}"))),
            },
            Command::CreateBookmark { note } => self.create_bookmark(&note),
            Command::DeleteBookmark(id) => self.delete_bookmark(id),
            Command::RefreshBookmarks => self.refresh_bookmarks(),
            Command::Ask(question) => self.ask(&question),
            Command::RefreshVoices => {
                self.spawn(|api| Message::VoicesLoaded(api.list_voices()));
            }
            Command::SetVoice(voice) => {
                if let Err(err) = self.set_voice(voice) {
                    self.notify(err);
                }
            }
            Command::ToggleDarkMode => {
                let result = self.settings.toggle_dark_mode();
                self.notify_on_error(result);
            }
            Command::SetFontSize(size) => {
                let result = self.settings.set_font_size(size);
                self.notify_on_error(result);
            }
            Command::SetWordsPerPage(words) => {
                let result = self.settings.set_words_per_page(words);
                self.notify_on_error(result);
            }
            Command::SetPlaybackSpeed(speed) => {
                let result = self.settings.set_playback_speed(speed);
                self.playback
                    .set_playback_speed(self.settings.get().playback_speed);
                self.notify_on_error(result);
            }
            Command::DismissNotice(id) => self.dismiss_notice(id),
        }
    }

    /// Select the synthesis voice. Once the voice list has been fetched,
    /// unknown ids are rejected.
    pub fn set_voice(&mut self, voice: Option<String>) -> Result<()> {
        if let Some(id) = voice.as_deref() {
            if !self.voices.is_empty() && !self.voices.iter().any(|v| v.id == id) {
                return Err(ReaderError::InvalidInput(format!("unknown voice {id}")));
            }
        }
        self.settings.set_selected_voice(voice)
    }

    pub fn dismiss_notice(&mut self, id: u64) {
        self.notices.retain(|notice| notice.id != id);
    }

    /// Process everything that has already arrived without blocking.
    /// Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.device_rx.try_recv() {
            let actions = self.playback.on_device_event(event);
            self.run_playback_actions(actions);
            handled += 1;
        }
        while let Ok(message) = self.inbox_rx.try_recv() {
            self.handle_message(message);
            handled += 1;
        }
        self.assistant.poll_audio();
        handled
    }

    /// Wait up to `timeout` for a worker result, then pump.
    pub fn wait(&mut self, timeout: Duration) -> usize {
        let mut handled = 0;
        match self.inbox_rx.recv_timeout(timeout) {
            Ok(message) => {
                self.handle_message(message);
                handled += 1;
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
        handled + self.pump()
    }

    /// Pump until no worker request is outstanding. Returns false if
    /// `timeout` elapsed first.
    pub fn pump_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.in_flight == 0 {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.wait(remaining.min(Duration::from_millis(10)));
        }
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce(&A) -> Message + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let tx = self.inbox_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let message = job(api.as_ref());
            let _ = tx.send(message);
        });
    }

    fn run_playback_actions(&mut self, actions: Vec<PlaybackAction>) {
        let mut queue = VecDeque::from(actions);
        while let Some(action) = queue.pop_front() {
            match action {
                PlaybackAction::Synthesize {
                    request_id,
                    segment_index,
                    text,
                } => {
                    let voice = self.settings.get().selected_voice.clone();
                    if let Some(audio) = self.cached_audio(&text, voice.as_deref()) {
                        let follow_up =
                            self.playback
                                .on_synthesis(request_id, segment_index, Ok(audio));
                        queue.extend(follow_up);
                        continue;
                    }
                    self.spawn(move |api| {
                        let result = api.text_to_speech(&text, voice.as_deref());
                        Message::SpeechReady {
                            request_id,
                            segment_index,
                            text,
                            voice,
                            result,
                        }
                    });
                }
                PlaybackAction::SegmentChanged { segment_index } => {
                    self.save_progress(segment_index, 0.0);
                }
                PlaybackAction::Paused {
                    segment_index,
                    position_secs,
                } => self.save_progress(segment_index, position_secs),
                PlaybackAction::Finished => {
                    info!("Finished reading document");
                    self.finished = true;
                }
                PlaybackAction::Failed(err) => self.notify(err),
            }
        }
    }

    fn cached_audio(&self, text: &str, voice: Option<&str>) -> Option<SynthesizedAudio> {
        let bytes = self.cache.as_ref()?.load(text, voice)?;
        match SynthesizedAudio::from_wav(bytes) {
            Ok(audio) => Some(audio),
            Err(err) => {
                warn!("Ignoring unreadable cached audio: {err}");
                None
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match message {
            Message::DocumentUploaded(Ok(uploaded)) => {
                self.load_document(uploaded.into_document());
            }
            Message::DocumentUploaded(Err(err)) => self.notify(err),
            Message::SpeechReady {
                request_id,
                segment_index,
                text,
                voice,
                result,
            } => {
                let result = result.and_then(SynthesizedAudio::from_wav);
                if let (Ok(audio), Some(cache)) = (&result, &self.cache) {
                    cache.store(&text, voice.as_deref(), audio.bytes());
                }
                let actions = self.playback.on_synthesis(request_id, segment_index, result);
                self.run_playback_actions(actions);
            }
            Message::VoicesLoaded(Ok(voices)) => {
                info!(count = voices.len(), "Loaded voices");
                if let Some(selected) = self.settings.get().selected_voice.as_deref() {
                    if !voices.iter().any(|voice| voice.id == selected) {
                        warn!(voice = selected, "Selected voice is not offered by the server");
                    }
                }
                self.voices = voices;
            }
            Message::VoicesLoaded(Err(err)) => self.notify(err),
            Message::AnswerReady {
                ask_id,
                question,
                result,
            } => match result {
                Ok(answer) => self.on_answer(ask_id, question, answer),
                Err(err) => self.notify(err),
            },
            Message::AnswerSpeechReady { ask_id, result } => {
                let spoken = result
                    .and_then(SynthesizedAudio::from_wav)
                    .map_err(ReaderError::into_synthesis_failure)
                    .and_then(|audio| self.assistant.speak(ask_id, audio));
                self.notify_on_error(spoken);
            }
            Message::BookmarksListed { session_id, result } => match result {
                Ok(listed) => self.bookmarks.apply_listed(&session_id, listed),
                Err(err) => self.notify(err),
            },
            Message::BookmarkCreated { session_id, result } => match result {
                Ok(created) => self.bookmarks.apply_created(&session_id, created),
                Err(err) => self.notify(err),
            },
            Message::BookmarkDeleted {
                session_id,
                bookmark_id,
                result,
            } => match result {
                Ok(()) => self.bookmarks.apply_deleted(&session_id, &bookmark_id),
                Err(err) => self.notify(err),
            },
            Message::ProgressSaved { session_id, result } => {
                if let Err(err) = result {
                    warn!(session = %session_id, "Failed to save reading progress: {err}");
                }
            }
        }
    }

    fn on_answer(&mut self, ask_id: u64, question: String, answer: String) {
        if !self.assistant.record_answer(ask_id, question, answer.clone()) {
            return;
        }
        info!(ask_id, chars = answer.len(), "Assistant answered");
        if !self.config.speak_answers {
            return;
        }
        let Some(voice) = self.settings.get().selected_voice.clone() else {
            return;
        };
        self.spawn(move |api| Message::AnswerSpeechReady {
            ask_id,
            result: api.text_to_speech(&answer, Some(&voice)),
        });
    }

    fn ask(&mut self, question: &str) {
        match self.assistant.prepare(self.playback.segments(), question) {
            Ok(prepared) => self.spawn(move |api| Message::AnswerReady {
                ask_id: prepared.ask_id,
                result: api.ask_question(
                    &prepared.session_id,
                    &prepared.question,
                    &prepared.context,
                ),
                question: prepared.question,
            }),
            Err(err) => self.notify(err),
        }
    }

    fn refresh_bookmarks(&mut self) {
        let Some(session_id) = self.bookmarks.session_id().map(str::to_string) else {
            return;
        };
        self.spawn(move |api| Message::BookmarksListed {
            result: api.list_bookmarks(&session_id),
            session_id,
        });
    }

    fn create_bookmark(&mut self, note: &str) {
        let state = self.playback.state();
        let prepared = self.bookmarks.prepare(
            self.playback.segments(),
            state.active_segment,
            state.position_secs,
            note,
        );
        match prepared {
            Ok((session_id, draft)) => self.spawn(move |api| Message::BookmarkCreated {
                result: api.create_bookmark(&session_id, &draft),
                session_id,
            }),
            Err(err) => self.notify(err),
        }
    }

    fn delete_bookmark(&mut self, bookmark_id: String) {
        let Some(session_id) = self.bookmarks.session_id().map(str::to_string) else {
            self.notify(ReaderError::InvalidInput("no document is loaded".into()));
            return;
        };
        self.spawn(move |api| Message::BookmarkDeleted {
            result: api.delete_bookmark(&session_id, &bookmark_id),
            session_id,
            bookmark_id,
        });
    }

    fn save_progress(&mut self, segment_index: usize, position_secs: f64) {
        let Some(session_id) = self.playback.segments().session_id().map(str::to_string) else {
            return;
        };
        let progress = SessionProgress {
            current_segment: segment_index,
            current_position: position_secs,
        };
        self.spawn(move |api| Message::ProgressSaved {
            result: api.save_progress(&session_id, &progress),
            session_id,
        });
    }

    fn notify(&mut self, err: ReaderError) {
        warn!(kind = err.kind(), "{err}");
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push_back(Notice {
            id,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    fn notify_on_error(&mut self, result: Result<()>) {
        if let Err(err) = result {
            self.notify(err);
        }
    }
}
