//! Audio playback controller.
//!
//! Owns the segment store and at most one [`AudioHandle`]. Every input, user
//! request or asynchronous completion alike, is fed through
//! [`transitions::transition`], which mutates the controller and returns the
//! [`PlaybackAction`]s its owner has to execute (synthesis requests, progress
//! saves, error notices).
//!
//! Late arrivals are filtered rather than cancelled: synthesis results carry
//! the request id they were issued with, and device events carry the id of
//! the handle that produced them. Anything that no longer matches is dropped.

mod state;
mod transitions;

pub use state::{PlaybackPhase, PlaybackState};
pub use transitions::PlaybackAction;

use crate::audio::{AudioHandle, AudioOutput, DeviceEvent, HandleId, SynthesizedAudio};
use crate::document::{Document, SegmentStore};
use crate::error::Result;
use crate::pagination::{self, PageState};
use crate::text_utils::highlight_index;
use std::sync::mpsc::Sender;
use tracing::info;
use transitions::{PlaybackEvent, transition};

pub struct PlaybackController<O: AudioOutput> {
    output: O,
    device_events: Sender<DeviceEvent>,
    segments: SegmentStore,
    handle: Option<AudioHandle>,
    phase: PlaybackPhase,
    position_secs: f64,
    duration_secs: Option<f64>,
    highlighted_word: Option<usize>,
    request_id: u64,
    next_handle_id: HandleId,
    continuous: bool,
    speed: f32,
}

impl<O: AudioOutput> PlaybackController<O> {
    /// `device_events` is handed to every sink this controller opens; route
    /// what arrives on its receiver back into [`Self::on_device_event`].
    pub fn new(output: O, device_events: Sender<DeviceEvent>, continuous: bool) -> Self {
        Self {
            output,
            device_events,
            segments: SegmentStore::new(),
            handle: None,
            phase: PlaybackPhase::Idle,
            position_secs: 0.0,
            duration_secs: None,
            highlighted_word: None,
            request_id: 0,
            next_handle_id: 1,
            continuous,
            speed: 1.0,
        }
    }

    /// Replace the document. Any playback of the old one is torn down first.
    pub fn load_document(&mut self, document: Document) {
        self.release_handle();
        self.invalidate_requests();
        self.reset_position();
        self.phase = PlaybackPhase::Idle;
        info!(
            session = %document.session_id,
            segments = document.segments.len(),
            "Loaded document into playback controller"
        );
        self.segments.load(document);
    }

    pub fn play(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::PlayRequested)
    }

    pub fn pause(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::PauseRequested)
    }

    /// Start if nothing is loaded, otherwise flip between playing and paused.
    pub fn toggle_play_pause(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::ToggleRequested)
    }

    pub fn stop(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::StopRequested)
    }

    pub fn next(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::NextRequested)
    }

    pub fn previous(&mut self) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::PreviousRequested)
    }

    pub fn jump_to_page(&mut self, page: usize, words_per_page: usize) -> Vec<PlaybackAction> {
        transition(
            self,
            PlaybackEvent::PageJumpRequested {
                page,
                words_per_page,
            },
        )
    }

    /// Navigate straight to a position inside a segment, e.g. a bookmark.
    /// Out-of-range indices clamp to the last segment; the position is
    /// clamped to the audio duration once it is known.
    pub fn jump_to_segment(
        &mut self,
        segment_index: usize,
        position_secs: f64,
    ) -> Vec<PlaybackAction> {
        let was_active = self.phase.is_active();
        let mut actions = self.stop();
        if self.segments.set_active_clamped(segment_index) {
            actions.push(PlaybackAction::SegmentChanged {
                segment_index: self.segments.active_index(),
            });
        }
        if position_secs.is_finite() {
            self.position_secs = position_secs.max(0.0);
        }
        if was_active {
            actions.extend(self.play());
        }
        actions
    }

    pub fn on_synthesis(
        &mut self,
        request_id: u64,
        segment_index: usize,
        result: Result<SynthesizedAudio>,
    ) -> Vec<PlaybackAction> {
        transition(
            self,
            PlaybackEvent::SynthesisFinished {
                request_id,
                segment_index,
                result,
            },
        )
    }

    pub fn on_device_event(&mut self, event: DeviceEvent) -> Vec<PlaybackAction> {
        transition(self, PlaybackEvent::Device(event))
    }

    pub fn segments(&self) -> &SegmentStore {
        &self.segments
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn has_live_audio(&self) -> bool {
        self.handle.is_some()
    }

    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    /// Rate applied to the live sink and to every sink opened later.
    pub fn set_playback_speed(&mut self, speed: f32) {
        if speed == self.speed {
            return;
        }
        self.speed = speed;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_speed(speed);
        }
        info!(speed, "Adjusted playback speed");
    }

    pub fn playback_speed(&self) -> f32 {
        self.speed
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            active_segment: self.segments.active_index(),
            phase: self.phase,
            is_playing: self.is_playing(),
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            highlighted_word: self.highlighted_word,
        }
    }

    pub fn page_state(&self, words_per_page: usize) -> PageState {
        pagination::page_state(
            self.segments.word_counts(),
            self.segments.active_index(),
            self.highlighted_word,
            words_per_page,
        )
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
        self.duration_secs = None;
    }

    /// Make every in-flight synthesis result stale.
    fn invalidate_requests(&mut self) {
        self.request_id = self.request_id.wrapping_add(1);
    }

    fn reset_position(&mut self) {
        self.position_secs = 0.0;
        self.highlighted_word = None;
    }

    fn refresh_highlight(&mut self) {
        self.highlighted_word = self.duration_secs.and_then(|duration| {
            highlight_index(
                self.position_secs,
                duration,
                self.segments.active_word_count(),
            )
        });
    }
}
