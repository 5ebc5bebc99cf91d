//! Question answering over the text around the active segment.
//!
//! Spoken answers play on the assistant's own audio resource. It never
//! touches the playback controller, so an answer can overlap the document
//! being read aloud.

use crate::audio::{AudioHandle, AudioOutput, DeviceEvent, DeviceSignal, HandleId, SynthesizedAudio};
use crate::document::SegmentStore;
use crate::error::{ReaderError, Result};
use crate::text_utils::preview;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

/// Join the active segment with at most one neighbour on each side.
pub fn build_context(segments: &[String], active: usize) -> String {
    if segments.is_empty() {
        return String::new();
    }
    let start = active.saturating_sub(1);
    let end = (active + 2).min(segments.len());
    if start >= end {
        return String::new();
    }
    segments[start..end].join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// A validated question ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub ask_id: u64,
    pub session_id: String,
    pub question: String,
    pub context: String,
}

pub struct AssistantSession<O: AudioOutput> {
    output: O,
    events_tx: Sender<DeviceEvent>,
    events_rx: Receiver<DeviceEvent>,
    handle: Option<AudioHandle>,
    next_handle_id: HandleId,
    ask_id: u64,
    history: Vec<Exchange>,
}

impl<O: AudioOutput> AssistantSession<O> {
    pub fn new(output: O) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            output,
            events_tx,
            events_rx,
            handle: None,
            next_handle_id: 1,
            ask_id: 0,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn is_speaking(&self) -> bool {
        self.handle.is_some()
    }

    /// Validate `question` and capture the context window around the active
    /// segment. Each call supersedes earlier questions.
    pub fn prepare(&mut self, segments: &SegmentStore, question: &str) -> Result<Question> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ReaderError::InvalidInput("question is empty".into()));
        }
        let Some(session_id) = segments.session_id() else {
            return Err(ReaderError::InvalidInput("no document is loaded".into()));
        };
        self.ask_id = self.ask_id.wrapping_add(1);
        let context = build_context(segments.segments(), segments.active_index());
        info!(
            ask_id = self.ask_id,
            segment = segments.active_index(),
            question = %preview(question, 60),
            context_chars = context.len(),
            "Prepared assistant question"
        );
        Ok(Question {
            ask_id: self.ask_id,
            session_id: session_id.to_string(),
            question: question.to_string(),
            context,
        })
    }

    /// Record an answer. Returns false if a newer question has been asked
    /// since, in which case the answer is dropped.
    pub fn record_answer(&mut self, ask_id: u64, question: String, answer: String) -> bool {
        if ask_id != self.ask_id {
            debug!(ask_id, current = self.ask_id, "Ignoring stale assistant answer");
            return false;
        }
        self.history.push(Exchange { question, answer });
        true
    }

    /// Play a spoken answer once, replacing any answer still playing.
    pub fn speak(&mut self, ask_id: u64, audio: SynthesizedAudio) -> Result<()> {
        if ask_id != self.ask_id {
            debug!(ask_id, current = self.ask_id, "Ignoring stale answer audio");
            return Ok(());
        }
        self.stop_speaking();
        let id = self.next_handle_id;
        self.next_handle_id = self.next_handle_id.wrapping_add(1);
        let duration_secs = audio.duration_secs();
        let sink = self.output.open(id, audio, self.events_tx.clone())?;
        let mut handle = AudioHandle::new(id, 0, duration_secs, sink);
        handle.play_from(0.0)?;
        info!(handle = id, duration_secs, "Speaking assistant answer");
        self.handle = Some(handle);
        Ok(())
    }

    pub fn stop_speaking(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }

    /// Drain device events for the answer resource, releasing it once it
    /// finishes or fails.
    pub fn poll_audio(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            let current = self.handle.as_ref().map(AudioHandle::id);
            if current != Some(event.handle) {
                continue;
            }
            match event.signal {
                DeviceSignal::TimeUpdate { .. } => {}
                DeviceSignal::Ended => {
                    debug!(handle = event.handle, "Assistant answer finished");
                    self.stop_speaking();
                }
                DeviceSignal::Error(message) => {
                    warn!(handle = event.handle, %message, "Assistant audio failed");
                    self.stop_speaking();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{FakeOutput, audio};
    use crate::document::Document;

    fn segments(texts: &[&str], active: usize) -> SegmentStore {
        let mut store = SegmentStore::new();
        store.load(Document::new(
            "s1",
            texts.iter().map(|s| s.to_string()).collect(),
        ));
        store.set_active_clamped(active);
        store
    }

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn context_spans_one_neighbour_each_side() {
        assert_eq!(build_context(&strings(&["A", "B", "C", "D"]), 2), "B C D");
        assert_eq!(build_context(&strings(&["A", "B", "C", "D"]), 0), "A B");
        assert_eq!(build_context(&strings(&["A", "B", "C", "D"]), 3), "C D");
        assert_eq!(build_context(&strings(&["only"]), 0), "only");
        assert_eq!(build_context(&[], 0), "");
    }

    #[test]
    fn empty_question_is_invalid() {
        let mut session = AssistantSession::new(FakeOutput::default());
        let err = session.prepare(&segments(&["A"], 0), "   ").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));
    }

    #[test]
    fn question_without_document_is_invalid() {
        let mut session = AssistantSession::new(FakeOutput::default());
        let err = session.prepare(&SegmentStore::new(), "why?").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));
    }

    #[test]
    fn newer_question_supersedes_older_answer() {
        let mut session = AssistantSession::new(FakeOutput::default());
        let store = segments(&["A", "B", "C", "D"], 2);
        let first = session.prepare(&store, "first?").expect("valid");
        let second = session.prepare(&store, "second?").expect("valid");
        assert_eq!(second.context, "B C D");
        assert!(!session.record_answer(first.ask_id, first.question, "old".into()));
        assert!(session.record_answer(second.ask_id, second.question, "new".into()));
        let answers: Vec<&str> = session
            .history()
            .iter()
            .map(|exchange| exchange.answer.as_str())
            .collect();
        assert_eq!(answers, vec!["new"]);
    }

    #[test]
    fn answer_audio_uses_its_own_resource() {
        let output = FakeOutput::default();
        let mut session = AssistantSession::new(output.clone());
        let question = session
            .prepare(&segments(&["A"], 0), "what?")
            .expect("valid");
        session.speak(question.ask_id, audio(1.0)).expect("spoken");
        session.speak(question.ask_id, audio(1.0)).expect("spoken again");
        assert!(session.is_speaking());
        assert_eq!(output.log.borrow().live, 1);
        session.stop_speaking();
        assert_eq!(output.log.borrow().live, 0);
    }
}
