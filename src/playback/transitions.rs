use super::PlaybackController;
use super::state::PlaybackPhase;
use crate::audio::{AudioHandle, AudioOutput, DeviceEvent, DeviceSignal, SynthesizedAudio};
use crate::error::{ReaderError, Result};
use crate::pagination;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub(super) enum PlaybackEvent {
    PlayRequested,
    PauseRequested,
    ToggleRequested,
    StopRequested,
    NextRequested,
    PreviousRequested,
    PageJumpRequested {
        page: usize,
        words_per_page: usize,
    },
    SynthesisFinished {
        request_id: u64,
        segment_index: usize,
        result: Result<SynthesizedAudio>,
    },
    Device(DeviceEvent),
}

/// Side effects the owner of the controller must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackAction {
    /// Fetch audio for `text` and report back with the same ids.
    Synthesize {
        request_id: u64,
        segment_index: usize,
        text: String,
    },
    SegmentChanged { segment_index: usize },
    Paused {
        segment_index: usize,
        position_secs: f64,
    },
    /// The last segment finished playing.
    Finished,
    Failed(ReaderError),
}

pub(super) fn transition<O: AudioOutput>(
    ctl: &mut PlaybackController<O>,
    event: PlaybackEvent,
) -> Vec<PlaybackAction> {
    match event {
        PlaybackEvent::PlayRequested => on_play(ctl),
        PlaybackEvent::PauseRequested => on_pause(ctl),
        PlaybackEvent::ToggleRequested => match ctl.phase {
            PlaybackPhase::Playing if ctl.handle.is_some() => on_pause(ctl),
            _ => on_play(ctl),
        },
        PlaybackEvent::StopRequested => on_stop(ctl),
        PlaybackEvent::NextRequested => {
            if ctl.segments.is_empty() || ctl.segments.is_last() {
                debug!("Already at last segment; ignoring next");
                return Vec::new();
            }
            let target = ctl.segments.active_index() + 1;
            navigate_to(ctl, target)
        }
        PlaybackEvent::PreviousRequested => {
            if ctl.segments.is_empty() || ctl.segments.is_first() {
                debug!("Already at first segment; ignoring previous");
                return Vec::new();
            }
            let target = ctl.segments.active_index() - 1;
            navigate_to(ctl, target)
        }
        PlaybackEvent::PageJumpRequested {
            page,
            words_per_page,
        } => {
            let Some(target) =
                pagination::jump_target(ctl.segments.word_counts(), page, words_per_page)
            else {
                debug!(page, "No document loaded; ignoring page jump");
                return Vec::new();
            };
            info!(
                requested = page,
                page = target.page,
                segment = target.segment_index,
                word_offset = target.word_offset,
                "Jumping to page"
            );
            navigate_to(ctl, target.segment_index)
        }
        PlaybackEvent::SynthesisFinished {
            request_id,
            segment_index,
            result,
        } => on_synthesis_finished(ctl, request_id, segment_index, result),
        PlaybackEvent::Device(event) => on_device_event(ctl, event),
    }
}

fn on_play<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    match ctl.phase {
        PlaybackPhase::Playing => Vec::new(),
        PlaybackPhase::Loading {
            segment_index,
            request_id,
        } => {
            info!(
                segment = segment_index,
                request_id, "Skipping duplicate play request while synthesis is in progress"
            );
            Vec::new()
        }
        _ => {
            if ctl.handle.is_some() {
                resume(ctl)
            } else {
                begin_loading(ctl)
            }
        }
    }
}

fn resume<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    let position = ctl.position_secs;
    let resumed = match ctl.handle.as_mut() {
        Some(handle) => handle.play_from(position),
        None => return begin_loading(ctl),
    };
    match resumed {
        Ok(()) => {
            info!(
                segment = ctl.segments.active_index(),
                position_secs = position,
                "Resuming playback"
            );
            ctl.phase = PlaybackPhase::Playing;
            Vec::new()
        }
        Err(err) => fail(ctl, err),
    }
}

fn on_pause<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    match ctl.phase {
        PlaybackPhase::Playing => {
            let Some(handle) = ctl.handle.as_mut() else {
                ctl.phase = PlaybackPhase::Idle;
                return Vec::new();
            };
            ctl.position_secs = handle.pause();
            ctl.refresh_highlight();
            ctl.phase = PlaybackPhase::Paused;
            info!(
                segment = ctl.segments.active_index(),
                position_secs = ctl.position_secs,
                "Paused playback"
            );
            vec![PlaybackAction::Paused {
                segment_index: ctl.segments.active_index(),
                position_secs: ctl.position_secs,
            }]
        }
        PlaybackPhase::Loading { request_id, .. } => {
            info!(request_id, "Pause requested while loading; dropping request");
            ctl.invalidate_requests();
            ctl.phase = PlaybackPhase::Idle;
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_stop<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    if ctl.phase == PlaybackPhase::Idle && ctl.handle.is_none() && ctl.position_secs == 0.0 {
        return Vec::new();
    }
    info!(segment = ctl.segments.active_index(), "Stopping playback");
    ctl.release_handle();
    ctl.invalidate_requests();
    ctl.reset_position();
    ctl.phase = PlaybackPhase::Idle;
    Vec::new()
}

/// Leave the current segment for `target`, keeping playback going if it was.
fn navigate_to<O: AudioOutput>(
    ctl: &mut PlaybackController<O>,
    target: usize,
) -> Vec<PlaybackAction> {
    let was_active = ctl.phase.is_active();
    ctl.release_handle();
    ctl.invalidate_requests();
    ctl.reset_position();
    ctl.phase = PlaybackPhase::Idle;

    let mut actions = Vec::new();
    if ctl.segments.set_active_clamped(target) {
        info!(segment = ctl.segments.active_index(), "Active segment changed");
        actions.push(PlaybackAction::SegmentChanged {
            segment_index: ctl.segments.active_index(),
        });
    }
    if was_active {
        actions.extend(begin_loading(ctl));
    }
    actions
}

fn begin_loading<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    let segment_index = ctl.segments.active_index();
    let Some(text) = ctl.segments.active_text() else {
        debug!("No document loaded; ignoring play request");
        return Vec::new();
    };
    if text.trim().is_empty() {
        warn!(segment = segment_index, "Segment has no speakable text");
        ctl.phase = PlaybackPhase::Idle;
        return vec![PlaybackAction::Failed(ReaderError::SynthesisFailed(format!(
            "segment {} has no speakable text",
            segment_index + 1
        )))];
    }
    let text = text.to_string();

    ctl.request_id = ctl.request_id.wrapping_add(1);
    let request_id = ctl.request_id;
    ctl.phase = PlaybackPhase::Loading {
        segment_index,
        request_id,
    };
    info!(
        segment = segment_index,
        request_id,
        position_secs = ctl.position_secs,
        "Requesting synthesis for segment"
    );
    vec![PlaybackAction::Synthesize {
        request_id,
        segment_index,
        text,
    }]
}

fn on_synthesis_finished<O: AudioOutput>(
    ctl: &mut PlaybackController<O>,
    request_id: u64,
    segment_index: usize,
    result: Result<SynthesizedAudio>,
) -> Vec<PlaybackAction> {
    let expected = PlaybackPhase::Loading {
        segment_index,
        request_id,
    };
    if ctl.phase != expected {
        debug!(
            request_id,
            segment = segment_index,
            current = ctl.request_id,
            "Ignoring stale synthesis result"
        );
        return Vec::new();
    }

    let audio = match result {
        Ok(audio) => audio,
        Err(err) => return fail(ctl, err.into_synthesis_failure()),
    };

    // A handle can only be present here if something skipped the release
    // on navigation; never let two coexist.
    ctl.release_handle();

    let handle_id = ctl.next_handle_id;
    ctl.next_handle_id = ctl.next_handle_id.wrapping_add(1);
    let duration_secs = audio.duration_secs();
    let sink = match ctl.output.open(handle_id, audio, ctl.device_events.clone()) {
        Ok(sink) => sink,
        Err(err) => return fail(ctl, err),
    };
    let mut handle = AudioHandle::new(handle_id, segment_index, duration_secs, sink);
    handle.set_speed(ctl.speed);

    ctl.duration_secs = Some(duration_secs);
    ctl.position_secs = ctl.position_secs.clamp(0.0, duration_secs);
    if let Err(err) = handle.play_from(ctl.position_secs) {
        handle.release();
        return fail(ctl, err);
    }
    ctl.handle = Some(handle);
    ctl.phase = PlaybackPhase::Playing;
    ctl.refresh_highlight();
    info!(
        segment = segment_index,
        handle = handle_id,
        duration_secs,
        position_secs = ctl.position_secs,
        "Playback started"
    );
    Vec::new()
}

fn on_device_event<O: AudioOutput>(
    ctl: &mut PlaybackController<O>,
    event: DeviceEvent,
) -> Vec<PlaybackAction> {
    let current = ctl.handle.as_ref().map(AudioHandle::id);
    if current != Some(event.handle) {
        debug!(
            handle = event.handle,
            current = ?current,
            "Ignoring stale device event"
        );
        return Vec::new();
    }

    match event.signal {
        DeviceSignal::TimeUpdate {
            position_secs,
            duration_secs,
        } => {
            if ctl.phase != PlaybackPhase::Playing {
                debug!(position_secs, "Ignoring tick while not playing");
                return Vec::new();
            }
            let duration_secs = if duration_secs.is_finite() && duration_secs > 0.0 {
                duration_secs
            } else {
                ctl.duration_secs.unwrap_or(0.0)
            };
            ctl.duration_secs = Some(duration_secs);
            ctl.position_secs = position_secs.clamp(0.0, duration_secs);
            ctl.refresh_highlight();
            Vec::new()
        }
        DeviceSignal::Ended => {
            // The ticker can report the end of a stream that was paused
            // a moment before it drained.
            if ctl.phase != PlaybackPhase::Playing {
                debug!(phase = ctl.phase.label(), "Ignoring end-of-stream while not playing");
                return Vec::new();
            }
            on_ended(ctl)
        }
        DeviceSignal::Error(message) => {
            warn!(handle = event.handle, %message, "Audio device reported an error");
            ctl.release_handle();
            fail(ctl, ReaderError::PlaybackDevice(message))
        }
    }
}

/// Segment-advance rule.
fn on_ended<O: AudioOutput>(ctl: &mut PlaybackController<O>) -> Vec<PlaybackAction> {
    ctl.phase = PlaybackPhase::Ended;
    ctl.release_handle();
    let finished = ctl.segments.active_index();
    info!(segment = finished, "Segment finished");

    if ctl.segments.is_last() {
        ctl.reset_position();
        ctl.phase = PlaybackPhase::Idle;
        info!("Reached end of document");
        return vec![PlaybackAction::Finished];
    }

    ctl.segments.set_active_clamped(finished + 1);
    ctl.reset_position();
    ctl.phase = PlaybackPhase::Idle;
    let mut actions = vec![PlaybackAction::SegmentChanged {
        segment_index: ctl.segments.active_index(),
    }];
    if ctl.continuous {
        actions.extend(begin_loading(ctl));
    }
    actions
}

/// Surface a failure without touching the active segment or position.
fn fail<O: AudioOutput>(ctl: &mut PlaybackController<O>, err: ReaderError) -> Vec<PlaybackAction> {
    warn!(
        segment = ctl.segments.active_index(),
        kind = err.kind(),
        error = %err,
        "Playback failed"
    );
    ctl.release_handle();
    ctl.phase = PlaybackPhase::Idle;
    vec![PlaybackAction::Failed(err)]
}
