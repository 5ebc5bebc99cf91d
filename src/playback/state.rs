use serde::Serialize;

/// Lifecycle of the single playable resource.
///
/// `Ended` is only observed between the device reporting completion and the
/// segment-advance rule running; a settled controller is never left in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PlaybackPhase {
    Idle,
    Loading { segment_index: usize, request_id: u64 },
    Playing,
    Paused,
    Ended,
}

impl PlaybackPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Playing, or about to be: navigation keeps going in this case.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Loading { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        }
    }
}

/// Read-only view of the playback controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub active_segment: usize,
    pub phase: PlaybackPhase,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub highlighted_word: Option<usize>,
}
