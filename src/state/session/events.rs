use crate::model::note::{Lane, NoteId};
use crate::play::judge::Tier;
use crate::play::session_result::SessionResult;

/// Inbound events, processed one at a time by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// The playback clock reported a new position.
    ClockTick { position_ms: f64 },
    /// The playback clock reached the end of the track.
    ClockFinished,
    /// The player tapped a lane.
    Tap { lane: Lane },
}

/// One resolved note.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentEvent {
    pub note_id: NoteId,
    pub lane: Lane,
    pub tier: Tier,
    /// `effective_time - hit_time` when the note was resolved.
    pub delta_ms: f64,
    pub combo_after: u32,
    pub score_delta: u64,
}

/// Outbound events for rendering, effects and result screens.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Judgment(JudgmentEvent),
    Finished(SessionResult),
}

impl EngineEvent {
    pub fn as_judgment(&self) -> Option<&JudgmentEvent> {
        match self {
            Self::Judgment(judgment) => Some(judgment),
            Self::Finished(_) => None,
        }
    }

    pub fn as_result(&self) -> Option<&SessionResult> {
        match self {
            Self::Finished(result) => Some(result),
            Self::Judgment(_) => None,
        }
    }
}
