use serde::{Deserialize, Serialize};

use super::score::{JudgmentCounts, ScoreState};

/// Which completion signal finished the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every note was resolved.
    AllNotesResolved,
    /// The playback clock reported the end of the track.
    TrackFinished,
    /// Effective time passed the expected track end plus the grace period.
    GraceTimeout,
}

/// The part of a result handed to score persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub score: u64,
    pub max_combo: u32,
    pub judgment_counts: JudgmentCounts,
}

impl From<&ScoreState> for ResultPayload {
    fn from(state: &ScoreState) -> Self {
        Self {
            score: state.score,
            max_combo: state.max_combo,
            judgment_counts: state.judgment_counts,
        }
    }
}

/// Final outcome of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub song_id: String,
    pub difficulty_id: String,
    pub score: u64,
    pub max_combo: u32,
    pub judgment_counts: JudgmentCounts,
    pub is_new_record: bool,
    pub finish_reason: FinishReason,
    /// Notes still pending when the session finished. They are not part of
    /// `judgment_counts` unless the session forced them to MISS.
    pub unresolved_notes: usize,
    /// The session finished on a wall-clock estimate of the playback
    /// position because the clock had stalled.
    pub position_estimated: bool,
}

impl SessionResult {
    pub fn payload(&self) -> ResultPayload {
        ResultPayload {
            score: self.score,
            max_combo: self.max_combo,
            judgment_counts: self.judgment_counts,
        }
    }
}

/// A score is a new record when nothing is stored yet or it ties or beats
/// the stored best.
pub fn is_new_record(previous_best: Option<u64>, score: u64) -> bool {
    previous_best.is_none_or(|best| score >= best)
}
