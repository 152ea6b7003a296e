use std::fmt;

use serde::{Deserialize, Serialize};

use crate::play::judge::Tier;

/// Lane index as authored. Values outside the playfield are kept as-is.
pub type Lane = i64;

/// Authored note kind. Hold and slide notes are judged like taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Tap,
    Hold,
    Slide,
}

/// Identifier of a runtime note, unique within one session.
///
/// Formatted as `{song_id}-{difficulty_id}-{index}` where `index` is the
/// note's position in the sorted beatmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(song_id: &str, difficulty_id: &str, index: usize) -> Self {
        Self(format!("{song_id}-{difficulty_id}-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Judgment status of a runtime note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    #[default]
    Pending,
    Hit,
    Missed,
}

impl NoteStatus {
    /// Status a pending note takes when resolved with `tier`.
    pub fn resolved_by(tier: Tier) -> Self {
        if tier == Tier::Miss {
            Self::Missed
        } else {
            Self::Hit
        }
    }

    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

/// A note during play.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub lane: Lane,
    /// Authored time plus the beatmap offset, in milliseconds.
    pub hit_time_ms: f64,
    pub status: NoteStatus,
}

impl Note {
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Signed distance of `effective_time_ms` from this note.
    /// Positive means the note is already behind the judgment line.
    pub fn delta_ms(&self, effective_time_ms: f64) -> f64 {
        effective_time_ms - self.hit_time_ms
    }
}
