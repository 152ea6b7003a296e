use tracing::debug;

use super::judge_window::{JudgeWindow, Tier};
use crate::model::note::{Lane, NoteId};
use crate::model::timeline::NoteTimeline;

/// The note a tap selected, before it is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TapMatch {
    pub note_id: NoteId,
    /// `effective_time - hit_time`; negative for early taps.
    pub delta_ms: f64,
    index: usize,
}

/// A note resolved by a tap or by the miss sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub note_id: NoteId,
    pub lane: Lane,
    pub tier: Tier,
    pub delta_ms: f64,
}

/// Matches taps and clock sweeps against a [`NoteTimeline`].
///
/// Holds no scoring state; the only state it touches is the timeline passed
/// in, and every resolution goes through the timeline's single-shot
/// transition, so a tap and a sweep racing for one note resolve it once.
#[derive(Debug, Clone, Copy, Default)]
pub struct JudgmentEngine {
    window: JudgeWindow,
}

impl JudgmentEngine {
    pub fn new(window: JudgeWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &JudgeWindow {
        &self.window
    }

    pub fn classify(&self, delta_ms: f64) -> Tier {
        self.window.classify(delta_ms)
    }

    /// Select the pending note in `lane` closest to `effective_time_ms`.
    ///
    /// Only notes within the GOOD window are candidates. The strictly
    /// smallest `|delta|` wins; on an exact tie the note found first in
    /// timeline order is kept. Returns `None` for a wasted tap.
    pub fn match_tap(
        &self,
        timeline: &NoteTimeline,
        lane: Lane,
        effective_time_ms: f64,
    ) -> Option<TapMatch> {
        let mut best: Option<(usize, &NoteId, f64)> = None;

        for (index, note) in timeline.pending_entries_in_lane(lane) {
            let delta = note.delta_ms(effective_time_ms);
            if !self.window.admits(delta) {
                continue;
            }
            if best.is_none_or(|(_, _, best_delta)| delta.abs() < best_delta.abs()) {
                best = Some((index, &note.id, delta));
            }
        }

        best.map(|(index, id, delta_ms)| TapMatch {
            note_id: id.clone(),
            delta_ms,
            index,
        })
    }

    /// Match a tap and resolve the selected note.
    pub fn judge_tap(
        &self,
        timeline: &mut NoteTimeline,
        lane: Lane,
        effective_time_ms: f64,
    ) -> Option<Resolution> {
        let Some(matched) = self.match_tap(timeline, lane, effective_time_ms) else {
            debug!(lane, effective_time_ms, "tap matched no pending note");
            return None;
        };

        // Admission equals the GOOD boundary, so this is never a miss.
        let tier = self.classify(matched.delta_ms);
        if !timeline.resolve_index(matched.index, tier) {
            return None;
        }

        Some(Resolution {
            note_id: matched.note_id,
            lane,
            tier,
            delta_ms: matched.delta_ms,
        })
    }

    /// Resolve as MISS every pending note whose window has fully elapsed.
    ///
    /// Notes whose window is still open are never touched. Returns the
    /// misses in timeline order.
    pub fn sweep_misses(
        &self,
        timeline: &mut NoteTimeline,
        effective_time_ms: f64,
    ) -> Vec<Resolution> {
        let mut missed = Vec::new();

        for index in timeline.settled_prefix()..timeline.len() {
            let note = &timeline.notes()[index];
            let delta = note.delta_ms(effective_time_ms);
            // Hit times ascend, so every later note is still open too.
            if !self.window.has_elapsed(delta) {
                break;
            }
            if !note.is_pending() {
                continue;
            }

            let note_id = note.id.clone();
            let lane = note.lane;
            let tier = self.classify(delta);
            if timeline.resolve_index(index, tier) {
                missed.push(Resolution {
                    note_id,
                    lane,
                    tier,
                    delta_ms: delta,
                });
            }
        }

        missed
    }
}
