//! Scripted taps that hit every note at its exact hit time.

use super::events::{EngineEvent, SessionEvent};
use super::session_controller::{SessionController, SessionState};
use crate::model::NoteTimeline;
use crate::model::note::Lane;
use crate::traits::{PlaybackClock, ScoreStore, TimeProvider};

/// Shortest tick step the driver accepts.
const MIN_TICK_MS: f64 = 1.0;

/// Pre-computed tap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScriptedTap {
    time_ms: f64,
    lane: Lane,
}

/// Tap events released in time order as effective time advances.
#[derive(Debug, Clone)]
pub struct ScriptedTaps {
    taps: Vec<ScriptedTap>,
    current_index: usize,
}

impl ScriptedTaps {
    /// One tap per note at its hit time.
    pub fn from_timeline(timeline: &NoteTimeline) -> Self {
        let mut taps: Vec<ScriptedTap> = timeline
            .notes()
            .iter()
            .map(|note| ScriptedTap {
                time_ms: note.hit_time_ms,
                lane: note.lane,
            })
            .collect();
        taps.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        Self {
            taps,
            current_index: 0,
        }
    }

    /// Release every tap due at or before `effective_time_ms`.
    pub fn poll_up_to(&mut self, effective_time_ms: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(tap) = self.taps.get(self.current_index) {
            if tap.time_ms > effective_time_ms {
                break;
            }
            events.push(SessionEvent::Tap { lane: tap.lane });
            self.current_index += 1;
        }
        events
    }

    pub fn remaining(&self) -> usize {
        self.taps.len() - self.current_index
    }
}

/// Play a started session to the end with scripted taps.
///
/// The clock advances in `tick_ms` steps from 0. Taps are released after
/// each tick, so they land within one tick of their note. When the clock
/// knows its duration, `ClockFinished` is sent once the position reaches it;
/// otherwise the session ends through note exhaustion or the grace timeout.
pub fn drive_autoplay<C, S, T>(
    controller: &mut SessionController<C, S, T>,
    tick_ms: f64,
) -> Vec<EngineEvent>
where
    C: PlaybackClock,
    S: ScoreStore,
    T: TimeProvider,
{
    let mut out = Vec::new();
    let Some(timeline) = controller.timeline() else {
        return out;
    };
    let mut taps = ScriptedTaps::from_timeline(timeline);
    let duration_ms = controller.clock().and_then(|clock| clock.duration_ms());
    let tick_ms = tick_ms.max(MIN_TICK_MS);

    let mut position_ms = 0.0;
    while controller.state() == SessionState::Playing {
        out.extend(controller.handle(SessionEvent::ClockTick { position_ms }));
        let due = taps.poll_up_to(controller.effective_time_ms());
        out.extend(controller.handle_all(due));

        if let Some(duration) = duration_ms
            && position_ms >= duration
        {
            out.extend(controller.handle(SessionEvent::ClockFinished));
        }
        position_ms += tick_ms;
    }
    out
}
