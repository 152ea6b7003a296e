use crate::play::session_result::FinishReason;

/// Delay after the expected track end before a session is forced to finish.
pub const GRACE_PERIOD_MS: f64 = 750.0;

/// Single-use latch guarding the finish sequence.
#[derive(Debug, Clone, Default)]
pub struct CompletionLatch {
    reason: Option<FinishReason>,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the latch. Returns `true` only for the first caller; later
    /// triggers are ignored and do not overwrite the reason.
    pub fn try_fire(&mut self, reason: FinishReason) -> bool {
        if self.reason.is_some() {
            return false;
        }
        self.reason = Some(reason);
        true
    }

    pub fn is_fired(&self) -> bool {
        self.reason.is_some()
    }

    pub fn reason(&self) -> Option<FinishReason> {
        self.reason
    }
}

/// Expected end of the track in effective time.
///
/// `offset + duration` when the clock knows the duration, otherwise the last
/// note's hit time, otherwise the offset alone.
pub fn expected_end_ms(offset_ms: f64, duration_ms: Option<f64>, last_hit_ms: Option<f64>) -> f64 {
    match (duration_ms, last_hit_ms) {
        (Some(duration), _) => offset_ms + duration,
        (None, Some(last_hit)) => last_hit,
        (None, None) => offset_ms,
    }
}

/// Effective time after which the grace timeout fires.
pub fn grace_deadline_ms(expected_end_ms: f64) -> f64 {
    expected_end_ms + GRACE_PERIOD_MS
}
