/// Wall time without a new clock position after which the clock counts as
/// stalled.
pub const STALL_THRESHOLD_MS: f64 = 250.0;

/// Wall-clock estimate of the playback position during a stall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallEstimate {
    pub position_ms: f64,
    /// First estimate of this stall.
    pub newly_stalled: bool,
}

/// Tracks when the playback clock last moved.
#[derive(Debug, Clone)]
pub struct StallMonitor {
    last_position_ms: f64,
    last_moved_at_ms: f64,
    stalled: bool,
}

impl StallMonitor {
    /// Start watching a clock that is at 0 ms at wall time `now_ms`.
    pub fn started(now_ms: f64) -> Self {
        Self {
            last_position_ms: 0.0,
            last_moved_at_ms: now_ms,
            stalled: false,
        }
    }

    /// Record a position report. Only a changed position counts as movement.
    pub fn report(&mut self, position_ms: f64, now_ms: f64) {
        if position_ms != self.last_position_ms {
            self.last_position_ms = position_ms;
            self.last_moved_at_ms = now_ms;
            self.stalled = false;
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Estimate the position if the clock has been still for longer than
    /// [`STALL_THRESHOLD_MS`].
    pub fn estimate(&mut self, now_ms: f64) -> Option<StallEstimate> {
        let elapsed = now_ms - self.last_moved_at_ms;
        if elapsed <= STALL_THRESHOLD_MS {
            return None;
        }
        let newly_stalled = !self.stalled;
        self.stalled = true;
        Some(StallEstimate {
            position_ms: self.last_position_ms + elapsed,
            newly_stalled,
        })
    }
}
