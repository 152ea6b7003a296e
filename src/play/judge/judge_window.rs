use std::fmt;

use serde::{Deserialize, Serialize};

/// Judgment tier of a resolved note, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Perfect,
    Great,
    Good,
    Miss,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Perfect, Tier::Great, Tier::Good, Tier::Miss];

    /// Index for per-tier arrays (0=PERFECT .. 3=MISS).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether this tier extends the combo. GOOD breaks it just like MISS.
    pub fn continues_combo(self) -> bool {
        matches!(self, Self::Perfect | Self::Great)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Great => "GREAT",
            Self::Good => "GOOD",
            Self::Miss => "MISS",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Symmetric timing windows in milliseconds.
///
/// Windows are nested (`perfect < great < good`); anything outside `good`
/// is a miss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeWindow {
    pub perfect_ms: f64,
    pub great_ms: f64,
    pub good_ms: f64,
}

impl JudgeWindow {
    pub const STANDARD: Self = Self {
        perfect_ms: 25.0,
        great_ms: 60.0,
        good_ms: 100.0,
    };

    /// Classify a signed timing delta. Boundaries belong to the better tier.
    pub fn classify(&self, delta_ms: f64) -> Tier {
        let abs = delta_ms.abs();
        if abs <= self.perfect_ms {
            Tier::Perfect
        } else if abs <= self.great_ms {
            Tier::Great
        } else if abs <= self.good_ms {
            Tier::Good
        } else {
            Tier::Miss
        }
    }

    /// Whether a tap at `delta_ms` may claim the note.
    pub fn admits(&self, delta_ms: f64) -> bool {
        delta_ms.abs() <= self.good_ms
    }

    /// Whether the note's window has fully elapsed.
    pub fn has_elapsed(&self, delta_ms: f64) -> bool {
        delta_ms > self.good_ms
    }
}

impl Default for JudgeWindow {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Classify `delta_ms` against [`JudgeWindow::STANDARD`].
pub fn classify(delta_ms: f64) -> Tier {
    JudgeWindow::STANDARD.classify(delta_ms)
}
