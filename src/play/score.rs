use serde::{Deserialize, Serialize};

use super::judge::Tier;

/// Combo length that earns one bonus step.
pub const COMBO_BONUS_STEP: u32 = 50;

/// Multiplier added per bonus step.
pub const COMBO_BONUS_RATIO: f64 = 0.02;

/// Base points awarded per tier before the combo multiplier.
pub fn base_points(tier: Tier) -> u32 {
    match tier {
        Tier::Perfect => 1000,
        Tier::Great => 700,
        Tier::Good => 300,
        Tier::Miss => 0,
    }
}

/// Combo multiplier: `1 + floor(combo / 50) * 0.02`.
pub fn combo_multiplier(combo: u32) -> f64 {
    let steps = combo / COMBO_BONUS_STEP;
    1.0 + f64::from(steps) * COMBO_BONUS_RATIO
}

/// Points for one judgment, using the combo value after the judgment.
pub fn judgment_score(tier: Tier, combo_after: u32) -> u64 {
    let base = base_points(tier);
    if base == 0 {
        return 0;
    }
    (f64::from(base) * combo_multiplier(combo_after)).round() as u64
}

/// Per-tier judgment counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentCounts {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Perfect => self.perfect,
            Tier::Great => self.great,
            Tier::Good => self.good,
            Tier::Miss => self.miss,
        }
    }

    pub fn add(&mut self, tier: Tier) {
        match tier {
            Tier::Perfect => self.perfect += 1,
            Tier::Great => self.great += 1,
            Tier::Good => self.good += 1,
            Tier::Miss => self.miss += 1,
        }
    }

    /// Number of judged notes.
    pub fn total(&self) -> u32 {
        self.perfect + self.great + self.good + self.miss
    }
}

/// Score accumulated during one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub judgment_counts: JudgmentCounts,
}

/// Outcome of applying one judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub score_delta: u64,
    pub combo_after: u32,
    pub is_new_max_combo: bool,
}

/// Accumulates score, combo and judgment counts.
#[derive(Debug, Clone, Default)]
pub struct ScoreKeeper {
    state: ScoreState,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    /// Apply one judgment.
    ///
    /// PERFECT and GREAT extend the combo, GOOD and MISS reset it. Points
    /// are scaled by the multiplier of the updated combo.
    pub fn apply(&mut self, tier: Tier) -> ScoreUpdate {
        let state = &mut self.state;

        state.combo = if tier.continues_combo() {
            state.combo + 1
        } else {
            0
        };

        let score_delta = judgment_score(tier, state.combo);
        state.score += score_delta;

        let is_new_max_combo = state.combo > state.max_combo;
        if is_new_max_combo {
            state.max_combo = state.combo;
        }
        state.judgment_counts.add(tier);

        ScoreUpdate {
            score_delta,
            combo_after: state.combo,
            is_new_max_combo,
        }
    }
}
