// Timing windows and note matching.

pub mod judge_window;
pub mod judgment_engine;

pub use judge_window::{JudgeWindow, Tier, classify};
pub use judgment_engine::{JudgmentEngine, Resolution, TapMatch};
