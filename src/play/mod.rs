// Judgment, scoring and session results.

pub mod judge;
pub mod score;
pub mod session_result;

pub use judge::{JudgeWindow, JudgmentEngine, Tier};
pub use score::{JudgmentCounts, ScoreKeeper, ScoreState, ScoreUpdate};
pub use session_result::{FinishReason, ResultPayload, SessionResult};
