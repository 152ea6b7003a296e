// Seams to the collaborators a session talks to.

pub mod clock;
pub mod loader;
pub mod score_store;
pub mod time;

pub use clock::{ManualClock, PlaybackClock};
pub use loader::{PreparedLoader, SessionLoader};
pub use score_store::ScoreStore;
pub use time::{MockTimeProvider, SystemTimeProvider, TimeProvider};
