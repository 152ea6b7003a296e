// The session state machine and its event contract.

pub mod autoplay;
pub mod completion;
pub mod error;
pub mod events;
pub mod session_controller;
pub mod stall;

pub use autoplay::{ScriptedTaps, drive_autoplay};
pub use completion::{CompletionLatch, GRACE_PERIOD_MS};
pub use error::SessionError;
pub use events::{EngineEvent, JudgmentEvent, SessionEvent};
pub use session_controller::{SessionController, SessionOptions, SessionState};
pub use stall::{STALL_THRESHOLD_MS, StallMonitor};
