// Persisted player preferences.

pub mod player_config;

pub use player_config::{LatencyOffset, PlayerConfig, UnresolvedPolicy};
