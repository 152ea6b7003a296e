use anyhow::Result;
use serde_json::Value;

use super::clock::PlaybackClock;
use crate::model::Beatmap;

/// Supplies what a session needs before it can play.
pub trait SessionLoader {
    type Clock: PlaybackClock;

    /// Fetch the raw beatmap record.
    fn load_beatmap(&mut self) -> Result<Value>;

    /// Open the playback clock for the beatmap's audio.
    fn acquire_clock(&mut self, beatmap: &Beatmap) -> Result<Self::Clock>;
}

/// Loader over a record and a clock already in memory.
pub struct PreparedLoader<C> {
    raw: Option<Value>,
    clock: Option<C>,
}

impl<C: PlaybackClock> PreparedLoader<C> {
    pub fn new(raw: Value, clock: C) -> Self {
        Self {
            raw: Some(raw),
            clock: Some(clock),
        }
    }
}

impl<C: PlaybackClock> SessionLoader for PreparedLoader<C> {
    type Clock = C;

    fn load_beatmap(&mut self) -> Result<Value> {
        self.raw
            .take()
            .ok_or_else(|| anyhow::anyhow!("beatmap record already consumed"))
    }

    fn acquire_clock(&mut self, _beatmap: &Beatmap) -> Result<C> {
        self.clock
            .take()
            .ok_or_else(|| anyhow::anyhow!("playback clock already acquired"))
    }
}
