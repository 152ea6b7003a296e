use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::Utc;

use super::models::HighScore;
use crate::play::ResultPayload;
use crate::traits::ScoreStore;

/// In-process high-score store.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    records: HashMap<(String, String), HighScore>,
    fail_reads: bool,
    fail_writes: bool,
    writes: u32,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored record.
    pub fn with_record(mut self, song_id: &str, difficulty_id: &str, record: HighScore) -> Self {
        self.records
            .insert((song_id.to_string(), difficulty_id.to_string()), record);
        self
    }

    /// Make every read fail, as an unreachable backend would.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Number of successful `record_result` calls.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    pub fn get(&self, song_id: &str, difficulty_id: &str) -> Option<&HighScore> {
        self.records
            .get(&(song_id.to_string(), difficulty_id.to_string()))
    }
}

impl ScoreStore for MemoryScoreStore {
    fn high_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>> {
        if self.fail_reads {
            bail!("score storage unavailable");
        }
        Ok(self.get(song_id, difficulty_id).cloned())
    }

    fn record_result(
        &mut self,
        song_id: &str,
        difficulty_id: &str,
        payload: &ResultPayload,
    ) -> Result<()> {
        if self.fail_writes {
            bail!("score storage is read-only");
        }
        let key = (song_id.to_string(), difficulty_id.to_string());
        let merged = HighScore::merged(self.records.get(&key), payload, Utc::now());
        self.records.insert(key, merged);
        self.writes += 1;
        Ok(())
    }
}
