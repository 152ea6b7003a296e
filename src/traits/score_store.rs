use anyhow::Result;

use crate::database::HighScore;
use crate::play::ResultPayload;

/// Persisted best results keyed by `(song_id, difficulty_id)`.
/// Implementations: SqliteScoreStore, MemoryScoreStore.
pub trait ScoreStore {
    fn high_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>>;

    /// Merge a finished session into the stored record.
    fn record_result(
        &mut self,
        song_id: &str,
        difficulty_id: &str,
        payload: &ResultPayload,
    ) -> Result<()>;
}

impl<S: ScoreStore + ?Sized> ScoreStore for &mut S {
    fn high_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>> {
        (**self).high_score(song_id, difficulty_id)
    }

    fn record_result(
        &mut self,
        song_id: &str,
        difficulty_id: &str,
        payload: &ResultPayload,
    ) -> Result<()> {
        (**self).record_result(song_id, difficulty_id, payload)
    }
}

impl<S: ScoreStore + ?Sized> ScoreStore for Box<S> {
    fn high_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>> {
        (**self).high_score(song_id, difficulty_id)
    }

    fn record_result(
        &mut self,
        song_id: &str,
        difficulty_id: &str,
        payload: &ResultPayload,
    ) -> Result<()> {
        (**self).record_result(song_id, difficulty_id, payload)
    }
}
