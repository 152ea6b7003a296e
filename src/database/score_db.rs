use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};

use super::models::HighScore;
use crate::play::ResultPayload;
use crate::traits::ScoreStore;

/// High-score store backed by SQLite.
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    /// Open or create a score database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS high_score (
                song_id TEXT NOT NULL,
                difficulty_id TEXT NOT NULL,
                score INTEGER NOT NULL DEFAULT 0,
                max_combo INTEGER NOT NULL DEFAULT 0,
                perfect INTEGER NOT NULL DEFAULT 0,
                great INTEGER NOT NULL DEFAULT 0,
                good INTEGER NOT NULL DEFAULT 0,
                miss INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE(song_id, difficulty_id)
            );",
        )?;
        Ok(())
    }

    /// Get the stored record for a chart.
    pub fn get_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM high_score WHERE song_id = ?1 AND difficulty_id = ?2 LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![song_id, difficulty_id], HighScore::from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Insert a record, or overwrite the existing row for the chart.
    pub fn upsert_score(&self, song_id: &str, difficulty_id: &str, score: &HighScore) -> Result<()> {
        let value = i64::try_from(score.score)?;
        self.conn.execute(
            "INSERT INTO high_score
                (song_id, difficulty_id, score, max_combo, perfect, great, good, miss, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(song_id, difficulty_id) DO UPDATE SET
                score = excluded.score,
                max_combo = excluded.max_combo,
                perfect = excluded.perfect,
                great = excluded.great,
                good = excluded.good,
                miss = excluded.miss,
                updated_at = excluded.updated_at",
            params![
                song_id,
                difficulty_id,
                value,
                score.max_combo,
                score.judgment_counts.perfect,
                score.judgment_counts.great,
                score.judgment_counts.good,
                score.judgment_counts.miss,
                score.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Number of charts with a stored record.
    pub fn record_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM high_score", [], |row| row.get(0))?;
        Ok(usize::try_from(count)?)
    }
}

impl ScoreStore for SqliteScoreStore {
    fn high_score(&self, song_id: &str, difficulty_id: &str) -> Result<Option<HighScore>> {
        self.get_score(song_id, difficulty_id)
    }

    fn record_result(
        &mut self,
        song_id: &str,
        difficulty_id: &str,
        payload: &ResultPayload,
    ) -> Result<()> {
        let existing = self.get_score(song_id, difficulty_id)?;
        let merged = HighScore::merged(existing.as_ref(), payload, Utc::now());
        self.upsert_score(song_id, difficulty_id, &merged)
    }
}
