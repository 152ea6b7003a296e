use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::play::ResultPayload;
use crate::play::score::JudgmentCounts;

/// Best result stored for one `(song_id, difficulty_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScore {
    pub score: u64,
    pub max_combo: u32,
    #[serde(rename = "judgments")]
    pub judgment_counts: JudgmentCounts,
    pub updated_at: DateTime<Utc>,
}

impl HighScore {
    /// Merge a new result into the stored record.
    ///
    /// Score and judgment counts are taken from the new result when it ties
    /// or beats the stored score. `max_combo` keeps the larger of both, so it
    /// can come from a different play than the score.
    pub fn merged(existing: Option<&Self>, payload: &ResultPayload, now: DateTime<Utc>) -> Self {
        let Some(existing) = existing else {
            return Self {
                score: payload.score,
                max_combo: payload.max_combo,
                judgment_counts: payload.judgment_counts,
                updated_at: now,
            };
        };

        let is_better = payload.score >= existing.score;
        Self {
            score: if is_better { payload.score } else { existing.score },
            max_combo: existing.max_combo.max(payload.max_combo),
            judgment_counts: if is_better {
                payload.judgment_counts
            } else {
                existing.judgment_counts
            },
            updated_at: now,
        }
    }

    /// Read a HighScore from a `high_score` row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let score: i64 = row.get("score")?;
        let score = u64::try_from(score).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
        })?;
        let updated_at: String = row.get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
        Ok(Self {
            score,
            max_combo: row.get("max_combo")?,
            judgment_counts: JudgmentCounts {
                perfect: row.get("perfect")?,
                great: row.get("great")?,
                good: row.get("good")?,
                miss: row.get("miss")?,
            },
            updated_at,
        })
    }
}
