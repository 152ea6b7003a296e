// High-score persistence and the song catalog.

pub mod catalog;
mod memory;
mod models;
mod score_db;

use std::path::PathBuf;

use directories::ProjectDirs;

pub use catalog::{DifficultyEntry, SongCatalog, SongEntry, scan_catalog};
pub use memory::MemoryScoreStore;
pub use models::HighScore;
pub use score_db::SqliteScoreStore;

const SCORE_DB_FILE: &str = "score.db";

/// Default location of the score database in the platform data directory.
pub fn default_score_db_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "beatline", "beatline") {
        proj_dirs.data_dir().join(SCORE_DB_FILE)
    } else {
        PathBuf::from(SCORE_DB_FILE)
    }
}
