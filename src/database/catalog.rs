use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::models::HighScore;
use crate::model::{Beatmap, parse_beatmap};
use crate::traits::ScoreStore;

/// Beatmap file extension to scan.
const BEATMAP_EXTENSION: &str = "json";

/// One playable difficulty of a song.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyEntry {
    pub difficulty_id: String,
    pub difficulty_name: String,
    pub level: i32,
    pub note_count: usize,
    pub path: PathBuf,
}

/// A song and its difficulties, sorted by level.
#[derive(Debug, Clone, PartialEq)]
pub struct SongEntry {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub audio_file: String,
    pub offset_ms: f64,
    pub preview_ms: Option<f64>,
    pub difficulties: Vec<DifficultyEntry>,
}

impl SongEntry {
    fn from_beatmap(beatmap: &Beatmap) -> Self {
        Self {
            song_id: beatmap.song_id.clone(),
            title: beatmap.song_title.clone(),
            artist: beatmap.artist.clone(),
            audio_file: beatmap.audio_file.clone(),
            offset_ms: beatmap.offset_ms,
            preview_ms: beatmap.preview_ms,
            difficulties: Vec::new(),
        }
    }

    pub fn difficulty(&self, difficulty_id: &str) -> Option<&DifficultyEntry> {
        self.difficulties
            .iter()
            .find(|entry| entry.difficulty_id == difficulty_id)
    }

    /// Each difficulty with its stored best. A failed read is logged and
    /// shown as unplayed.
    pub fn high_scores<S: ScoreStore>(&self, store: &S) -> Vec<(&DifficultyEntry, Option<HighScore>)> {
        self.difficulties
            .iter()
            .map(|entry| {
                let best = store
                    .high_score(&self.song_id, &entry.difficulty_id)
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            "failed to read high score for {}/{}: {e}",
                            self.song_id,
                            entry.difficulty_id
                        );
                        None
                    });
                (entry, best)
            })
            .collect()
    }
}

/// Songs found under one or more beatmap directories, ordered by song id.
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<SongEntry>,
}

impl SongCatalog {
    pub fn songs(&self) -> &[SongEntry] {
        &self.songs
    }

    pub fn song(&self, song_id: &str) -> Option<&SongEntry> {
        self.songs.iter().find(|song| song.song_id == song_id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Total number of difficulties across all songs.
    pub fn chart_count(&self) -> usize {
        self.songs.iter().map(|song| song.difficulties.len()).sum()
    }
}

/// Scan beatmap directories recursively and group the beatmaps by song.
///
/// Song metadata comes from the first file seen for each song, in path
/// order. Files that fail validation are skipped. A chart id seen twice
/// keeps the first file.
pub fn scan_catalog<P: AsRef<Path>>(roots: &[P]) -> Result<SongCatalog> {
    let mut files = Vec::new();
    for root in roots {
        let root = root.as_ref();
        if !root.is_dir() {
            tracing::warn!("beatmap directory not found: {}", root.display());
            continue;
        }
        collect_beatmap_files(root, &mut files)?;
    }
    files.sort();

    let mut songs: BTreeMap<String, SongEntry> = BTreeMap::new();
    for path in files {
        let beatmap = match read_beatmap(&path) {
            Ok(beatmap) => beatmap,
            Err(e) => {
                tracing::warn!("skip {}: {e}", path.display());
                continue;
            }
        };

        let song = songs
            .entry(beatmap.song_id.clone())
            .or_insert_with(|| SongEntry::from_beatmap(&beatmap));
        if let Some(existing) = song.difficulty(&beatmap.difficulty_id) {
            tracing::warn!(
                "duplicate chart {}/{} in {}, keeping {}",
                beatmap.song_id,
                beatmap.difficulty_id,
                path.display(),
                existing.path.display()
            );
            continue;
        }
        song.difficulties.push(DifficultyEntry {
            difficulty_id: beatmap.difficulty_id.clone(),
            difficulty_name: beatmap.difficulty_name.clone(),
            level: beatmap.level,
            note_count: beatmap.note_count(),
            path,
        });
    }

    let mut songs: Vec<SongEntry> = songs.into_values().collect();
    for song in &mut songs {
        song.difficulties.sort_by_key(|entry| entry.level);
    }
    tracing::debug!(songs = songs.len(), "catalog scanned");
    Ok(SongCatalog { songs })
}

fn collect_beatmap_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("cannot read directory {}: {e}", dir.display());
            return Ok(());
        }
    };

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_beatmap_files(&path, files)?;
        } else if is_beatmap_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_beatmap_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BEATMAP_EXTENSION))
}

fn read_beatmap(path: &Path) -> Result<Beatmap> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_beatmap(&text)?)
}
