//! Shared fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};

/// A complete beatmap record with tap notes given as `(time_ms, lane)`.
pub fn beatmap_json(offset_ms: f64, notes: &[(f64, i64)]) -> Value {
    let notes: Vec<Value> = notes
        .iter()
        .map(|(time_ms, lane)| json!({ "time_ms": time_ms, "lane": lane, "type": "tap" }))
        .collect();
    json!({
        "song_id": "sakura",
        "song_title": "Sakura Drift",
        "artist": "Tester",
        "difficulty_id": "hard",
        "difficulty_name": "Hard",
        "level": 7,
        "audio_file": "sakura.mp3",
        "offset_ms": offset_ms,
        "preview_ms": 30000,
        "notes": notes,
    })
}

/// Evenly spaced notes cycling through four lanes.
pub fn stream(count: usize, start_ms: f64, spacing_ms: f64) -> Vec<(f64, i64)> {
    (0..count)
        .map(|i| (start_ms + spacing_ms * i as f64, (i % 4) as i64))
        .collect()
}
