//! Test utilities for building beatmap fixtures in a fluent manner.

#[cfg(test)]
pub mod builders {
    use serde_json::{Value, json};

    use crate::model::note::{Lane, NoteType};
    use crate::model::{Beatmap, load_beatmap};

    /// Builder for a beatmap record.
    #[derive(Debug, Clone)]
    pub struct BeatmapBuilder {
        song_id: String,
        difficulty_id: String,
        offset_ms: f64,
        notes: Vec<(f64, Lane, NoteType)>,
    }

    impl Default for BeatmapBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl BeatmapBuilder {
        pub fn new() -> Self {
            Self {
                song_id: "test_song".to_string(),
                difficulty_id: "normal".to_string(),
                offset_ms: 0.0,
                notes: Vec::new(),
            }
        }

        pub fn offset_ms(mut self, offset_ms: f64) -> Self {
            self.offset_ms = offset_ms;
            self
        }

        /// Add a tap note at an authored time.
        pub fn note(self, time_ms: f64, lane: Lane) -> Self {
            self.typed_note(time_ms, lane, NoteType::Tap)
        }

        pub fn typed_note(mut self, time_ms: f64, lane: Lane, note_type: NoteType) -> Self {
            self.notes.push((time_ms, lane, note_type));
            self
        }

        /// The raw JSON record, notes in insertion order.
        pub fn json(&self) -> Value {
            let notes: Vec<Value> = self
                .notes
                .iter()
                .map(|(time_ms, lane, note_type)| {
                    json!({ "time_ms": time_ms, "lane": lane, "type": note_type })
                })
                .collect();
            json!({
                "song_id": self.song_id,
                "song_title": "Test Song",
                "artist": "Test Artist",
                "difficulty_id": self.difficulty_id,
                "difficulty_name": "Normal",
                "level": 3,
                "audio_file": "test_song.mp3",
                "offset_ms": self.offset_ms,
                "notes": notes,
            })
        }

        /// A loaded beatmap, notes sorted as the loader sorts them.
        pub fn build(&self) -> Beatmap {
            load_beatmap(&self.json()).expect("builder produces a valid record")
        }
    }
}
