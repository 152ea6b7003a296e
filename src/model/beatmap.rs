use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BeatmapError;
use super::note::NoteType;

/// Fields every beatmap record must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "song_id",
    "song_title",
    "artist",
    "difficulty_id",
    "difficulty_name",
    "level",
    "audio_file",
    "offset_ms",
    "notes",
];

/// A note as authored in the beatmap file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapNote {
    /// Authored time in milliseconds, before the beatmap offset is applied.
    pub time_ms: f64,
    /// Lane index. Passed through unchecked.
    pub lane: i64,
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

/// A validated beatmap with its notes sorted by authored time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    pub song_id: String,
    pub song_title: String,
    pub artist: String,
    pub difficulty_id: String,
    pub difficulty_name: String,
    pub level: i32,
    pub audio_file: String,
    pub offset_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_ms: Option<f64>,
    pub notes: Vec<BeatmapNote>,
}

impl Beatmap {
    /// Number of notes in the chart.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Runtime hit time of the last note (`time_ms + offset_ms`).
    pub fn last_hit_time_ms(&self) -> Option<f64> {
        self.notes.last().map(|note| note.time_ms + self.offset_ms)
    }
}

/// Validate a raw beatmap record and normalize it into a [`Beatmap`].
///
/// Presence of every field in [`REQUIRED_FIELDS`] is checked first, so the
/// error names the first missing field in that order. Notes are then stably
/// sorted by `time_ms`; notes sharing a time keep their authored order.
pub fn load_beatmap(raw: &Value) -> Result<Beatmap, BeatmapError> {
    let object = raw.as_object().ok_or(BeatmapError::NotAnObject)?;

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        return Err(BeatmapError::MissingField(*missing));
    }

    let mut notes: Vec<BeatmapNote> = field(object, "notes")?;
    notes.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

    let preview_ms = match object.get("preview_ms") {
        None | Some(Value::Null) => None,
        Some(_) => Some(field(object, "preview_ms")?),
    };

    Ok(Beatmap {
        song_id: field(object, "song_id")?,
        song_title: field(object, "song_title")?,
        artist: field(object, "artist")?,
        difficulty_id: field(object, "difficulty_id")?,
        difficulty_name: field(object, "difficulty_name")?,
        level: field(object, "level")?,
        audio_file: field(object, "audio_file")?,
        offset_ms: field(object, "offset_ms")?,
        preview_ms,
        notes,
    })
}

/// Parse JSON text and validate it with [`load_beatmap`].
pub fn parse_beatmap(text: &str) -> Result<Beatmap, BeatmapError> {
    let raw: Value = serde_json::from_str(text)?;
    load_beatmap(&raw)
}

fn field<T: DeserializeOwned>(
    object: &Map<String, Value>,
    name: &'static str,
) -> Result<T, BeatmapError> {
    let value = object.get(name).ok_or(BeatmapError::MissingField(name))?;
    T::deserialize(value).map_err(|source| BeatmapError::InvalidField {
        field: name,
        source,
    })
}
