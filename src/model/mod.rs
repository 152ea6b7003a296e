// Beatmap records and the runtime note timeline.

pub mod beatmap;
pub mod error;
pub mod note;
pub mod timeline;

pub use beatmap::{Beatmap, BeatmapNote, load_beatmap, parse_beatmap};
pub use error::BeatmapError;
pub use note::{Lane, Note, NoteId, NoteStatus, NoteType};
pub use timeline::{NoteTimeline, VisibleNote};
