use thiserror::Error;

/// Errors raised while validating a raw beatmap record.
#[derive(Debug, Error)]
pub enum BeatmapError {
    #[error("beatmap record is not a JSON object")]
    NotAnObject,

    #[error("beatmap record is missing field `{0}`")]
    MissingField(&'static str),

    #[error("beatmap field `{field}` is malformed: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("beatmap is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl BeatmapError {
    /// The offending field, when the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) | Self::InvalidField { field, .. } => Some(*field),
            Self::NotAnObject | Self::Json(_) => None,
        }
    }
}
