use thiserror::Error;

use super::SessionState;
use crate::model::BeatmapError;
use crate::util::UserError;

/// Collaborator resource holding the beatmap record.
pub const BEATMAP_RECORD: &str = "beatmap record";

/// Collaborator resource driving playback time.
pub const PLAYBACK_CLOCK: &str = "playback clock";

/// Fatal session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("beatmap validation failed: {0}")]
    Validation(#[from] BeatmapError),

    #[error("failed to acquire {resource}: {source}")]
    ResourceAcquisition {
        resource: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cannot {operation} in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl SessionError {
    pub fn resource(resource: &'static str, source: anyhow::Error) -> Self {
        Self::ResourceAcquisition {
            resource,
            source: source.into(),
        }
    }

    /// Message shown to the player in the error state.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => UserError::beatmap_invalid(err.field()),
            Self::ResourceAcquisition { resource, .. } if *resource == BEATMAP_RECORD => {
                UserError::beatmap_unavailable().to_string()
            }
            Self::ResourceAcquisition { .. } => UserError::audio_unavailable().to_string(),
            Self::InvalidState { .. } => self.to_string(),
        }
    }
}
