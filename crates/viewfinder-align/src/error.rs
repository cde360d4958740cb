use std::path::PathBuf;

use thiserror::Error;

use crate::pose::PoseParseError;
use crate::PuzzleId;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Failed to read pose record {path}: {source}")]
    RecordIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pose record for '{id}': {source}")]
    RecordParse {
        id: PuzzleId,
        #[source]
        source: PoseParseError,
    },

    #[error("No pose record loaded for '{0}'")]
    PoseNotLoaded(PuzzleId),

    #[error("No outcome registered for '{0}'")]
    Unmatched(PuzzleId),

    #[error("Duplicate outcome entry for '{0}'")]
    DuplicateOutcome(PuzzleId),

    #[error("Puzzle '{id}' teleports to unknown waypoint '{waypoint}'")]
    UnknownWaypoint { id: PuzzleId, waypoint: String },

    #[error("Invalid fade rate {0}: must be a finite value > 0")]
    InvalidFadeRate(f32),

    #[error("Invalid fade epsilon {0}: must lie in (0, 1)")]
    InvalidFadeEpsilon(f32),

    #[error("Visual handle for '{0}' is missing its image or border element")]
    MissingVisual(PuzzleId),
}

pub type Result<T> = std::result::Result<T, AlignError>;
