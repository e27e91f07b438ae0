use crate::level::{LevelObjectKind, ObjectIndex};
use crate::recording::FRAME_FIELDS;

/// Problems with level data supplied at load time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelError {
    #[error("object {index} at {time}ms comes before the previous object at {previous}ms")]
    UnorderedObjects { index: usize, time: f64, previous: f64 },
}

/// Failures reported by an external time source (e.g. an audio device).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeSourceError {
    #[error("time source refused to start playback: {0}")]
    PlaybackRefused(String),
}

/// Malformed recording buffers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordingError {
    #[error("recording holds {len} values, not a multiple of the {FRAME_FIELDS}-value frame stride")]
    BadLength { len: usize },
    #[error("frame {frame} has a time earlier than the frame before it")]
    NonMonotonicTime { frame: usize },
}

/// Errors that terminate a playback session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("object {index:?} of kind {kind:?} has no renderable form")]
    UnrenderableObject {
        index: ObjectIndex,
        kind: LevelObjectKind,
    },
    #[error(transparent)]
    TimeSource(#[from] TimeSourceError),
    #[error(transparent)]
    Level(#[from] LevelError),
}
