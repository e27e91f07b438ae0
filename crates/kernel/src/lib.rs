//! Level Kernel: object lifecycle, level clock, recording codec and the
//! Live/Replay playback drivers built on them.
//!
//! # Invariants
//! - `obj_idx` only moves forward; an object is active iff it was admitted and
//!   has been neither cut nor evicted.
//! - Eviction and cut testing in one tick use the same object position.
//! - Every render handle is released exactly once.
//! - The session completion future resolves at most once.
//! - Replaying a recording against the same level reproduces the same cuts.

pub mod clock;
pub mod completion;
pub mod error;
pub mod level;
pub mod lifecycle;
pub mod playback;
pub mod recording;
pub mod scene;
pub mod session;
pub mod time_source;

pub use clock::{ClockMode, LevelClock};
pub use completion::{Completer, SessionCompletion};
pub use error::{LevelError, RecordingError, SessionError, TimeSourceError};
pub use level::{
    DEFAULT_JUMP_OFFSET, DEFAULT_OBJECT_SPEED, Level, LevelDifficulty, LevelObject, LevelObjectKind,
    ObjectIndex,
};
pub use lifecycle::{ActiveSet, Placement, REAR_DESPAWN_DISTANCE, forward_distance};
pub use playback::{FrameContext, LivePlayback, Playable, ReplayPlayback};
pub use recording::{
    FRAME_FIELDS, RECORDING_CHUNK_FRAMES, Recording, RecordingCursor, RecordingFrame,
    RecordingWriter,
};
pub use scene::{BlockStyle, NullScene, RenderHandle, Scene};
pub use session::{
    BEAT_Z_OFFSET, CutEvent, LevelSession, SaberState, SessionConfig, TickReport, block_pose,
};
pub use time_source::{TimeSource, VirtualAudio};
