//! Developer Tooling: session inspector, cut step recorder, tick timing,
//! demo charts and the headless runner.
//!
//! # Invariants
//! - Tools only observe a session; nothing here changes its outcome.
//! - A headless replay of a headless live run reproduces its cuts.

pub mod cut_steps;
pub mod demo;
pub mod headless;
pub mod inspector;
pub mod timer;

pub use cut_steps::{CutStep, CutStepRecorder};
pub use demo::{DEMO_PLAY_TYPE, demo_difficulty, demo_level};
pub use headless::{HeadlessRunner, RunConfig, RunError, RunOutcome};
pub use inspector::{ObjectInfo, ObjectState, SessionInspector, SessionSummary};
pub use timer::TickTimer;
