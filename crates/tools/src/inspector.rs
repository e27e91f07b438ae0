use saberline_common::Hand;
use saberline_kernel::{ClockMode, LevelObjectKind, LevelSession, ObjectIndex, forward_distance};

/// Session inspector for developer tooling.
///
/// Read-only queries against a running session for debugging and logs.
pub struct SessionInspector;

impl SessionInspector {
    /// Produce a summary of the session state.
    pub fn summary(session: &LevelSession) -> SessionSummary {
        SessionSummary {
            time: session.time(),
            playing: session.is_playing(),
            mode: session.clock().mode(),
            obj_idx: session.active().obj_idx(),
            total_objects: session.difficulty().objects.len(),
            active: session.active().len(),
            cuts: session.cut_history().len(),
            evicted: session.evicted_count(),
            ticks: session.ticks(),
        }
    }

    /// Details of one level object as seen at the session's current time.
    pub fn inspect_object(session: &LevelSession, index: ObjectIndex) -> Option<ObjectInfo> {
        let object = session.difficulty().object(index)?;
        let state = if session.cut_history().iter().any(|c| c.object == index) {
            ObjectState::Cut
        } else if session.active().contains(index) {
            ObjectState::Active
        } else if index.0 < session.active().obj_idx() {
            ObjectState::Evicted
        } else {
            ObjectState::Pending
        };
        Some(ObjectInfo {
            index,
            kind: object.kind,
            time_ms: object.time,
            position: [object.x, object.y],
            rot: object.rot,
            distance: forward_distance(session.time(), object.time, session.difficulty().object_speed()),
            state,
        })
    }

    /// Objects currently in play, in index order.
    pub fn list_active(session: &LevelSession) -> Vec<ObjectIndex> {
        session.active().iter().collect()
    }

    /// Cuts made by one hand so far.
    pub fn cuts_by(session: &LevelSession, hand: Hand) -> usize {
        session.cut_history().iter().filter(|c| c.hand == hand).count()
    }
}

/// Summary of session state for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub time: f64,
    pub playing: bool,
    pub mode: ClockMode,
    pub obj_idx: usize,
    pub total_objects: usize,
    pub active: usize,
    pub cuts: usize,
    pub evicted: usize,
    pub ticks: u64,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Session: time={:.3} playing={} mode={:?} admitted={}/{} active={} cuts={} evicted={} ticks={}",
            self.time,
            self.playing,
            self.mode,
            self.obj_idx,
            self.total_objects,
            self.active,
            self.cuts,
            self.evicted,
            self.ticks
        )
    }
}

/// Where an object is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Pending,
    Active,
    Cut,
    Evicted,
}

/// Detailed info about a single level object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub index: ObjectIndex,
    pub kind: LevelObjectKind,
    pub time_ms: f64,
    pub position: [f64; 2],
    pub rot: f64,
    /// Metres past the player's plane, negative while approaching.
    pub distance: f64,
    pub state: ObjectState,
}

impl std::fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Object [{}] {:?} t={}ms pos=({:.2}, {:.2}) rot={:.0} distance={:.2} {:?}",
            self.index.0,
            self.kind,
            self.time_ms,
            self.position[0],
            self.position[1],
            self.rot,
            self.distance,
            self.state,
        )
    }
}
