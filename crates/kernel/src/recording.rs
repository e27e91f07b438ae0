use saberline_common::{POSE_FIELDS, PlayerPose, Pose};
use tracing::warn;

use crate::error::RecordingError;

/// Values per frame: time, headset, controller 0, controller 1.
pub const FRAME_FIELDS: usize = 1 + 3 * POSE_FIELDS;
/// Frames per allocation while recording.
pub const RECORDING_CHUNK_FRAMES: usize = 1024;

const CHUNK_FIELDS: usize = FRAME_FIELDS * RECORDING_CHUNK_FRAMES;

/// One tick of player input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordingFrame {
    pub time: f64,
    pub player: PlayerPose,
}

impl RecordingFrame {
    /// Write into exactly [`FRAME_FIELDS`] slots.
    fn write_to(&self, out: &mut [f64]) {
        out[0] = self.time;
        let poses = [
            &self.player.headset,
            &self.player.controllers[0],
            &self.player.controllers[1],
        ];
        for (slot, pose) in out[1..].chunks_exact_mut(POSE_FIELDS).zip(poses) {
            slot.copy_from_slice(&pose.to_array());
        }
    }

    /// Read from exactly [`FRAME_FIELDS`] slots.
    fn read_from(fields: &[f64]) -> Self {
        let mut poses = [Pose::IDENTITY; 3];
        for (pose, slot) in poses.iter_mut().zip(fields[1..].chunks_exact(POSE_FIELDS)) {
            let mut values = [0.0; POSE_FIELDS];
            values.copy_from_slice(slot);
            *pose = Pose::from_array(values);
        }
        Self {
            time: fields[0],
            player: PlayerPose {
                headset: poses[0],
                controllers: [poses[1], poses[2]],
            },
        }
    }
}

/// Append-only frame sink backed by fixed-size chunks. Filled chunks are
/// never reallocated.
#[derive(Debug)]
pub struct RecordingWriter {
    filled: Vec<Box<[f64]>>,
    current: Box<[f64]>,
    cursor: usize,
}

impl Default for RecordingWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn new_chunk() -> Box<[f64]> {
    vec![0.0; CHUNK_FIELDS].into_boxed_slice()
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self {
            filled: Vec::new(),
            current: new_chunk(),
            cursor: 0,
        }
    }

    pub fn push(&mut self, frame: &RecordingFrame) {
        frame.write_to(&mut self.current[self.cursor..self.cursor + FRAME_FIELDS]);
        self.cursor += FRAME_FIELDS;
        if self.cursor == CHUNK_FIELDS {
            let full = std::mem::replace(&mut self.current, new_chunk());
            self.filled.push(full);
            self.cursor = 0;
        }
    }

    pub fn frame_count(&self) -> usize {
        self.filled.len() * RECORDING_CHUNK_FRAMES + self.cursor / FRAME_FIELDS
    }

    /// Chunks allocated so far, including the one being filled.
    pub fn chunk_count(&self) -> usize {
        self.filled.len() + 1
    }

    /// Contiguous copy of every frame written, with no unused tail.
    pub fn finish(&self) -> Recording {
        let mut samples = Vec::with_capacity(self.frame_count() * FRAME_FIELDS);
        for chunk in &self.filled {
            samples.extend_from_slice(chunk);
        }
        samples.extend_from_slice(&self.current[..self.cursor]);
        Recording { samples }
    }
}

/// Flat buffer of frames, `FRAME_FIELDS` values each, times non-decreasing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    samples: Vec<f64>,
}

impl Recording {
    /// Validate stride and time ordering of a raw buffer.
    pub fn from_samples(samples: Vec<f64>) -> Result<Self, RecordingError> {
        if samples.len() % FRAME_FIELDS != 0 {
            return Err(RecordingError::BadLength { len: samples.len() });
        }
        let times = samples.iter().step_by(FRAME_FIELDS);
        for (frame, (prev, next)) in times.clone().zip(times.skip(1)).enumerate() {
            if next < prev {
                return Err(RecordingError::NonMonotonicTime { frame: frame + 1 });
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / FRAME_FIELDS
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the last frame, if any.
    pub fn duration(&self) -> Option<f64> {
        self.frame_count().checked_sub(1).map(|last| self.time_at(last))
    }

    pub fn frame(&self, index: usize) -> Option<RecordingFrame> {
        let start = index.checked_mul(FRAME_FIELDS)?;
        let fields = self.samples.get(start..start + FRAME_FIELDS)?;
        Some(RecordingFrame::read_from(fields))
    }

    pub fn frames(&self) -> impl Iterator<Item = RecordingFrame> + '_ {
        self.samples
            .chunks_exact(FRAME_FIELDS)
            .map(RecordingFrame::read_from)
    }

    fn time_at(&self, index: usize) -> f64 {
        self.samples[index * FRAME_FIELDS]
    }
}

/// Forward-only read position for replay.
#[derive(Debug, Clone, Default)]
pub struct RecordingCursor {
    frame: usize,
    overrun: bool,
}

impl RecordingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    /// The clock has moved past the last recorded frame.
    pub fn is_overrun(&self) -> bool {
        self.overrun
    }

    /// Step forward while the frame under the cursor is older than `time`,
    /// then decode it. Past the end the cursor stays on the last frame.
    pub fn advance(&mut self, recording: &Recording, time: f64) -> Option<RecordingFrame> {
        let count = recording.frame_count();
        if count == 0 {
            return None;
        }
        while self.frame + 1 < count && recording.time_at(self.frame) < time {
            self.frame += 1;
        }
        let frame = recording.frame(self.frame)?;
        if !self.overrun && self.frame + 1 == count && frame.time < time {
            self.overrun = true;
            warn!(frame = self.frame, time, "replay ran past the recording; holding last frame");
        }
        Some(frame)
    }
}
