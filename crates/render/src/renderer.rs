use std::collections::BTreeMap;
use std::fmt::Write;

use glam::DVec3;
use saberline_common::{Hand, Pose};
use saberline_kernel::{BlockStyle, RenderHandle, Scene};
use tracing::{trace, warn};

/// Camera configuration for text output.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    pub eye: DVec3,
    pub target: DVec3,
    /// Blocks farther than this from the eye are summarised, not listed.
    pub draw_distance: f64,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: DVec3::new(0.0, 1.7, 0.0),
            target: DVec3::new(0.0, 1.7, -1.0),
            draw_distance: 30.0,
        }
    }
}

/// A block the scene is currently displaying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBlock {
    pub hand: Hand,
    pub style: BlockStyle,
    pub pose: Pose,
}

/// Headless scene that keeps handle bookkeeping and prints its contents.
///
/// Double releases and moves of unknown handles are counted instead of
/// panicking so a test can assert on them after the fact.
#[derive(Debug, Default)]
pub struct DebugTextScene {
    next: u64,
    blocks: BTreeMap<RenderHandle, SceneBlock>,
    spawned: usize,
    released: usize,
    double_releases: usize,
    stray_moves: usize,
}

impl DebugTextScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn spawned_count(&self) -> usize {
        self.spawned
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn double_releases(&self) -> usize {
        self.double_releases
    }

    pub fn stray_moves(&self) -> usize {
        self.stray_moves
    }

    pub fn block(&self, handle: RenderHandle) -> Option<&SceneBlock> {
        self.blocks.get(&handle)
    }

    pub fn render(&self, view: &RenderView) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Scene (live={}, spawned={}, released={}) ===",
            self.blocks.len(),
            self.spawned,
            self.released
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2})",
            view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z
        );
        let mut hidden = 0;
        for (handle, block) in &self.blocks {
            let p = block.pose.position;
            if p.distance(view.eye) > view.draw_distance {
                hidden += 1;
                continue;
            }
            let _ = writeln!(
                out,
                "  #{:<4} {:?} {:?} pos=({:.2}, {:.2}, {:.2})",
                handle.0, block.hand, block.style, p.x, p.y, p.z
            );
        }
        if hidden > 0 {
            let _ = writeln!(out, "  ... {hidden} beyond draw distance");
        }
        if self.double_releases > 0 {
            let _ = writeln!(out, "  !! {} double releases", self.double_releases);
        }
        out
    }
}

impl Scene for DebugTextScene {
    fn spawn_block(&mut self, hand: Hand, style: BlockStyle, pose: &Pose) -> RenderHandle {
        self.next += 1;
        let handle = RenderHandle(self.next);
        self.blocks.insert(handle, SceneBlock { hand, style, pose: *pose });
        self.spawned += 1;
        trace!(handle = handle.0, ?hand, ?style, "block spawned");
        handle
    }

    fn move_object(&mut self, handle: RenderHandle, pose: &Pose) {
        match self.blocks.get_mut(&handle) {
            Some(block) => block.pose = *pose,
            None => self.stray_moves += 1,
        }
    }

    fn release(&mut self, handle: RenderHandle) {
        if self.blocks.remove(&handle).is_some() {
            self.released += 1;
        } else {
            self.double_releases += 1;
            warn!(handle = handle.0, "render handle released twice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_renders_header() {
        let scene = DebugTextScene::new();
        let output = scene.render(&RenderView::default());
        assert!(output.contains("live=0"));
        assert!(output.contains("Camera:"));
    }

    #[test]
    fn spawn_move_release_accounting() {
        let mut scene = DebugTextScene::new();
        let a = scene.spawn_block(Hand::Left, BlockStyle::Arrow, &Pose::IDENTITY);
        let b = scene.spawn_block(Hand::Right, BlockStyle::Dot, &Pose::IDENTITY);
        assert_ne!(a, b);

        let moved = Pose::at(DVec3::new(0.5, 1.7, -3.0));
        scene.move_object(b, &moved);
        assert_eq!(scene.block(b).map(|blk| blk.pose), Some(moved));

        scene.release(a);
        scene.release(a);
        assert_eq!(scene.live_count(), 1);
        assert_eq!(scene.released_count(), 1);
        assert_eq!(scene.double_releases(), 1);

        scene.move_object(a, &moved);
        assert_eq!(scene.stray_moves(), 1);
    }

    #[test]
    fn render_lists_nearby_blocks_only() {
        let mut scene = DebugTextScene::new();
        scene.spawn_block(Hand::Left, BlockStyle::Arrow, &Pose::at(DVec3::new(0.0, 1.7, -2.0)));
        scene.spawn_block(Hand::Right, BlockStyle::Dot, &Pose::at(DVec3::new(0.0, 1.7, -80.0)));
        let output = scene.render(&RenderView::default());
        assert!(output.contains("Left Arrow"));
        assert!(!output.contains("Right Dot"));
        assert!(output.contains("1 beyond draw distance"));
    }
}
