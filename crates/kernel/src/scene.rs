use saberline_common::{Hand, Pose};

/// Opaque handle to something the scene is displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(pub u64);

/// Face marking of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStyle {
    /// Must be cut in the direction of its rotation.
    Arrow,
    /// Accepts a cut from any direction.
    Dot,
}

/// Rendering collaborator.
///
/// The simulation only allocates, positions and releases handles; it never
/// reads anything back. Each handle is released exactly once.
pub trait Scene {
    fn spawn_block(&mut self, hand: Hand, style: BlockStyle, pose: &Pose) -> RenderHandle;
    fn move_object(&mut self, handle: RenderHandle, pose: &Pose);
    fn release(&mut self, handle: RenderHandle);
}

/// Scene that displays nothing. Hands out sequential handles.
#[derive(Debug, Default)]
pub struct NullScene {
    next: u64,
}

impl Scene for NullScene {
    fn spawn_block(&mut self, _hand: Hand, _style: BlockStyle, _pose: &Pose) -> RenderHandle {
        self.next += 1;
        RenderHandle(self.next)
    }

    fn move_object(&mut self, _handle: RenderHandle, _pose: &Pose) {}

    fn release(&mut self, _handle: RenderHandle) {}
}
