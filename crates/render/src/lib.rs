//! Rendering Adapter: headless implementation of the kernel's `Scene`
//! collaborator.
//!
//! # Invariants
//! - The scene never feeds anything back into the simulation.
//! - Handle accounting makes leaks and double releases observable.

mod renderer;

pub use renderer::{DebugTextScene, RenderView, SceneBlock};
