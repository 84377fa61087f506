//! WebGPU rendering module
//!
//! Scenes are built on the CPU as colored triangles in world space, then
//! mapped through a camera that follows the player.

pub mod camera;
pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use camera::Camera;
pub use pipeline::RenderState;
pub use vertex::Vertex;
