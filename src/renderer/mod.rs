//! Rendering
//!
//! - [`core`]: GPU context and the resource wrappers every pass builds on
//! - [`mesh`]: PBR mesh renderers (flat and tessellated)
//! - [`passes`]: skybox and tonemap
//! - [`frame`]: the per-frame sequence tying them together

pub mod core;
pub mod frame;
pub mod mesh;
pub mod passes;
pub mod settings;
pub mod targets;

pub use frame::{FrameRenderer, FrameStats};
pub use mesh::{PbrAsteroid, PbrMesh, PbrRenderer};
pub use settings::{EnvironmentSettings, RendererSettings};
pub use targets::{PassKind, TargetLayout};
