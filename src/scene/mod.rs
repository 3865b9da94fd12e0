//! Scene State
//!
//! The fly camera, the directional lights and the model orientation. All of it
//! is plain data updated by the input layer and read by the frame renderer.

pub mod camera;
pub mod light;
pub mod settings;

pub use camera::{Camera, CameraDeltas};
pub use light::Light;
pub use settings::SceneSettings;
