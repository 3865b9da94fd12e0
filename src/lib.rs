#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Physically based asteroid renderer on wgpu.
//!
//! - [`renderer`]: GPU context, resource wrappers, IBL precompute and the
//!   frame pipeline
//! - [`assets`]: glTF mesh and image loading
//! - [`scene`]: camera, lights and model orientation
//! - [`app`]: input mapping and the winit viewer

pub mod app;
pub mod assets;
pub mod errors;
pub mod renderer;
pub mod scene;
pub mod utils;

pub use app::App;
pub use assets::{AssetPaths, Image, Mesh};
pub use errors::{PbrError, Result};
pub use renderer::core::GpuContext;
pub use renderer::{EnvironmentSettings, FrameRenderer, FrameStats, PbrRenderer, RendererSettings};
pub use scene::{Camera, CameraDeltas, Light, SceneSettings};
