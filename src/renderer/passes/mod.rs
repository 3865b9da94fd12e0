//! Full-screen and background passes of the frame.

mod skybox;
mod tonemap;

pub use skybox::{SkyboxPass, SkyboxUniforms, sky_view_projection};
pub use tonemap::{DISPLAY_GAMMA, TonemapPass, TonemapUniforms};
