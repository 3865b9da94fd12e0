//! GPU Resources
//!
//! Owning wrappers around native GPU objects and the precomputed environment:
//!
//! - [`Texture`] / [`Renderbuffer`]: move-only texture storage, released exactly once
//! - [`RenderTarget`]: sum type over the two, as hosted by a framebuffer slot
//! - [`Framebuffer`]: slot → target table with resize, resolve and invalidation
//! - [`Geometry`]: vertex/index buffers or the full-screen triangle
//! - [`UniformBuffer`]: typed uniform block with a CPU copy
//! - [`ShaderProgram`]: validated WGSL modules with `#include` support
//! - [`MipmapGenerator`]: render-pass box filter for 2D and cube textures
//! - [`Environment`]: specular cube, irradiance cube and BRDF LUT

pub mod binding;
mod buffer;
mod environment;
mod framebuffer;
mod geometry;
mod mipmap;
mod render_target;
mod renderbuffer;
mod shader;
mod texture;
mod tracked;

pub use buffer::UniformBuffer;
pub use environment::{
    BRDF_LUT_FORMAT, ENVIRONMENT_FORMAT, Environment, PrefilterLevel, WORKGROUP_SIZE,
    prefilter_group_count, prefilter_schedule, roughness_step,
};
pub use framebuffer::{
    AttachmentParams, AttachmentState, BlitFilter, BlitMask, Framebuffer, FramebufferStatus,
    ResolvePair, Slot, TargetType,
};
pub use geometry::{DrawMode, Geometry};
pub use mipmap::MipmapGenerator;
pub use render_target::RenderTarget;
pub use renderbuffer::Renderbuffer;
pub use shader::{
    ENTRY_POINT, ShaderProgram, ShaderStage, expand_includes, read_shader_file, validate_wgsl,
};
pub use texture::{Texture, TextureKind, mip_level_count};
pub use tracked::{ResourceId, released_count};
