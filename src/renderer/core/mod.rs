//! WGPU 核心封装
//!
//! - [`GpuContext`]: instance, adapter, device, queue
//! - [`resources`]: owning wrappers of GPU objects and the IBL environment

pub mod context;
pub mod resources;

pub use context::{GpuContext, pick_sample_count};
