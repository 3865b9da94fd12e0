//! Render Target
//!
//! A framebuffer slot is backed either by a sampled [`Texture`] or by an
//! attachment-only [`Renderbuffer`]. Framebuffer code only needs the shared
//! capability (extent, sample count, attachable view), so the two are unified
//! as a sum type rather than behind a trait object.

use crate::errors::{PbrError, Result};

use super::framebuffer::Slot;
use super::renderbuffer::Renderbuffer;
use super::texture::Texture;
use super::tracked::ResourceId;

#[derive(Debug)]
pub enum RenderTarget {
    Texture(Texture),
    Renderbuffer(Renderbuffer),
}

impl RenderTarget {
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Texture(t) => t.width(),
            Self::Renderbuffer(r) => r.width(),
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Texture(t) => t.height(),
            Self::Renderbuffer(r) => r.height(),
        }
    }

    #[must_use]
    pub fn samples(&self) -> u32 {
        match self {
            Self::Texture(_) => 1,
            Self::Renderbuffer(r) => r.samples(),
        }
    }

    #[must_use]
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        match self {
            Self::Texture(t) => t.format(),
            Self::Renderbuffer(r) => r.format(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Texture(t) => t.id(),
            Self::Renderbuffer(r) => r.id(),
        }
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        match self {
            Self::Texture(t) => t.is_usable(),
            Self::Renderbuffer(r) => r.is_usable(),
        }
    }

    /// The view a render pass attaches for this target.
    #[must_use]
    pub fn attach(&self) -> Option<&wgpu::TextureView> {
        match self {
            Self::Texture(t) => t.view(),
            Self::Renderbuffer(r) => r.view(),
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<&wgpu::Texture> {
        match self {
            Self::Texture(t) => t.raw(),
            Self::Renderbuffer(r) => r.raw(),
        }
    }

    /// Downcasts to the texture backing, for passes that sample the target.
    pub fn as_texture(&self, slot: Slot) -> Result<&Texture> {
        match self {
            Self::Texture(t) => Ok(t),
            Self::Renderbuffer(_) => Err(PbrError::RuntimeCast {
                slot,
                expected: "texture",
            }),
        }
    }

    pub fn release(&mut self) -> bool {
        match self {
            Self::Texture(t) => t.release(),
            Self::Renderbuffer(r) => r.release(),
        }
    }
}
