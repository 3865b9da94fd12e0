//! Renderbuffer
//!
//! An attachment-only 2D texture: it can be rendered to and resolved from, but
//! never sampled. Renderbuffers are the multisampled backing of the working
//! framebuffer and are recreated (never resized) when the requested extent
//! changes.

use super::tracked::{ResourceId, record_release};

#[derive(Debug, Default)]
pub struct Renderbuffer {
    raw: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
    samples: u32,
    format: Option<wgpu::TextureFormat>,
    id: ResourceId,
}

impl Renderbuffer {
    /// Allocates a renderbuffer. `samples <= 1` creates a single-sample target.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        samples: u32,
        label: &str,
    ) -> Self {
        let samples = samples.max(1);
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if samples == 1 {
            usage |= wgpu::TextureUsages::COPY_SRC;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            raw: Some(texture),
            view: Some(view),
            width,
            height,
            samples,
            format: Some(format),
            id: ResourceId::next(),
        }
    }

    /// Destroys the native texture. Returns `false` if there was nothing to release.
    pub fn release(&mut self) -> bool {
        let Some(texture) = self.raw.take() else {
            return false;
        };
        self.view = None;
        texture.destroy();
        record_release();
        self.width = 0;
        self.height = 0;
        self.samples = 0;
        self.format = None;
        self.id = ResourceId::NONE;
        true
    }

    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.raw.is_some()
    }

    #[inline]
    #[must_use]
    pub fn raw(&self) -> Option<&wgpu::Texture> {
        self.raw.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        self.release();
    }
}
