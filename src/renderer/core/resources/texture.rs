//! GPU Texture Wrapper
//!
//! [`Texture`] owns one `wgpu::Texture` together with its default view and the
//! immutable allocation parameters (kind, size, mip levels, format).
//!
//! # Lifecycle
//!
//! | State     | `is_usable()` | How to get there                                  |
//! |-----------|---------------|---------------------------------------------------|
//! | Empty     | `false`       | `Texture::default()`, `Texture::new(kind)`, `release()`, `std::mem::take` |
//! | Allocated | `true`        | `storage()`, `with_storage()`, `from_image()`, `from_data()` |
//!
//! Storage is allocated at most once per instance; a second `storage()` call is
//! a logged no-op. The wrapper is move-only (no `Clone`), and dropping or
//! releasing it destroys the native texture exactly once.

use crate::assets::image::Image;
use crate::errors::{PbrError, Result};

use super::tracked::{ResourceId, record_release};

/// Texture topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureKind {
    #[default]
    D2,
    Cube,
}

impl TextureKind {
    #[inline]
    #[must_use]
    pub fn layers(self) -> u32 {
        match self {
            Self::D2 => 1,
            Self::Cube => 6,
        }
    }

    #[inline]
    #[must_use]
    pub fn view_dimension(self) -> wgpu::TextureViewDimension {
        match self {
            Self::D2 => wgpu::TextureViewDimension::D2,
            Self::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

/// Number of levels in a full mip chain for the given extent.
#[inline]
#[must_use]
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Move-only owner of a native GPU texture.
#[derive(Debug, Default)]
pub struct Texture {
    raw: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    kind: TextureKind,
    width: u32,
    height: u32,
    levels: u32,
    format: Option<wgpu::TextureFormat>,
    id: ResourceId,
}

impl Texture {
    /// Creates an empty texture of the given kind. No GPU memory is allocated.
    #[must_use]
    pub fn new(kind: TextureKind) -> Self {
        Self {
            raw: None,
            view: None,
            kind,
            width: 0,
            height: 0,
            levels: 0,
            format: None,
            id: ResourceId::NONE,
        }
    }

    /// Creates a texture and immediately allocates its storage.
    ///
    /// `levels == 0` requests a full mip chain.
    #[must_use]
    pub fn with_storage(
        device: &wgpu::Device,
        kind: TextureKind,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        levels: u32,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let mut texture = Self::new(kind);
        texture.storage(device, format, width, height, levels, usage, label);
        texture
    }

    /// Allocates immutable storage.
    ///
    /// Returns `true` when storage was allocated by this call. Calling it on a
    /// texture that already owns storage leaves the texture untouched and
    /// returns `false`.
    pub fn storage(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        levels: u32,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> bool {
        if self.raw.is_some() {
            log::warn!(
                "Texture '{label}': storage already allocated ({}x{}, {} levels), ignoring",
                self.width,
                self.height,
                self.levels
            );
            return false;
        }

        let max_levels = mip_level_count(width, height);
        let levels = if levels == 0 { max_levels } else { levels.min(max_levels) };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: self.kind.layers(),
            },
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view_usage = match self.kind {
            TextureKind::Cube => Some(wgpu::TextureUsages::TEXTURE_BINDING),
            TextureKind::D2 => None,
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(self.kind.view_dimension()),
            usage: view_usage,
            ..Default::default()
        });

        self.raw = Some(texture);
        self.view = Some(view);
        self.width = width;
        self.height = height;
        self.levels = levels;
        self.format = Some(format);
        self.id = ResourceId::next();
        true
    }

    /// Creates a single-level 2D texture from raw texel data.
    #[must_use]
    pub fn from_data(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        data: &[u8],
        label: &str,
    ) -> Self {
        let texture = Self::with_storage(
            device,
            TextureKind::D2,
            format,
            width,
            height,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            label,
        );
        texture.upload(queue, 0, data);
        texture
    }

    /// Creates a 2D texture from a decoded image and uploads mip level 0.
    ///
    /// HDR images become `Rgba16Float`; 8-bit images become `R8Unorm`,
    /// `Rg8Unorm` or (padded) `Rgba8Unorm[Srgb]` depending on their channel
    /// count. Remaining mip levels are left for a mipmap generator.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &Image,
        srgb: bool,
        levels: u32,
        label: &str,
    ) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PbrError::asset(label, "image has zero extent"));
        }

        let (format, bytes) = if image.is_hdr() {
            let bits = image.to_rgba16f_bits();
            (
                wgpu::TextureFormat::Rgba16Float,
                bytemuck::cast_slice(&bits).to_vec(),
            )
        } else {
            match image.channels() {
                1 => (wgpu::TextureFormat::R8Unorm, image.to_ldr_bytes()),
                2 => (wgpu::TextureFormat::Rg8Unorm, image.to_ldr_bytes()),
                _ if srgb => (wgpu::TextureFormat::Rgba8UnormSrgb, image.to_rgba8()),
                _ => (wgpu::TextureFormat::Rgba8Unorm, image.to_rgba8()),
            }
        };

        let texture = Self::with_storage(
            device,
            TextureKind::D2,
            format,
            image.width(),
            image.height(),
            levels,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            label,
        );
        texture.upload(queue, 0, &bytes);
        Ok(texture)
    }

    /// Writes tightly packed texel data into one mip level (all layers).
    pub fn upload(&self, queue: &wgpu::Queue, level: u32, data: &[u8]) {
        let (Some(texture), Some(format)) = (&self.raw, self.format) else {
            log::warn!("Texture::upload on an empty texture");
            return;
        };
        let Some(block_size) = format.block_copy_size(None) else {
            log::error!("Texture::upload: format {format:?} has no copy size");
            return;
        };

        let width = self.size_at_level(level);
        let height = (self.height >> level).max(1);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * block_size),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: self.kind.layers(),
            },
        );
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
        self.levels = 0;
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

    /// Default view (full mip chain, `D2` or `Cube` dimension).
    #[inline]
    #[must_use]
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    /// `D2Array` view over all layers of one mip level, for compute writes.
    #[must_use]
    pub fn storage_view(&self, level: u32) -> Option<wgpu::TextureView> {
        self.raw.as_ref().map(|texture| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Texture Storage View"),
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                usage: Some(wgpu::TextureUsages::STORAGE_BINDING),
                base_mip_level: level,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(self.kind.layers()),
                ..Default::default()
            })
        })
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> TextureKind {
        self.kind
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
    pub fn levels(&self) -> u32 {
        self.levels
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

    /// Width of the given mip level (never below 1).
    #[inline]
    #[must_use]
    pub fn size_at_level(&self, level: u32) -> u32 {
        (self.width >> level).max(1)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mip_chain_lengths() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(1024, 1024), 11);
        assert_eq!(mip_level_count(4, 2), 3);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn empty_texture_is_not_usable() {
        let mut texture = Texture::new(TextureKind::Cube);
        assert!(!texture.is_usable());
        assert_eq!(texture.kind(), TextureKind::Cube);
        assert!(texture.id().is_none());
        assert!(!texture.release());
        assert!(!texture.release());
    }

    #[test]
    fn cube_has_six_layers() {
        assert_eq!(TextureKind::Cube.layers(), 6);
        assert_eq!(TextureKind::D2.layers(), 1);
        assert_eq!(
            TextureKind::Cube.view_dimension(),
            wgpu::TextureViewDimension::Cube
        );
    }
}
