//! Working-framebuffer formats and the per-pass pipeline states that target them.

/// Radiance (color 0) and transparent accumulation (color 1).
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Transparent coverage (color 2).
pub const AUX_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Color formats in slot order.
pub const COLOR_FORMATS: [wgpu::TextureFormat; 3] = [HDR_FORMAT, HDR_FORMAT, AUX_FORMAT];

/// Which half of the scene a draw belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Depth test + write, no blending.
    Opaque,
    /// Depth test without write, additive blending into every target.
    Transparent,
}

impl PassKind {
    pub const ALL: [PassKind; 2] = [PassKind::Opaque, PassKind::Transparent];

    /// Value of the shader's `opaque_pass` flag.
    #[inline]
    #[must_use]
    pub fn opaque_flag(self) -> u32 {
        u32::from(self == PassKind::Opaque)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            PassKind::Opaque => 0,
            PassKind::Transparent => 1,
        }
    }

    #[must_use]
    pub fn blend(self) -> Option<wgpu::BlendState> {
        match self {
            PassKind::Opaque => None,
            PassKind::Transparent => {
                let additive = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                })
            }
        }
    }

    #[must_use]
    pub fn depth_stencil(self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: Some(self == PassKind::Opaque),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Shape of the working framebuffer as seen by pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    pub sample_count: u32,
}

impl TargetLayout {
    #[must_use]
    pub fn color_targets(&self, blend: Option<wgpu::BlendState>) -> [Option<wgpu::ColorTargetState>; 3] {
        COLOR_FORMATS.map(|format| {
            Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
    }

    #[must_use]
    pub fn multisample(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.sample_count.max(1),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_pass_is_additive_without_depth_writes() {
        let opaque = PassKind::Opaque;
        let transparent = PassKind::Transparent;

        assert!(opaque.blend().is_none());
        assert_eq!(opaque.depth_stencil().depth_write_enabled, Some(true));
        assert_eq!(opaque.opaque_flag(), 1);

        let blend = transparent.blend().unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(transparent.depth_stencil().depth_write_enabled, Some(false));
        assert_eq!(transparent.depth_stencil().depth_compare, Some(wgpu::CompareFunction::Less));
        assert_eq!(transparent.opaque_flag(), 0);
    }
}
