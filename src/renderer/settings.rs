//! Renderer Settings
//!
//! Plain configuration structs with sensible defaults. Override individual
//! fields with struct update syntax:
//!
//! ```rust,ignore
//! use pbr_asteroid::renderer::settings::RendererSettings;
//!
//! let settings = RendererSettings {
//!     msaa_samples: 4,
//!     vsync: false,
//!     ..Default::default()
//! };
//! ```

/// Hard upper bound of the emulated tessellation level.
pub const MAX_TESS_LEVEL_CAP: u32 = 64;

/// Frame renderer and device configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Requested MSAA sample count of the working framebuffer.
    ///
    /// Clamped down to the largest count the adapter supports for every
    /// working-framebuffer format.
    pub msaa_samples: u32,

    /// Upper bound of the per-frame tessellation level, capped at
    /// [`MAX_TESS_LEVEL_CAP`].
    pub max_tess_level: u32,

    pub vsync: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Clear color of the working framebuffer.
    pub clear_color: wgpu::Color,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            msaa_samples: 8,
            max_tess_level: 16,
            vsync: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }
}

impl RendererSettings {
    /// `max_tess_level` clamped to `[1, MAX_TESS_LEVEL_CAP]`.
    #[must_use]
    pub fn effective_max_tess_level(&self) -> u32 {
        self.max_tess_level.clamp(1, MAX_TESS_LEVEL_CAP)
    }
}

/// Sizes of the precomputed image-based-lighting textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSettings {
    /// Face size of the specular environment cube.
    pub cube_size: u32,
    /// Face size of the irradiance cube.
    pub irradiance_size: u32,
    /// Edge size of the BRDF lookup table.
    pub brdf_lut_size: u32,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            cube_size: 1024,
            irradiance_size: 32,
            brdf_lut_size: 256,
        }
    }
}
