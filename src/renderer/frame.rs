//! Frame Renderer
//!
//! Runs one frame as a fixed sequence:
//!
//! ```text
//! Resize → ClearAndSkybox → Opaque → Transparent → Resolve → Invalidate → Tonemap
//! ```
//!
//! The first three scene steps share one render pass over the multisampled
//! working framebuffer; they differ only in pipeline state. Presenting the
//! output is left to the caller.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec4;

use crate::assets::mesh::Mesh;
use crate::assets::paths::{ASTEROID_MESH, AssetPaths, SKYBOX_TEXTURE};
use crate::errors::Result;
use crate::renderer::core::GpuContext;
use crate::renderer::core::resources::{Environment, Framebuffer, MipmapGenerator, ResolvePair, Slot};
use crate::renderer::mesh::{MaterialTextures, PbrAsteroid, PbrRenderer};
use crate::renderer::passes::{SkyboxPass, TonemapPass};
use crate::renderer::settings::{EnvironmentSettings, RendererSettings};
use crate::renderer::targets::{COLOR_FORMATS, DEPTH_FORMAT, PassKind, TargetLayout};
use crate::scene::{Camera, SceneSettings};

const RESOLVE_PAIRS: [ResolvePair; 3] = [
    ResolvePair::color(Slot::Color0, Slot::Color0),
    ResolvePair::color(Slot::Color1, Slot::Color1),
    ResolvePair::color(Slot::Color2, Slot::Color2),
];

/// What one call to [`FrameRenderer::render`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Attachments reallocated by the resize step, both framebuffers.
    pub reallocated: usize,
    /// Color slots resolved into the resolve framebuffer.
    pub resolved: usize,
    /// Whether the tonemap pass drew (as opposed to only clearing the output).
    pub tonemapped: bool,
}

pub struct FrameRenderer {
    working: Framebuffer,
    resolved: Framebuffer,
    skybox: SkyboxPass,
    tonemap: TonemapPass,
    mesh: Box<dyn PbrRenderer>,
    environment: Arc<Environment>,
    settings: RendererSettings,
    targets: TargetLayout,
    size: (u32, u32),
}

impl FrameRenderer {
    /// Pipeline-facing shape of the working framebuffer for this adapter.
    ///
    /// Mesh renderers passed to [`Self::new`] must be built with this layout.
    #[must_use]
    pub fn target_layout(ctx: &GpuContext, settings: &RendererSettings) -> TargetLayout {
        let mut formats = COLOR_FORMATS.to_vec();
        formats.push(DEPTH_FORMAT);
        let sample_count = ctx.supported_sample_count(settings.msaa_samples, &formats);
        if sample_count != settings.msaa_samples {
            log::warn!(
                "MSAA: requested {} samples, using {sample_count}",
                settings.msaa_samples
            );
        }
        TargetLayout { sample_count }
    }

    /// Creates both framebuffers and the fixed passes.
    ///
    /// An incomplete framebuffer is a setup error.
    pub fn new(
        ctx: &GpuContext,
        shader_dir: &Path,
        settings: &RendererSettings,
        environment: Arc<Environment>,
        mesh: Box<dyn PbrRenderer>,
        targets: TargetLayout,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let device = &ctx.device;
        let (width, height) = (width.max(1), height.max(1));

        let mut working = Framebuffer::new("Working");
        for (slot, format) in Slot::COLORS.into_iter().zip(COLOR_FORMATS) {
            working.attach_renderbuffer(device, slot, format, width, height, targets.sample_count);
        }
        working.attach_renderbuffer(device, Slot::Depth, DEPTH_FORMAT, width, height, targets.sample_count);
        working.require_complete()?;

        let mut resolved = Framebuffer::new("Resolve");
        for (slot, format) in Slot::COLORS.into_iter().zip(COLOR_FORMATS) {
            resolved.attach_texture(device, slot, format, width, height);
        }
        resolved.require_complete()?;

        let skybox = SkyboxPass::new(device, shader_dir, Arc::clone(&environment), targets)?;
        let tonemap = TonemapPass::new(device, shader_dir, output_format);

        if !mesh.is_usable() {
            log::error!("Mesh renderer is unusable, the scene will only show the sky");
        }
        log::info!(
            "Frame renderer ready: {width}x{height}, {} samples, output {output_format:?}",
            targets.sample_count
        );

        Ok(Self {
            working,
            resolved,
            skybox,
            tonemap,
            mesh,
            environment,
            settings: settings.clone(),
            targets,
            size: (width, height),
        })
    }

    /// Loads the skybox and asteroid from the fixed asset layout and builds
    /// the whole renderer.
    pub fn from_assets(
        ctx: &GpuContext,
        paths: &AssetPaths,
        settings: &RendererSettings,
        environment_settings: &EnvironmentSettings,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let started = Instant::now();
        let shader_dir = paths.shaders_dir();

        let environment = Arc::new(Environment::from_file(
            &ctx.device,
            &ctx.queue,
            &shader_dir,
            &paths.texture(SKYBOX_TEXTURE),
            environment_settings,
        )?);

        let mesh = Mesh::from_file(paths.mesh(ASTEROID_MESH))?;
        let mut mipmaps = MipmapGenerator::new(&ctx.device, &shader_dir)?;
        let textures = MaterialTextures::load(&ctx.device, &ctx.queue, &mesh.textures, &mut mipmaps)?;

        let targets = Self::target_layout(ctx, settings);
        let asteroid = PbrAsteroid::new(
            &ctx.device,
            &ctx.queue,
            &shader_dir,
            &mesh,
            textures,
            Some(Arc::clone(&environment)),
            targets,
            settings.effective_max_tess_level(),
        );

        let renderer = Self::new(
            ctx,
            &shader_dir,
            settings,
            environment,
            Box::new(asteroid),
            targets,
            output_format,
            width,
            height,
        )?;
        log::info!("Scene setup took {:.2?}", started.elapsed());
        Ok(renderer)
    }

    /// Resizes both framebuffers. Unchanged or zero extents are a no-op.
    ///
    /// Returns the number of reallocated attachments.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        let reallocated =
            self.working.resize_all(device, width, height) + self.resolved.resize_all(device, width, height);
        if reallocated > 0 {
            log::debug!("Frame renderer resized to {width}x{height}");
        }
        self.size = (width, height);
        reallocated
    }

    /// Renders one frame into `output`, which must have the output format
    /// given at construction and extent `width × height`.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        output: &wgpu::TextureView,
        width: u32,
        height: u32,
        camera: &Camera,
        scene: &SceneSettings,
    ) -> FrameStats {
        let mut stats = FrameStats {
            reallocated: self.resize(&ctx.device, width, height),
            ..Default::default()
        };
        let (width, height) = self.size;

        let viewport = Vec4::new(0.0, 0.0, width as f32, height as f32);
        let projection = camera.projection();
        let view = camera.view();
        self.mesh
            .set_shading_uniforms(&scene.lights, viewport, projection, view, scene.model_matrix());
        self.skybox.set_view(projection, view);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut pass = self.working.bind(&mut encoder, Some(self.settings.clear_color));
            self.skybox.render(&ctx.queue, &mut pass);
            for kind in PassKind::ALL {
                self.mesh.render(&ctx.queue, &mut pass, kind);
            }
        }

        stats.resolved = self.working.resolve(&mut encoder, &self.resolved, &RESOLVE_PAIRS);
        self.working.invalidate_attachments(&Slot::COLORS);

        match self.tonemap.prepare(&ctx.device, &self.resolved) {
            Ok(()) => stats.tonemapped = self.tonemap.is_usable(),
            Err(err) => log::error!("Tonemap pass skipped: {err}"),
        }
        self.tonemap.render(&ctx.queue, &mut encoder, output);

        ctx.queue.submit(Some(encoder.finish()));
        stats
    }

    #[must_use]
    pub fn working(&self) -> &Framebuffer {
        &self.working
    }

    #[must_use]
    pub fn resolved(&self) -> &Framebuffer {
        &self.resolved
    }

    #[must_use]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    #[must_use]
    pub fn mesh(&self) -> &dyn PbrRenderer {
        self.mesh.as_ref()
    }

    pub fn tonemap_mut(&mut self) -> &mut TonemapPass {
        &mut self.tonemap
    }

    #[must_use]
    pub fn targets(&self) -> TargetLayout {
        self.targets
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}
