//! PBR Mesh Renderers
//!
//! Two independent renderer types share one capability trait, [`PbrRenderer`]:
//!
//! - [`PbrMesh`]: indexed triangles through the vertex input stage
//! - [`PbrAsteroid`]: patch geometry expanded by the subdivision vertex shader
//!
//! Both compose a [`MaterialBinding`] (bind group 1: four material maps, the
//! shared environment and two samplers) and own their per-frame uniform
//! blocks in bind group 0. Group 0 exists once per [`PassKind`]: the per-frame
//! buffers are shared, only the `BaseInfo` block with the opaque flag differs.

mod pbr_asteroid;
mod pbr_mesh;
pub mod tessellation;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::assets::image::Image;
use crate::assets::mesh::{MaterialRefs, TextureRef};
use crate::errors::Result;
use crate::renderer::core::resources::binding::{clamp_sampler, sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::resources::{
    ENTRY_POINT, Environment, MipmapGenerator, ShaderProgram, ShaderStage, Texture, TextureKind, UniformBuffer,
};
use crate::renderer::targets::{PassKind, TargetLayout};
use crate::scene::Light;

pub use pbr_asteroid::{PbrAsteroid, TessControl, ViewInfo};
pub use pbr_mesh::PbrMesh;
pub use tessellation::{TARGET_EDGE_PIXELS, subdivision_weights, tess_level_for, triangles_before_row};

/// Number of directional lights in the shading block.
pub const NUM_LIGHTS: usize = 3;

// ============================================================================
// Uniform blocks
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 4],
    pub radiance: [f32; 4],
}

/// `@group(0) @binding(1)`, fragment stage.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ShadingUniforms {
    pub lights: [LightUniform; NUM_LIGHTS],
    pub eye_position: [f32; 3],
    /// Mip levels of the bound specular cube.
    pub specular_levels: f32,
}

impl ShadingUniforms {
    /// Disabled lights get zero radiance; the eye is the view's origin in world space.
    #[must_use]
    pub fn new(lights: &[Light; NUM_LIGHTS], view: Mat4, specular_levels: u32) -> Self {
        let eye = view.inverse().transform_point3(Vec3::ZERO);
        Self {
            lights: lights.map(|light| LightUniform {
                direction: light.direction.extend(0.0).to_array(),
                radiance: light.effective_radiance().extend(0.0).to_array(),
            }),
            eye_position: eye.to_array(),
            specular_levels: specular_levels as f32,
        }
    }
}

/// `@group(0) @binding(0)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformUniforms {
    pub view_projection: Mat4,
    pub model: Mat4,
}

impl Default for TransformUniforms {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
        }
    }
}

/// `@group(0) @binding(2)`. One buffer per pass kind, written once.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BaseInfo {
    pub opaque_pass: u32,
    pub _pad: [u32; 3],
}

impl BaseInfo {
    #[must_use]
    pub fn for_pass(kind: PassKind) -> Self {
        Self {
            opaque_pass: kind.opaque_flag(),
            _pad: [0; 3],
        }
    }
}

// ============================================================================
// Renderer capability
// ============================================================================

/// What the frame renderer needs from a mesh renderer.
pub trait PbrRenderer {
    /// Updates the CPU copies of the per-frame uniform blocks.
    fn set_shading_uniforms(
        &mut self,
        lights: &[Light; NUM_LIGHTS],
        viewport: Vec4,
        projection: Mat4,
        view: Mat4,
        model: Mat4,
    );

    /// Uploads the per-frame blocks and records the draw for one pass.
    ///
    /// Skips silently when [`Self::is_usable`] is false.
    fn render(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>, kind: PassKind);

    fn is_usable(&self) -> bool;
}

// ============================================================================
// Material textures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialSlot {
    Albedo,
    Normals,
    Metalness,
    Roughness,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 4] = [Self::Albedo, Self::Normals, Self::Metalness, Self::Roughness];

    /// 1×1 fallback used when the mesh names no texture for this slot.
    #[must_use]
    pub fn default_texel(self) -> (wgpu::TextureFormat, [u8; 4]) {
        match self {
            Self::Albedo => (wgpu::TextureFormat::Rgba8Unorm, [128, 128, 128, 255]),
            // RGB (0, 0, 255), padded
            Self::Normals => (wgpu::TextureFormat::Rgba8Unorm, [0, 0, 255, 255]),
            Self::Metalness | Self::Roughness => (wgpu::TextureFormat::R8Unorm, [128, 0, 0, 0]),
        }
    }

    /// Channels requested from the image loader.
    #[must_use]
    pub fn channels(self) -> u32 {
        match self {
            Self::Albedo => 4,
            Self::Normals => 3,
            Self::Metalness | Self::Roughness => 1,
        }
    }

    #[must_use]
    pub fn srgb(self) -> bool {
        self == Self::Albedo
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Albedo => "Albedo",
            Self::Normals => "Normals",
            Self::Metalness => "Metalness",
            Self::Roughness => "Roughness",
        }
    }
}

/// The four material maps of one mesh.
#[derive(Debug)]
pub struct MaterialTextures {
    pub albedo: Texture,
    pub normals: Texture,
    pub metalness: Texture,
    pub roughness: Texture,
}

impl MaterialTextures {
    /// All four slots filled with their constant fallbacks.
    #[must_use]
    pub fn defaults(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let make = |slot: MaterialSlot| default_texture(device, queue, slot);
        Self {
            albedo: make(MaterialSlot::Albedo),
            normals: make(MaterialSlot::Normals),
            metalness: make(MaterialSlot::Metalness),
            roughness: make(MaterialSlot::Roughness),
        }
    }

    /// Loads the referenced maps with full mip chains; missing references use
    /// the fallbacks. A reference that fails to load is an error.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        refs: &MaterialRefs,
        mipmaps: &mut MipmapGenerator,
    ) -> Result<Self> {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Material Mipmaps"),
        });

        let mut load = |slot: MaterialSlot, reference: Option<&TextureRef>| -> Result<Texture> {
            let Some(reference) = reference else {
                return Ok(default_texture(device, queue, slot));
            };
            let image = match reference.channel {
                Some(channel) => Image::from_file(&reference.path, 0)?.extract_channel(channel)?,
                None => Image::from_file(&reference.path, slot.channels())?,
            };
            let label = format!("Material {}", slot.label());
            let texture = Texture::from_image(device, queue, &image, slot.srgb(), 0, &label)?;
            mipmaps.generate(device, &mut encoder, &texture);
            Ok(texture)
        };

        let textures = Self {
            albedo: load(MaterialSlot::Albedo, refs.albedo.as_ref())?,
            normals: load(MaterialSlot::Normals, refs.normals.as_ref())?,
            metalness: load(MaterialSlot::Metalness, refs.metalness.as_ref())?,
            roughness: load(MaterialSlot::Roughness, refs.roughness.as_ref())?,
        };
        queue.submit(Some(encoder.finish()));
        Ok(textures)
    }

    #[must_use]
    pub fn get(&self, slot: MaterialSlot) -> &Texture {
        match slot {
            MaterialSlot::Albedo => &self.albedo,
            MaterialSlot::Normals => &self.normals,
            MaterialSlot::Metalness => &self.metalness,
            MaterialSlot::Roughness => &self.roughness,
        }
    }
}

fn default_texture(device: &wgpu::Device, queue: &wgpu::Queue, slot: MaterialSlot) -> Texture {
    let (format, texel) = slot.default_texel();
    let bytes = format.block_copy_size(None).unwrap_or(4) as usize;
    Texture::from_data(
        device,
        queue,
        format,
        1,
        1,
        &texel[..bytes.min(4)],
        &format!("Default {}", slot.label()),
    )
}

/// Black 1×1 stand-in for a missing environment texture.
fn placeholder_texture(device: &wgpu::Device, queue: &wgpu::Queue, kind: TextureKind, label: &str) -> Texture {
    let texture = Texture::with_storage(
        device,
        kind,
        wgpu::TextureFormat::Rgba8Unorm,
        1,
        1,
        1,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label,
    );
    texture.upload(queue, 0, &vec![0u8; 4 * kind.layers() as usize]);
    texture
}

// ============================================================================
// Material bind group (group 1)
// ============================================================================

/// Layout entries of bind group 1.
///
/// | binding | resource                  |
/// |---------|---------------------------|
/// | 0..=3   | albedo, normals, metalness, roughness |
/// | 4       | specular cube             |
/// | 5       | irradiance cube           |
/// | 6       | BRDF LUT                  |
/// | 7       | material sampler (repeat) |
/// | 8       | environment sampler (clamp) |
#[must_use]
pub fn material_layout_entries() -> [wgpu::BindGroupLayoutEntry; 9] {
    let fs = wgpu::ShaderStages::FRAGMENT;
    let d2 = wgpu::TextureViewDimension::D2;
    let cube = wgpu::TextureViewDimension::Cube;
    [
        texture_entry(0, fs, d2),
        texture_entry(1, fs, d2),
        texture_entry(2, fs, d2),
        texture_entry(3, fs, d2),
        texture_entry(4, fs, cube),
        texture_entry(5, fs, cube),
        texture_entry(6, fs, d2),
        sampler_entry(7, fs),
        sampler_entry(8, fs),
    ]
}

/// Material maps plus the (optional) shared environment, bound as group 1.
pub struct MaterialBinding {
    layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    textures: MaterialTextures,
    environment: Option<Arc<Environment>>,
    // 无环境时的占位纹理
    placeholders: Option<[Texture; 3]>,
    specular_levels: u32,
}

impl MaterialBinding {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        textures: MaterialTextures,
        environment: Option<Arc<Environment>>,
        label: &str,
    ) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Material Layout")),
            entries: &material_layout_entries(),
        });

        let placeholders = environment.is_none().then(|| {
            [
                placeholder_texture(device, queue, TextureKind::Cube, "Specular Placeholder"),
                placeholder_texture(device, queue, TextureKind::Cube, "Irradiance Placeholder"),
                placeholder_texture(device, queue, TextureKind::D2, "BRDF LUT Placeholder"),
            ]
        });
        let specular_levels = environment.as_ref().map_or(1, |env| env.specular_levels());

        let mut binding = Self {
            layout,
            bind_group: None,
            textures,
            environment,
            placeholders,
            specular_levels,
        };
        binding.bind_group = binding.create_bind_group(device, label);
        binding
    }

    fn environment_textures(&self) -> Option<[&Texture; 3]> {
        match (&self.environment, &self.placeholders) {
            (Some(env), _) => Some([env.specular(), env.irradiance(), env.brdf_lut()]),
            (None, Some([specular, irradiance, lut])) => Some([specular, irradiance, lut]),
            (None, None) => None,
        }
    }

    fn create_bind_group(&self, device: &wgpu::Device, label: &str) -> Option<wgpu::BindGroup> {
        let env = self.environment_textures()?;
        let mut views = Vec::with_capacity(7);
        for slot in MaterialSlot::ALL {
            views.push(self.textures.get(slot).view()?);
        }
        for texture in env {
            views.push(texture.view()?);
        }

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Material Sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });
        let environment_sampler = clamp_sampler(device, &format!("{label} Environment Sampler"));

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .into_iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 7,
            resource: wgpu::BindingResource::Sampler(&material_sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 8,
            resource: wgpu::BindingResource::Sampler(&environment_sampler),
        });

        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Material")),
            layout: &self.layout,
            entries: &entries,
        }))
    }

    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    #[must_use]
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    #[must_use]
    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    #[must_use]
    pub fn environment(&self) -> Option<&Arc<Environment>> {
        self.environment.as_ref()
    }

    #[must_use]
    pub fn specular_levels(&self) -> u32 {
        self.specular_levels
    }
}

// ============================================================================
// Per-frame uniform set (group 0)
// ============================================================================

/// Group-0 buffers shared by both renderers: transform, shading and the two
/// `BaseInfo` blocks, plus one bind group per pass kind.
pub(crate) struct FrameBlocks {
    pub transform: UniformBuffer<TransformUniforms>,
    pub shading: UniformBuffer<ShadingUniforms>,
    base_info: [UniformBuffer<BaseInfo>; 2],
}

impl FrameBlocks {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, label: &str) -> Self {
        let base_info = PassKind::ALL.map(|kind| {
            UniformBuffer::new(device, BaseInfo::for_pass(kind), &format!("{label} BaseInfo {kind:?}"))
        });
        for buffer in &base_info {
            buffer.bind(queue);
        }
        Self {
            transform: UniformBuffer::new(device, TransformUniforms::default(), &format!("{label} Transform")),
            shading: UniformBuffer::new(device, ShadingUniforms::default(), &format!("{label} Shading")),
            base_info,
        }
    }

    /// Layout entries 0..=2; renderers append their own blocks.
    pub fn layout_entries() -> [wgpu::BindGroupLayoutEntry; 3] {
        let all = wgpu::ShaderStages::VERTEX_FRAGMENT;
        [uniform_entry(0, all), uniform_entry(1, all), uniform_entry(2, all)]
    }

    /// Entries 0..=2 for the bind group of `kind`.
    pub fn entries(&self, kind: PassKind) -> [wgpu::BindGroupEntry<'_>; 3] {
        [
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.transform.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: self.shading.binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: self.base_info[kind.index()].binding(),
            },
        ]
    }

    pub fn update(
        &mut self,
        lights: &[Light; NUM_LIGHTS],
        projection: Mat4,
        view: Mat4,
        model: Mat4,
        specular_levels: u32,
    ) {
        *self.transform.get_mut() = TransformUniforms {
            view_projection: projection * view,
            model,
        };
        *self.shading.get_mut() = ShadingUniforms::new(lights, view, specular_levels);
    }

    /// Pushes the per-frame blocks to the GPU.
    pub fn upload(&self, queue: &wgpu::Queue) {
        self.transform.bind(queue);
        self.shading.bind(queue);
    }
}

/// Opaque and transparent pipelines of one renderer.
pub(crate) fn create_pass_pipelines(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    program: &ShaderProgram,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    targets: TargetLayout,
) -> Option<[wgpu::RenderPipeline; 2]> {
    let vs = program.module(ShaderStage::Vertex)?;
    let fs = program.module(ShaderStage::Fragment)?;

    Some(PassKind::ALL.map(|kind| {
        let color_targets = targets.color_targets(kind.blend());
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label} {kind:?} Pipeline")),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: vs,
                entry_point: Some(ENTRY_POINT),
                buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fs,
                entry_point: Some(ENTRY_POINT),
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(kind.depth_stencil()),
            multisample: targets.multisample(),
            multiview_mask: None,
            cache: None,
        })
    }))
}
