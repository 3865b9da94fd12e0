use std::path::Path;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};

use crate::assets::mesh::Mesh;
use crate::renderer::core::resources::binding::{storage_buffer_entry, uniform_entry};
use crate::renderer::core::resources::{
    DrawMode, Environment, Geometry, ShaderProgram, ShaderStage, UniformBuffer,
};
use crate::renderer::targets::{PassKind, TargetLayout};
use crate::scene::Light;

use super::tessellation::tess_level_for;
use super::{FrameBlocks, MaterialBinding, MaterialTextures, NUM_LIGHTS, PbrRenderer, create_pass_pipelines};

/// Displacement amplitude relative to the mesh's bounding radius.
const DISPLACEMENT_SCALE: f32 = 0.04;
/// Noise frequency, in cycles per bounding radius.
const NOISE_CYCLES: f32 = 4.0;

/// `@group(0) @binding(3)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewInfo {
    pub model_view: Mat4,
    pub projection: Mat4,
    /// `(x, y, width, height)` in pixels.
    pub viewport: Vec4,
}

impl Default for ViewInfo {
    fn default() -> Self {
        Self {
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Vec4::ZERO,
        }
    }
}

/// `@group(0) @binding(4)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TessControl {
    /// Subdivision level of the current frame, `1..=max_level`.
    pub level: u32,
    pub max_level: u32,
    /// Model-space amplitude of the height function.
    pub displacement: f32,
    /// Model-space frequency of the height function.
    pub frequency: f32,
}

impl TessControl {
    #[must_use]
    pub fn for_radius(radius: f32, max_level: u32) -> Self {
        let radius = if radius > 0.0 { radius } else { 1.0 };
        Self {
            level: 1,
            max_level: max_level.max(1),
            displacement: DISPLACEMENT_SCALE * radius,
            frequency: NOISE_CYCLES / radius,
        }
    }
}

/// Tessellated asteroid.
///
/// Draws each triangle of the source mesh as one instanced patch; the vertex
/// shader (`pbr_asteroid_vs`) fetches the three control points from storage
/// buffers, interpolates them at the subdivision weights and displaces the
/// result along the interpolated normal. Shading is shared with the flat mesh
/// (`pbr_fs`).
pub struct PbrAsteroid {
    geometry: Geometry,
    material: MaterialBinding,
    blocks: FrameBlocks,
    view_info: UniformBuffer<ViewInfo>,
    tess_control: UniformBuffer<TessControl>,
    radius: f32,
    program: ShaderProgram,
    bind_groups: [wgpu::BindGroup; 2],
    patch_group: Option<wgpu::BindGroup>,
    pipelines: Option<[wgpu::RenderPipeline; 2]>,
}

impl PbrAsteroid {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader_dir: &Path,
        mesh: &Mesh,
        textures: MaterialTextures,
        environment: Option<Arc<Environment>>,
        targets: TargetLayout,
        max_tess_level: u32,
    ) -> Self {
        let geometry = Geometry::from_mesh(device, mesh, DrawMode::Patches { control_points: 3 }, "PbrAsteroid");
        let material = MaterialBinding::new(device, queue, textures, environment, "PbrAsteroid");
        let blocks = FrameBlocks::new(device, queue, "PbrAsteroid");
        let radius = mesh.bounding_radius();
        let view_info = UniformBuffer::new(device, ViewInfo::default(), "PbrAsteroid ViewInfo");
        let tess_control = UniformBuffer::new(
            device,
            TessControl::for_radius(radius, max_tess_level),
            "PbrAsteroid TessControl",
        );

        let program = ShaderProgram::from_files(
            device,
            "PbrAsteroid",
            &[
                (ShaderStage::Vertex, shader_dir.join("pbr_asteroid_vs.wgsl")),
                (ShaderStage::Fragment, shader_dir.join("pbr_fs.wgsl")),
            ],
        );

        let all = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let [e0, e1, e2] = FrameBlocks::layout_entries();
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PbrAsteroid Frame Layout"),
            entries: &[e0, e1, e2, uniform_entry(3, all), uniform_entry(4, all)],
        });
        let bind_groups = PassKind::ALL.map(|kind| {
            let [b0, b1, b2] = blocks.entries(kind);
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("PbrAsteroid Frame {kind:?}")),
                layout: &frame_layout,
                entries: &[
                    b0,
                    b1,
                    b2,
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: view_info.binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: tess_control.binding(),
                    },
                ],
            })
        });

        let patch_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PbrAsteroid Patch Layout"),
            entries: &[
                storage_buffer_entry(0, wgpu::ShaderStages::VERTEX),
                storage_buffer_entry(1, wgpu::ShaderStages::VERTEX),
            ],
        });
        let patch_group = match (geometry.vertex_buffer(), geometry.index_buffer()) {
            (Some(vertices), Some(indices)) => Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("PbrAsteroid Patches"),
                layout: &patch_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: vertices.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: indices.as_entire_binding(),
                    },
                ],
            })),
            _ => None,
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PbrAsteroid Pipeline Layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(material.layout()), Some(&patch_layout)],
            immediate_size: 0,
        });
        // 控制点来自 storage buffer，不走顶点输入
        let pipelines = create_pass_pipelines(device, "PbrAsteroid", &pipeline_layout, &program, &[], targets);

        log::info!(
            "PbrAsteroid: {} patches, radius {radius:.3}, max level {}",
            geometry.patch_count(),
            tess_control.get().max_level
        );

        Self {
            geometry,
            material,
            blocks,
            view_info,
            tess_control,
            radius,
            program,
            bind_groups,
            patch_group,
            pipelines,
        }
    }

    /// Subdivision level chosen by the last [`PbrRenderer::set_shading_uniforms`].
    #[must_use]
    pub fn tess_level(&self) -> u32 {
        self.tess_control.get().level
    }

    #[must_use]
    pub fn tess_control(&self) -> &TessControl {
        self.tess_control.get()
    }

    #[must_use]
    pub fn material(&self) -> &MaterialBinding {
        &self.material
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

impl PbrRenderer for PbrAsteroid {
    fn set_shading_uniforms(
        &mut self,
        lights: &[Light; NUM_LIGHTS],
        viewport: Vec4,
        projection: Mat4,
        view: Mat4,
        model: Mat4,
    ) {
        let levels = self.material.specular_levels();
        self.blocks.update(lights, projection, view, model, levels);

        let model_view = view * model;
        *self.view_info.get_mut() = ViewInfo {
            model_view,
            projection,
            viewport,
        };

        let tess = self.tess_control.get_mut();
        tess.level = tess_level_for(
            self.radius,
            model_view,
            projection,
            Vec2::new(viewport.z, viewport.w),
            tess.max_level,
            self.geometry.patch_count(),
        );
    }

    fn render(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>, kind: PassKind) {
        let (Some(pipelines), Some(material), Some(patches)) =
            (&self.pipelines, self.material.bind_group(), &self.patch_group)
        else {
            return;
        };
        self.blocks.upload(queue);
        self.view_info.bind(queue);
        self.tess_control.bind(queue);

        pass.set_pipeline(&pipelines[kind.index()]);
        pass.set_bind_group(0, &self.bind_groups[kind.index()], &[]);
        pass.set_bind_group(1, material, &[]);
        pass.set_bind_group(2, patches, &[]);
        self.geometry.render_patches(pass, self.tess_level());
    }

    fn is_usable(&self) -> bool {
        self.program.is_usable()
            && self.pipelines.is_some()
            && self.patch_group.is_some()
            && self.material.bind_group().is_some()
    }
}
