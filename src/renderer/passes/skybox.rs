use std::path::Path;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::assets::mesh::Mesh;
use crate::errors::{PbrError, Result};
use crate::renderer::core::resources::binding::{clamp_sampler, sampler_entry, texture_entry, uniform_entry};
use crate::renderer::core::resources::{
    DrawMode, ENTRY_POINT, Environment, Geometry, ShaderProgram, ShaderStage, UniformBuffer,
};
use crate::renderer::targets::{DEPTH_FORMAT, TargetLayout};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyboxUniforms {
    /// `projection · rotation(view)`; the translation is stripped.
    pub sky_view_projection: Mat4,
}

/// `projection · mat4(mat3(view))`: the view with its translation dropped.
#[must_use]
pub fn sky_view_projection(projection: Mat4, view: Mat4) -> Mat4 {
    projection * Mat4::from_mat3(Mat3::from_mat4(view))
}

/// Environment cube drawn around the camera before any scene geometry.
///
/// Depth is neither tested nor written, so the sky sits behind everything
/// drawn after it in the same pass.
pub struct SkyboxPass {
    geometry: Geometry,
    uniforms: UniformBuffer<SkyboxUniforms>,
    bind_group: wgpu::BindGroup,
    pipeline: Option<wgpu::RenderPipeline>,
    _environment: Arc<Environment>,
}

impl SkyboxPass {
    pub fn new(
        device: &wgpu::Device,
        shader_dir: &Path,
        environment: Arc<Environment>,
        targets: TargetLayout,
    ) -> Result<Self> {
        let program = ShaderProgram::from_files(
            device,
            "Skybox",
            &[
                (ShaderStage::Vertex, shader_dir.join("skybox_vs.wgsl")),
                (ShaderStage::Fragment, shader_dir.join("skybox_fs.wgsl")),
            ],
        );

        let geometry = Geometry::from_mesh(device, &Mesh::cube(), DrawMode::Triangles, "Skybox");
        let uniforms = UniformBuffer::new(
            device,
            SkyboxUniforms {
                sky_view_projection: Mat4::IDENTITY,
            },
            "Skybox Uniforms",
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skybox Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                texture_entry(1, wgpu::ShaderStages::FRAGMENT, wgpu::TextureViewDimension::Cube),
                sampler_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let view = environment.specular().view().ok_or_else(|| PbrError::AssetLoad {
            path: "environment".into(),
            reason: "specular cube has no storage".into(),
        })?;
        let sampler = clamp_sampler(device, "Skybox Sampler");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skybox Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let pipeline = match (program.module(ShaderStage::Vertex), program.module(ShaderStage::Fragment)) {
            (Some(vs), Some(fs)) => {
                let color_targets = targets.color_targets(None);
                Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Skybox Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: vs,
                        entry_point: Some(ENTRY_POINT),
                        buffers: &[Geometry::vertex_layout()],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: fs,
                        entry_point: Some(ENTRY_POINT),
                        targets: &color_targets,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    // 从立方体内部观察，不做剔除
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DEPTH_FORMAT,
                        depth_write_enabled: Some(false),
                        depth_compare: Some(wgpu::CompareFunction::Always),
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: targets.multisample(),
                    multiview_mask: None,
                    cache: None,
                }))
            }
            _ => None,
        };

        Ok(Self {
            geometry,
            uniforms,
            bind_group,
            pipeline,
            _environment: environment,
        })
    }

    pub fn set_view(&mut self, projection: Mat4, view: Mat4) {
        self.uniforms.get_mut().sky_view_projection = sky_view_projection(projection, view);
    }

    #[must_use]
    pub fn sky_view_projection(&self) -> Mat4 {
        self.uniforms.get().sky_view_projection
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn render(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        self.uniforms.bind(queue);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        self.geometry.render(pass);
    }
}
