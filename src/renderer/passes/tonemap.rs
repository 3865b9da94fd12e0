use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::errors::{PbrError, Result};
use crate::renderer::core::resources::binding::{load_texture_entry, uniform_entry};
use crate::renderer::core::resources::{
    ENTRY_POINT, Framebuffer, FramebufferStatus, Geometry, ResourceId, ShaderProgram, ShaderStage, Slot,
    UniformBuffer,
};

/// Display gamma applied when the output format does not encode sRGB itself.
pub const DISPLAY_GAMMA: f32 = 2.2;

// 定义 Uniform 数据
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TonemapUniforms {
    pub exposure: f32,
    /// `1.0` for sRGB outputs.
    pub gamma: f32,
    pub _pad: [f32; 2],
}

impl TonemapUniforms {
    #[must_use]
    pub fn for_output(format: wgpu::TextureFormat) -> Self {
        Self {
            exposure: 1.0,
            gamma: if format.is_srgb() { 1.0 } else { DISPLAY_GAMMA },
            _pad: [0.0; 2],
        }
    }
}

/// Composites the three resolved targets into the output view.
///
/// `color = radiance · (1 - coverage) + accumulated`, then ACES filmic
/// tonemapping. The input textures are read with `textureLoad`, so the pass
/// has no sampler.
pub struct TonemapPass {
    layout: wgpu::BindGroupLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    uniforms: UniformBuffer<TonemapUniforms>,
    geometry: Geometry,
    // 运行时状态 (prepare 生成，render 使用)
    bind_group: Option<wgpu::BindGroup>,
    bound_ids: [ResourceId; 3],
}

impl TonemapPass {
    #[must_use]
    pub fn new(device: &wgpu::Device, shader_dir: &Path, output_format: wgpu::TextureFormat) -> Self {
        let program = ShaderProgram::from_files(
            device,
            "Tonemap",
            &[
                (ShaderStage::Vertex, shader_dir.join("tonemap_vs.wgsl")),
                (ShaderStage::Fragment, shader_dir.join("tonemap_fs.wgsl")),
            ],
        );

        let fs = wgpu::ShaderStages::FRAGMENT;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tonemap Layout"),
            entries: &[
                load_texture_entry(0, fs),
                load_texture_entry(1, fs),
                load_texture_entry(2, fs),
                uniform_entry(3, fs),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tonemap Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let pipeline = match (program.module(ShaderStage::Vertex), program.module(ShaderStage::Fragment)) {
            (Some(vs), Some(fs)) => Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Tonemap Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vs,
                    entry_point: Some(ENTRY_POINT),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fs,
                    entry_point: Some(ENTRY_POINT),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })),
            _ => None,
        };

        Self {
            layout,
            pipeline,
            uniforms: UniformBuffer::new(
                device,
                TonemapUniforms::for_output(output_format),
                "Tonemap Uniforms",
            ),
            geometry: Geometry::FullScreenTriangle,
            bind_group: None,
            bound_ids: [ResourceId::NONE; 3],
        }
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.uniforms.get_mut().exposure = exposure;
    }

    #[must_use]
    pub fn uniforms(&self) -> &TonemapUniforms {
        self.uniforms.get()
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Binds the resolve framebuffer's color slots, rebuilding the bind group
    /// only when a slot was reallocated.
    ///
    /// Fails with [`PbrError::RuntimeCast`] when a slot is backed by a
    /// renderbuffer. The previous bind group is dropped in that case.
    pub fn prepare(&mut self, device: &wgpu::Device, resolved: &Framebuffer) -> Result<()> {
        let mut textures = Vec::with_capacity(3);
        for slot in Slot::COLORS {
            let target = resolved
                .get_render_target(slot)
                .ok_or(PbrError::FramebufferIncomplete(FramebufferStatus::MissingAttachment(slot)))
                .inspect_err(|_| self.bind_group = None)?;
            let texture = target.as_texture(slot).inspect_err(|_| self.bind_group = None)?;
            textures.push(texture);
        }

        let ids = [textures[0].id(), textures[1].id(), textures[2].id()];
        if self.bind_group.is_some() && ids == self.bound_ids {
            return Ok(());
        }

        let mut entries = Vec::with_capacity(4);
        for (binding, texture) in textures.iter().enumerate() {
            let view = texture.view().ok_or(PbrError::RuntimeCast {
                slot: Slot::COLORS[binding],
                expected: "allocated texture",
            })?;
            entries.push(wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 3,
            resource: self.uniforms.binding(),
        });

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tonemap"),
            layout: &self.layout,
            entries: &entries,
        }));
        self.bound_ids = ids;
        log::debug!("Tonemap bind group rebuilt for {ids:?}");
        Ok(())
    }

    /// Draws the full-screen triangle into `target`.
    ///
    /// Without a prepared bind group the target is only cleared.
    pub fn render(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Tonemap Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (Some(pipeline), Some(bind_group)) = (&self.pipeline, &self.bind_group) else {
            return;
        };
        self.uniforms.bind(queue);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        self.geometry.render(&mut pass);
    }
}
