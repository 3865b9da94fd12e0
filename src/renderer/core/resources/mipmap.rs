// ============================================================================
// Mipmap Generator
// ============================================================================
//
// Box-filter downsampling by rendering each level from the previous one with a
// full-screen triangle. Cube textures are processed face by face through 2D
// views, so the same pipeline serves material textures and the environment.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::errors::Result;

use super::shader::{ENTRY_POINT, ShaderProgram, ShaderStage};
use super::texture::Texture;

pub struct MipmapGenerator {
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    program: ShaderProgram,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl MipmapGenerator {
    /// Loads `mipmap_vs.wgsl` / `mipmap_fs.wgsl` from `shader_dir`.
    pub fn new(device: &wgpu::Device, shader_dir: &Path) -> Result<Self> {
        let program = ShaderProgram::from_files(
            device,
            "Mipmap",
            &[
                (ShaderStage::Vertex, shader_dir.join("mipmap_vs.wgsl")),
                (ShaderStage::Fragment, shader_dir.join("mipmap_fs.wgsl")),
            ],
        );
        program.require_usable()?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mipmap Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mipmap Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Mipmap Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Ok(Self {
            layout,
            pipeline_layout,
            sampler,
            program,
            pipelines: FxHashMap::default(),
        })
    }

    fn create_pipeline(&self, device: &wgpu::Device, format: wgpu::TextureFormat) -> Option<wgpu::RenderPipeline> {
        let vs = self.program.module(ShaderStage::Vertex)?;
        let fs = self.program.module(ShaderStage::Fragment)?;

        Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("Mipmap Pipeline {format:?}")),
            layout: Some(&self.pipeline_layout),
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
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }

    /// Pre-warms the pipeline for `format`.
    pub fn ensure_pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if !self.pipelines.contains_key(&format)
            && let Some(pipeline) = self.create_pipeline(device, format)
        {
            self.pipelines.insert(format, pipeline);
        }
    }

    /// Fills mip levels `1..` of `texture` from level 0.
    ///
    /// The texture needs `TEXTURE_BINDING` and `RENDER_ATTACHMENT` usage.
    /// Returns the number of levels written per layer.
    pub fn generate(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &Texture,
    ) -> u32 {
        let Some(raw) = texture.raw() else {
            log::warn!("MipmapGenerator: texture has no storage");
            return 0;
        };
        let mip_count = raw.mip_level_count();
        if mip_count < 2 {
            return 0;
        }

        let format = raw.format();
        self.ensure_pipeline(device, format);
        let Some(pipeline) = self.pipelines.get(&format) else {
            return 0;
        };

        // 逐层、逐级生成
        for layer in 0..raw.depth_or_array_layers() {
            for level in 1..mip_count {
                let view = |base_mip_level: u32, usage: wgpu::TextureUsages| {
                    raw.create_view(&wgpu::TextureViewDescriptor {
                        label: Some("Mipmap View"),
                        dimension: Some(wgpu::TextureViewDimension::D2),
                        base_mip_level,
                        mip_level_count: Some(1),
                        base_array_layer: layer,
                        array_layer_count: Some(1),
                        usage: Some(usage),
                        ..Default::default()
                    })
                };
                let src_view = view(level - 1, wgpu::TextureUsages::TEXTURE_BINDING);
                let dst_view = view(level, wgpu::TextureUsages::RENDER_ATTACHMENT);

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Mipmap BG"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&src_view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                });

                let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Mipmap Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &dst_view,
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
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.draw(0..3, 0..1);
            }
        }

        mip_count - 1
    }
}
