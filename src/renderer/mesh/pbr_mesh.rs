use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec4};

use crate::assets::mesh::Mesh;
use crate::renderer::core::resources::{DrawMode, Environment, Geometry, ShaderProgram, ShaderStage};
use crate::renderer::targets::{PassKind, TargetLayout};
use crate::scene::Light;

use super::{FrameBlocks, MaterialBinding, MaterialTextures, NUM_LIGHTS, PbrRenderer, create_pass_pipelines};

/// Flat PBR mesh: indexed triangles, `pbr_vs` + `pbr_fs`.
pub struct PbrMesh {
    geometry: Geometry,
    material: MaterialBinding,
    blocks: FrameBlocks,
    program: ShaderProgram,
    bind_groups: [wgpu::BindGroup; 2],
    pipelines: Option<[wgpu::RenderPipeline; 2]>,
}

impl PbrMesh {
    /// Uploads `mesh` and builds both pass pipelines.
    ///
    /// A shader failure is logged and leaves the renderer unusable.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader_dir: &Path,
        mesh: &Mesh,
        textures: MaterialTextures,
        environment: Option<Arc<Environment>>,
        targets: TargetLayout,
    ) -> Self {
        let geometry = Geometry::from_mesh(device, mesh, DrawMode::Triangles, "PbrMesh");
        let material = MaterialBinding::new(device, queue, textures, environment, "PbrMesh");
        let blocks = FrameBlocks::new(device, queue, "PbrMesh");

        let program = ShaderProgram::from_files(
            device,
            "PbrMesh",
            &[
                (ShaderStage::Vertex, shader_dir.join("pbr_vs.wgsl")),
                (ShaderStage::Fragment, shader_dir.join("pbr_fs.wgsl")),
            ],
        );

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("PbrMesh Frame Layout"),
            entries: &FrameBlocks::layout_entries(),
        });
        let bind_groups = PassKind::ALL.map(|kind| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("PbrMesh Frame {kind:?}")),
                layout: &frame_layout,
                entries: &blocks.entries(kind),
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PbrMesh Pipeline Layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(material.layout())],
            immediate_size: 0,
        });
        let pipelines = create_pass_pipelines(
            device,
            "PbrMesh",
            &pipeline_layout,
            &program,
            &[Geometry::vertex_layout()],
            targets,
        );

        Self {
            geometry,
            material,
            blocks,
            program,
            bind_groups,
            pipelines,
        }
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

impl PbrRenderer for PbrMesh {
    fn set_shading_uniforms(
        &mut self,
        lights: &[Light; NUM_LIGHTS],
        _viewport: Vec4,
        projection: Mat4,
        view: Mat4,
        model: Mat4,
    ) {
        let levels = self.material.specular_levels();
        self.blocks.update(lights, projection, view, model, levels);
    }

    fn render(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>, kind: PassKind) {
        let (Some(pipelines), Some(material)) = (&self.pipelines, self.material.bind_group()) else {
            return;
        };
        self.blocks.upload(queue);

        pass.set_pipeline(&pipelines[kind.index()]);
        pass.set_bind_group(0, &self.bind_groups[kind.index()], &[]);
        pass.set_bind_group(1, material, &[]);
        self.geometry.render(pass);
    }

    fn is_usable(&self) -> bool {
        self.program.is_usable()
            && self.pipelines.is_some()
            && self.material.bind_group().is_some()
            && self.geometry.is_usable()
    }
}
