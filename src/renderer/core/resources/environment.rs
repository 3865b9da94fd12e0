//! Environment Precomputation
//!
//! Builds the image-based-lighting inputs from an equirectangular HDR image,
//! once, before the first frame:
//!
//! | Stage | Program              | Output                                       |
//! |-------|----------------------|----------------------------------------------|
//! | 1     | `equirect2cube_cs`   | unfiltered cube, mip 0                       |
//! | 2     | mipmap blit          | unfiltered cube, full mip chain              |
//! | 3     | copy + `spmap_cs`    | specular cube: mip 0 copied, mips 1.. GGX-prefiltered |
//! | 4     | `irmap_cs`           | irradiance cube (single level)               |
//! | 5     | `spbrdf_cs`          | split-sum BRDF LUT (`.rg`)                   |
//!
//! Every stage runs in its own pass of one command encoder, so wgpu inserts
//! the barrier each stage needs before reading the previous one's output.
//! After submission the device is polled until idle.
//!
//! The finished [`Environment`] is immutable and shared behind an `Arc` by
//! every mesh renderer that samples it.

use std::path::Path;
use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::assets::image::Image;
use crate::errors::{PbrError, Result};
use crate::renderer::settings::EnvironmentSettings;

use super::binding::{clamp_sampler, sampler_entry, storage_texture_entry, texture_entry, uniform_entry};
use super::mipmap::MipmapGenerator;
use super::shader::{ENTRY_POINT, ShaderProgram, ShaderStage};
use super::texture::{Texture, TextureKind};

/// Compute workgroup edge (texels) of every precomputation shader.
pub const WORKGROUP_SIZE: u32 = 32;

/// Format of all environment cubes.
pub const ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Format of the BRDF LUT; only `.rg` is written.
pub const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

// ============================================================================
// Dispatch arithmetic
// ============================================================================

/// Roughness increment between consecutive specular mip levels.
///
/// The divisor (`levels - 1`, the highest mip index) is clamped to at least 1,
/// so degenerate one- and two-level chains stay finite.
#[must_use]
pub fn roughness_step(levels: u32) -> f32 {
    1.0 / levels.saturating_sub(1).max(1) as f32
}

/// Workgroups per axis for a square dispatch over `size >> level` texels.
#[must_use]
pub fn prefilter_group_count(base_size: u32, level: u32) -> u32 {
    (base_size >> level).div_ceil(WORKGROUP_SIZE).max(1)
}

/// One prefilter dispatch of the specular cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefilterLevel {
    pub level: u32,
    pub roughness: f32,
    pub groups: u32,
}

/// Dispatches for mip levels `1..levels` (level 0 is copied, not filtered).
#[must_use]
pub fn prefilter_schedule(base_size: u32, levels: u32) -> Vec<PrefilterLevel> {
    let step = roughness_step(levels);
    (1..levels)
        .map(|level| PrefilterLevel {
            level,
            roughness: level as f32 * step,
            groups: prefilter_group_count(base_size, level),
        })
        .collect()
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PrefilterParams {
    roughness: f32,
    _pad: [f32; 3],
}

// ============================================================================
// Environment
// ============================================================================

/// Prefiltered specular cube, irradiance cube and BRDF LUT.
#[derive(Debug)]
pub struct Environment {
    specular: Texture,
    irradiance: Texture,
    brdf_lut: Texture,
    settings: EnvironmentSettings,
}

struct ComputeStage {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl ComputeStage {
    fn new(
        device: &wgpu::Device,
        shader_dir: &Path,
        name: &str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<Self> {
        let program = ShaderProgram::from_files(
            device,
            name,
            &[(ShaderStage::Compute, shader_dir.join(format!("{name}.wgsl")))],
        );
        let module = program.require_module(ShaderStage::Compute)?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(name),
            entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(name),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(name),
            layout: Some(&pipeline_layout),
            module,
            entry_point: Some(ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        Ok(Self { layout, pipeline })
    }

    fn bind_group(&self, device: &wgpu::Device, resources: &[wgpu::BindingResource<'_>]) -> wgpu::BindGroup {
        let entries: Vec<wgpu::BindGroupEntry> = resources
            .iter()
            .enumerate()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: resource.clone(),
            })
            .collect();
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &self.layout,
            entries: &entries,
        })
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        bind_group: &wgpu::BindGroup,
        groups: (u32, u32, u32),
    ) {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, bind_group, &[]);
        cpass.dispatch_workgroups(groups.0, groups.1, groups.2);
    }
}

impl Environment {
    /// Loads the equirectangular image from `path` and runs the precomputation.
    pub fn from_file(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader_dir: &Path,
        path: &Path,
        settings: &EnvironmentSettings,
    ) -> Result<Self> {
        let image = Image::from_file(path, 3)?;
        Self::new(device, queue, shader_dir, &image, settings)
    }

    /// Runs the five precomputation stages and blocks until the GPU is done.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader_dir: &Path,
        equirect: &Image,
        settings: &EnvironmentSettings,
    ) -> Result<Self> {
        let started = Instant::now();
        let cs = wgpu::ShaderStages::COMPUTE;
        let cube = wgpu::TextureViewDimension::Cube;

        let equirect_stage = ComputeStage::new(
            device,
            shader_dir,
            "equirect2cube_cs",
            &[
                texture_entry(0, cs, wgpu::TextureViewDimension::D2),
                sampler_entry(1, cs),
                storage_texture_entry(2, ENVIRONMENT_FORMAT),
            ],
        )?;
        let prefilter_stage = ComputeStage::new(
            device,
            shader_dir,
            "spmap_cs",
            &[
                texture_entry(0, cs, cube),
                sampler_entry(1, cs),
                storage_texture_entry(2, ENVIRONMENT_FORMAT),
                uniform_entry(3, cs),
            ],
        )?;
        let irradiance_stage = ComputeStage::new(
            device,
            shader_dir,
            "irmap_cs",
            &[
                texture_entry(0, cs, cube),
                sampler_entry(1, cs),
                storage_texture_entry(2, ENVIRONMENT_FORMAT),
            ],
        )?;
        let brdf_stage = ComputeStage::new(
            device,
            shader_dir,
            "spbrdf_cs",
            &[storage_texture_entry(0, BRDF_LUT_FORMAT)],
        )?;
        let mut mipmaps = MipmapGenerator::new(device, shader_dir)?;

        let sampler = clamp_sampler(device, "Environment Sampler");
        let size = settings.cube_size.max(1);

        let equirect_texture = Texture::from_image(device, queue, equirect, false, 1, "Equirect Source")?;

        let unfiltered = Texture::with_storage(
            device,
            TextureKind::Cube,
            ENVIRONMENT_FORMAT,
            size,
            size,
            0,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC,
            "Environment Unfiltered",
        );
        let specular = Texture::with_storage(
            device,
            TextureKind::Cube,
            ENVIRONMENT_FORMAT,
            size,
            size,
            0,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            "Environment Specular",
        );
        let irradiance_size = settings.irradiance_size.max(1);
        let irradiance = Texture::with_storage(
            device,
            TextureKind::Cube,
            ENVIRONMENT_FORMAT,
            irradiance_size,
            irradiance_size,
            1,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            "Environment Irradiance",
        );
        let lut_size = settings.brdf_lut_size.max(1);
        let brdf_lut = Texture::with_storage(
            device,
            TextureKind::D2,
            BRDF_LUT_FORMAT,
            lut_size,
            lut_size,
            1,
            wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            "BRDF LUT",
        );

        let missing = || PbrError::asset("environment", "texture allocation failed");
        let equirect_view = equirect_texture.view().ok_or_else(missing)?;
        let unfiltered_view = unfiltered.view().ok_or_else(missing)?;
        let unfiltered_raw = unfiltered.raw().ok_or_else(missing)?;
        let unfiltered_storage = unfiltered.storage_view(0).ok_or_else(missing)?;
        let specular_view = specular.view().ok_or_else(missing)?;
        let specular_raw = specular.raw().ok_or_else(missing)?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Environment Precompute"),
        });

        // 1. equirect -> cube
        let group = prefilter_group_count(size, 0);
        let bind_group = equirect_stage.bind_group(
            device,
            &[
                wgpu::BindingResource::TextureView(equirect_view),
                wgpu::BindingResource::Sampler(&sampler),
                wgpu::BindingResource::TextureView(&unfiltered_storage),
            ],
        );
        equirect_stage.dispatch(&mut encoder, "Equirect To Cube", &bind_group, (group, group, 6));

        // 2. mip chain
        mipmaps.generate(device, &mut encoder, &unfiltered);

        // 3. specular prefilter: copy level 0, filter the rest
        encoder.copy_texture_to_texture(
            unfiltered_raw.as_image_copy(),
            specular_raw.as_image_copy(),
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
        );

        let schedule = prefilter_schedule(size, specular.levels());
        for step in &schedule {
            let Some(level_view) = specular.storage_view(step.level) else {
                continue;
            };
            // One buffer per level: write_buffer calls would all land before the submit.
            let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Prefilter Params"),
                contents: bytemuck::bytes_of(&PrefilterParams {
                    roughness: step.roughness,
                    _pad: [0.0; 3],
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = prefilter_stage.bind_group(
                device,
                &[
                    wgpu::BindingResource::TextureView(unfiltered_view),
                    wgpu::BindingResource::Sampler(&sampler),
                    wgpu::BindingResource::TextureView(&level_view),
                    params.as_entire_binding(),
                ],
            );
            prefilter_stage.dispatch(
                &mut encoder,
                "Specular Prefilter",
                &bind_group,
                (step.groups, step.groups, 6),
            );
        }

        // 4. irradiance from the finished specular cube
        if let Some(irradiance_storage) = irradiance.storage_view(0) {
            let group = prefilter_group_count(irradiance_size, 0);
            let bind_group = irradiance_stage.bind_group(
                device,
                &[
                    wgpu::BindingResource::TextureView(specular_view),
                    wgpu::BindingResource::Sampler(&sampler),
                    wgpu::BindingResource::TextureView(&irradiance_storage),
                ],
            );
            irradiance_stage.dispatch(&mut encoder, "Irradiance Map", &bind_group, (group, group, 6));
        }

        // 5. BRDF LUT
        if let Some(lut_storage) = brdf_lut.storage_view(0) {
            let group = prefilter_group_count(lut_size, 0);
            let bind_group = brdf_stage.bind_group(device, &[wgpu::BindingResource::TextureView(&lut_storage)]);
            brdf_stage.dispatch(&mut encoder, "BRDF LUT", &bind_group, (group, group, 1));
        }

        queue.submit(std::iter::once(encoder.finish()));
        if let Err(err) = device.poll(wgpu::PollType::wait_indefinitely()) {
            log::warn!("Environment precompute: device poll failed: {err}");
        }

        log::info!(
            "Environment ready: {size}px cube, {} levels, {irradiance_size}px irradiance, {lut_size}px BRDF LUT ({:.1} ms)",
            specular.levels(),
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            specular,
            irradiance,
            brdf_lut,
            settings: *settings,
        })
    }

    #[inline]
    #[must_use]
    pub fn specular(&self) -> &Texture {
        &self.specular
    }

    #[inline]
    #[must_use]
    pub fn irradiance(&self) -> &Texture {
        &self.irradiance
    }

    #[inline]
    #[must_use]
    pub fn brdf_lut(&self) -> &Texture {
        &self.brdf_lut
    }

    /// Mip levels of the specular cube (roughness 0 at level 0, 1 at the last).
    #[inline]
    #[must_use]
    pub fn specular_levels(&self) -> u32 {
        self.specular.levels()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roughness_step_never_divides_by_zero() {
        assert_eq!(roughness_step(1), 1.0);
        assert_eq!(roughness_step(2), 1.0);
        assert_eq!(roughness_step(11), 0.1);
        assert!(roughness_step(0).is_finite());
    }

    #[test]
    fn group_count_halves_with_level() {
        assert_eq!(prefilter_group_count(1024, 0), 32);
        assert_eq!(prefilter_group_count(1024, 1), 16);
        assert_eq!(prefilter_group_count(1024, 5), 1);
        assert_eq!(prefilter_group_count(1024, 10), 1);
        assert_eq!(prefilter_group_count(8, 0), 1);
        assert_eq!(prefilter_group_count(48, 0), 2);
    }

    #[test]
    fn schedule_covers_levels_after_the_first() {
        let schedule = prefilter_schedule(1024, 11);
        assert_eq!(schedule.len(), 10);
        assert_eq!(schedule[0].level, 1);
        assert_eq!(schedule[0].groups, 16);
        let last = schedule.last().unwrap();
        assert_eq!(last.level, 10);
        assert!((last.roughness - 1.0).abs() < 1e-6);
        for step in &schedule {
            assert_eq!(step.groups, prefilter_group_count(1024, step.level));
        }
    }

    #[test]
    fn degenerate_chain_has_one_full_roughness_level() {
        let schedule = prefilter_schedule(2, 2);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].roughness, 1.0);
        assert!(prefilter_schedule(1, 1).is_empty());
    }
}
