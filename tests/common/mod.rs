//! Shared helpers for GPU-backed integration tests.
//!
//! Tests that need a device call [`gpu`] and return early when no adapter is
//! available, so the suite still passes on machines without a GPU.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::mpsc;

use pbr_asteroid::renderer::core::GpuContext;

/// Headless context, or `None` (with a note on stderr) when no adapter exists.
pub fn gpu() -> Option<GpuContext> {
    match GpuContext::headless() {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

pub fn shader_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join("shaders")
}

/// Copies one mip level / array layer of `texture` into CPU memory, row
/// padding stripped.
pub fn read_texture(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    level: u32,
    layer: u32,
    bytes_per_texel: u32,
) -> Vec<u8> {
    let width = (texture.width() >> level).max(1);
    let height = (texture.height() >> level).max(1);
    let unpadded = width * bytes_per_texel;
    let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback"),
        size: u64::from(padded * height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(Some(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device
        .poll(wgpu::PollType::wait_indefinitely())
        .expect("device poll failed");
    rx.recv().expect("map callback dropped").expect("buffer map failed");

    let data = slice.get_mapped_range();
    let mut out = Vec::with_capacity((unpadded * height) as usize);
    for row in data.chunks_exact(padded as usize) {
        out.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(data);
    buffer.unmap();
    out
}

/// Reads an `Rgba16Float` level/layer as `f32` RGBA texels.
pub fn read_rgba16f(ctx: &GpuContext, texture: &wgpu::Texture, level: u32, layer: u32) -> Vec<[f32; 4]> {
    read_texture(ctx, texture, level, layer, 8)
        .chunks_exact(8)
        .map(|texel| {
            let channel = |i: usize| half::f16::from_le_bytes([texel[i * 2], texel[i * 2 + 1]]).to_f32();
            [channel(0), channel(1), channel(2), channel(3)]
        })
        .collect()
}
