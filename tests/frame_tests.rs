//! Frame Renderer Tests (GPU)
//!
//! Tests for:
//! - One frame runs every step: both framebuffers stay complete, three color
//!   slots are resolved, the tonemap pass draws
//! - Resize: reallocation counts across both framebuffers, no-op when unchanged
//! - Output: a constant gray sky tonemaps to the expected display value
//! - Asteroid: subdivision level stays in range near and far, one full frame
//!
//! Every test returns early when no adapter is available.

mod common;

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3, Vec4};

use pbr_asteroid::assets::{Image, Mesh, Vertex};
use pbr_asteroid::renderer::core::resources::{Environment, FramebufferStatus, Slot};
use pbr_asteroid::renderer::mesh::MaterialTextures;
use pbr_asteroid::renderer::{EnvironmentSettings, FrameRenderer, PbrAsteroid, PbrMesh, PbrRenderer, RendererSettings};
use pbr_asteroid::{Camera, GpuContext, SceneSettings};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn triangle() -> Mesh {
    let vertex = |x: f32, y: f32, u: f32, v: f32| Vertex {
        position: [x, y, 0.0],
        normal: [0.0; 3],
        tangent: [0.0; 3],
        bitangent: [0.0; 3],
        texcoord: [u, v],
    };
    Mesh::from_parts(
        vec![vertex(-1.0, -1.0, 0.0, 1.0), vertex(1.0, -1.0, 1.0, 1.0), vertex(0.0, 1.0, 0.5, 0.0)],
        vec![[0, 1, 2]],
    )
}

fn settings() -> RendererSettings {
    RendererSettings {
        msaa_samples: 4,
        max_tess_level: 8,
        ..Default::default()
    }
}

fn environment(ctx: &GpuContext) -> Arc<Environment> {
    let sky = Image::from_hdr(4, 2, 3, vec![0.5; 4 * 2 * 3]).unwrap();
    Arc::new(
        Environment::new(
            &ctx.device,
            &ctx.queue,
            &common::shader_dir(),
            &sky,
            &EnvironmentSettings {
                cube_size: 16,
                irradiance_size: 4,
                brdf_lut_size: 16,
            },
        )
        .unwrap(),
    )
}

fn asteroid(ctx: &GpuContext, environment: &Arc<Environment>) -> PbrAsteroid {
    let targets = FrameRenderer::target_layout(ctx, &settings());
    PbrAsteroid::new(
        &ctx.device,
        &ctx.queue,
        &common::shader_dir(),
        &triangle(),
        MaterialTextures::defaults(&ctx.device, &ctx.queue),
        Some(Arc::clone(environment)),
        targets,
        settings().effective_max_tess_level(),
    )
}

fn frame_renderer_with(
    ctx: &GpuContext,
    environment: Arc<Environment>,
    mesh: Box<dyn PbrRenderer>,
    width: u32,
    height: u32,
) -> FrameRenderer {
    let settings = settings();
    let targets = FrameRenderer::target_layout(ctx, &settings);
    FrameRenderer::new(
        ctx,
        &common::shader_dir(),
        &settings,
        environment,
        mesh,
        targets,
        OUTPUT_FORMAT,
        width,
        height,
    )
    .unwrap()
}

fn frame_renderer(ctx: &GpuContext, width: u32, height: u32) -> FrameRenderer {
    let environment = environment(ctx);
    let targets = FrameRenderer::target_layout(ctx, &settings());
    let mesh = PbrMesh::new(
        &ctx.device,
        &ctx.queue,
        &common::shader_dir(),
        &triangle(),
        MaterialTextures::defaults(&ctx.device, &ctx.queue),
        Some(Arc::clone(&environment)),
        targets,
    );
    frame_renderer_with(ctx, environment, Box::new(mesh), width, height)
}

fn output_texture(ctx: &GpuContext, width: u32, height: u32) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Output"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn camera(aspect: f32) -> Camera {
    Camera::with_pose(
        Vec3::new(0.0, 0.0, 4.0),
        Quat::IDENTITY,
        Mat4::perspective_rh(60f32.to_radians(), aspect, 0.25, 100.0),
    )
}

// ============================================================================
// One frame
// ============================================================================

#[test]
fn frame_runs_every_step() {
    let Some(ctx) = common::gpu() else { return };
    let mut renderer = frame_renderer(&ctx, 64, 64);
    assert!(renderer.mesh().is_usable());
    assert!(renderer.tonemap_mut().is_usable());

    let output = output_texture(&ctx, 64, 64);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());
    let mut scene = SceneSettings::default();
    // one light along -X
    scene.lights[0].enabled = true;
    scene.lights[2].enabled = false;
    let stats = renderer.render(&ctx, &view, 64, 64, &camera(1.0), &scene);

    assert_eq!(stats.reallocated, 0);
    assert_eq!(stats.resolved, 3);
    assert!(stats.tonemapped);
    assert_eq!(renderer.working().check_status(), FramebufferStatus::Complete);
    assert_eq!(renderer.resolved().check_status(), FramebufferStatus::Complete);
    for slot in Slot::COLORS {
        assert!(renderer.working().is_invalidated(slot));
    }
    assert!(!renderer.working().is_invalidated(Slot::Depth));
}

#[test]
fn gray_sky_reaches_the_output() {
    let Some(ctx) = common::gpu() else { return };
    let mut renderer = frame_renderer(&ctx, 32, 32);
    let output = output_texture(&ctx, 32, 32);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.render(&ctx, &view, 32, 32, &camera(1.0), &SceneSettings::default());

    let pixels = common::read_texture(&ctx, &output, 0, 0, 4);
    assert_eq!(pixels.len(), 32 * 32 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));

    // ACES(0.5) ≈ 0.616, gamma 2.2 → ≈ 0.80
    let corner = &pixels[..4];
    for &channel in &corner[..3] {
        assert!((i32::from(channel) - 204).abs() <= 6, "corner pixel {corner:?}");
    }
}

// ============================================================================
// Asteroid
// ============================================================================

#[test]
fn asteroid_level_stays_in_range() {
    let Some(ctx) = common::gpu() else { return };
    let environment = environment(&ctx);
    let mut asteroid = asteroid(&ctx, &environment);
    assert!(asteroid.is_usable());

    let max_level = settings().effective_max_tess_level();
    assert_eq!(asteroid.tess_control().max_level, max_level);

    let scene = SceneSettings::default();
    let viewport = Vec4::new(0.0, 0.0, 640.0, 480.0);
    let mut level_at = |distance: f32| {
        let camera = Camera::with_pose(
            Vec3::new(0.0, 0.0, distance),
            Quat::IDENTITY,
            Mat4::perspective_rh(60f32.to_radians(), 640.0 / 480.0, 0.25, 5000.0),
        );
        asteroid.set_shading_uniforms(
            &scene.lights,
            viewport,
            camera.projection(),
            camera.view(),
            scene.model_matrix(),
        );
        asteroid.tess_level()
    };

    // 相机位于包围球内
    let near = level_at(1.0);
    let far = level_at(2000.0);
    assert_eq!(near, max_level);
    assert_eq!(far, 1);
    for distance in [3.0, 6.0, 12.0, 50.0] {
        let level = level_at(distance);
        assert!((1..=max_level).contains(&level), "level {level} at {distance}");
    }
}

#[test]
fn asteroid_frame_runs_every_step() {
    let Some(ctx) = common::gpu() else { return };
    let environment = environment(&ctx);
    let asteroid = asteroid(&ctx, &environment);
    let mut renderer = frame_renderer_with(&ctx, environment, Box::new(asteroid), 64, 64);
    assert!(renderer.mesh().is_usable());

    let output = output_texture(&ctx, 64, 64);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());
    let stats = renderer.render(&ctx, &view, 64, 64, &camera(1.0), &SceneSettings::default());

    assert_eq!(stats.reallocated, 0);
    assert_eq!(stats.resolved, 3);
    assert!(stats.tonemapped);
    assert_eq!(renderer.working().check_status(), FramebufferStatus::Complete);
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_reallocates_both_framebuffers_once() {
    let Some(ctx) = common::gpu() else { return };
    let mut renderer = frame_renderer(&ctx, 64, 64);

    let output = output_texture(&ctx, 80, 48);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());
    let scene = SceneSettings::default();

    let stats = renderer.render(&ctx, &view, 80, 48, &camera(80.0 / 48.0), &scene);
    // 工作缓冲 4 个附件 + 解析缓冲 3 个
    assert_eq!(stats.reallocated, 7);
    assert_eq!(stats.resolved, 3);
    assert_eq!(renderer.size(), (80, 48));
    assert_eq!(renderer.working().size(), Some((80, 48)));
    assert_eq!(renderer.resolved().size(), Some((80, 48)));

    let stats = renderer.render(&ctx, &view, 80, 48, &camera(80.0 / 48.0), &scene);
    assert_eq!(stats.reallocated, 0);
}

#[test]
fn zero_extent_resize_is_ignored() {
    let Some(ctx) = common::gpu() else { return };
    let mut renderer = frame_renderer(&ctx, 32, 32);
    assert_eq!(renderer.resize(&ctx.device, 0, 32), 0);
    assert_eq!(renderer.resize(&ctx.device, 32, 0), 0);
    assert_eq!(renderer.size(), (32, 32));
}
