//! Environment Precompute Tests (GPU)
//!
//! Tests for:
//! - Texture shapes: cube sizes, full specular mip chain, single-level irradiance
//! - A constant sky stays constant through every stage
//! - BRDF LUT values stay inside the energy bound
//! - One- and two-texel cubes: degenerate mip chains still build every texture
//!
//! Every test returns early when no adapter is available.

mod common;

use pbr_asteroid::assets::Image;
use pbr_asteroid::renderer::EnvironmentSettings;
use pbr_asteroid::renderer::core::resources::{Environment, TextureKind, mip_level_count};

const GRAY: f32 = 0.5;
const EPSILON: f32 = 0.01;

const SMALL: EnvironmentSettings = EnvironmentSettings {
    cube_size: 32,
    irradiance_size: 8,
    brdf_lut_size: 32,
};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn gray_environment(ctx: &pbr_asteroid::GpuContext) -> Environment {
    let sky = Image::from_hdr(4, 2, 3, vec![GRAY; 4 * 2 * 3]).unwrap();
    Environment::new(&ctx.device, &ctx.queue, &common::shader_dir(), &sky, &SMALL).unwrap()
}

fn assert_gray(texels: &[[f32; 4]], what: &str) {
    for (i, texel) in texels.iter().enumerate() {
        for channel in &texel[..3] {
            assert!(approx(*channel, GRAY), "{what}: texel {i} = {texel:?}");
        }
    }
}

// ============================================================================
// Shapes
// ============================================================================

#[test]
fn texture_shapes_follow_settings() {
    let Some(ctx) = common::gpu() else { return };
    let env = gray_environment(&ctx);

    assert_eq!(env.specular().kind(), TextureKind::Cube);
    assert_eq!(env.specular().width(), 32);
    assert_eq!(env.specular_levels(), mip_level_count(32, 32));
    assert_eq!(env.specular_levels(), 6);

    assert_eq!(env.irradiance().kind(), TextureKind::Cube);
    assert_eq!(env.irradiance().width(), 8);
    assert_eq!(env.irradiance().levels(), 1);

    assert_eq!(env.brdf_lut().kind(), TextureKind::D2);
    assert_eq!(env.brdf_lut().width(), 32);
    assert_eq!(env.settings(), &SMALL);
}

#[test]
fn tiny_cubes_build_every_texture() {
    let Some(ctx) = common::gpu() else { return };
    let sky = Image::from_hdr(4, 2, 3, vec![GRAY; 4 * 2 * 3]).unwrap();

    // cube_size 1: no prefilter dispatch; 2: one level at roughness 1
    for (cube_size, levels) in [(1, 1), (2, 2)] {
        let settings = EnvironmentSettings {
            cube_size,
            irradiance_size: 4,
            brdf_lut_size: 4,
        };
        let env = Environment::new(&ctx.device, &ctx.queue, &common::shader_dir(), &sky, &settings).unwrap();

        assert_eq!(env.specular().width(), cube_size);
        assert_eq!(env.specular_levels(), levels);
        assert_eq!(env.specular().levels(), levels);
        assert!(env.specular().is_usable());

        assert_eq!(env.irradiance().kind(), TextureKind::Cube);
        assert_eq!(env.irradiance().width(), 4);
        assert!(env.irradiance().is_usable());

        assert_eq!(env.brdf_lut().kind(), TextureKind::D2);
        assert_eq!(env.brdf_lut().width(), 4);
        assert!(env.brdf_lut().is_usable());
    }
}

// ============================================================================
// Constant sky
// ============================================================================

#[test]
fn constant_sky_prefilters_to_itself() {
    let Some(ctx) = common::gpu() else { return };
    let env = gray_environment(&ctx);
    let raw = env.specular().raw().unwrap();

    for face in 0..6 {
        assert_gray(&common::read_rgba16f(&ctx, raw, 0, face), "specular mip 0");
        assert_gray(&common::read_rgba16f(&ctx, raw, 3, face), "specular mip 3");
    }
    // 最后一级：粗糙度 1
    assert_gray(&common::read_rgba16f(&ctx, raw, 5, 2), "specular last mip");
}

#[test]
fn constant_sky_gives_constant_irradiance() {
    let Some(ctx) = common::gpu() else { return };
    let env = gray_environment(&ctx);
    let raw = env.irradiance().raw().unwrap();

    // The irradiance cube is stored divided by pi, so a constant sky maps to itself.
    for face in 0..6 {
        let texels = common::read_rgba16f(&ctx, raw, 0, face);
        assert_eq!(texels.len(), 8 * 8);
        assert_gray(&texels, "irradiance");
    }
}

// ============================================================================
// BRDF LUT
// ============================================================================

#[test]
fn brdf_lut_is_energy_bounded() {
    let Some(ctx) = common::gpu() else { return };
    let env = gray_environment(&ctx);
    let texels = common::read_rgba16f(&ctx, env.brdf_lut().raw().unwrap(), 0, 0);
    assert_eq!(texels.len(), 32 * 32);

    for [scale, bias, _, alpha] in &texels {
        assert!(*scale >= 0.0 && *bias >= 0.0);
        assert!(scale + bias <= 1.0 + EPSILON, "scale {scale} + bias {bias}");
        assert_eq!(*alpha, 1.0);
    }

    // smooth surface seen head-on reflects almost everything
    let [scale, bias, _, _] = texels[31];
    assert!(scale + bias > 0.9, "scale {scale} + bias {bias}");
}
