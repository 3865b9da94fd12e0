//! Framebuffer Tests (GPU)
//!
//! Tests for:
//! - Attachment materialization and completeness
//! - resize_all: reallocation counts, unchanged extents are left alone
//! - RenderTarget::as_texture: renderbuffers refuse the downcast
//! - resolve: multisampled resolve and single-sample copy, mismatches skipped
//! - release / invalidate bookkeeping
//! - bind keeps each color slot at its own location
//!
//! Every test returns early when no adapter is available.

mod common;

use pbr_asteroid::errors::PbrError;
use pbr_asteroid::renderer::core::resources::{Framebuffer, FramebufferStatus, ResolvePair, Slot};

const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn working(device: &wgpu::Device, width: u32, height: u32, samples: u32) -> Framebuffer {
    let mut fb = Framebuffer::new("Working");
    fb.attach_renderbuffer(device, Slot::Color0, COLOR, width, height, samples);
    fb.attach_renderbuffer(device, Slot::Color1, COLOR, width, height, samples);
    fb.attach_renderbuffer(device, Slot::Depth, DEPTH, width, height, samples);
    fb
}

fn resolve_target(device: &wgpu::Device, width: u32, height: u32) -> Framebuffer {
    let mut fb = Framebuffer::new("Resolve");
    fb.attach_texture(device, Slot::Color0, COLOR, width, height);
    fb.attach_texture(device, Slot::Color1, COLOR, width, height);
    fb
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn attached_framebuffer_is_complete() {
    let Some(ctx) = common::gpu() else { return };
    let fb = working(&ctx.device, 32, 16, 4);

    assert_eq!(fb.check_status(), FramebufferStatus::Complete);
    assert!(fb.require_complete().is_ok());
    assert_eq!(fb.size(), Some((32, 16)));
    assert_eq!(fb.sample_count(), 4);
    assert_eq!(fb.color_formats(), vec![COLOR, COLOR]);
    assert_eq!(fb.depth_format(), Some(DEPTH));
}

#[test]
fn mixed_sample_counts_fail_setup() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = Framebuffer::new("Mixed");
    fb.attach_renderbuffer(&ctx.device, Slot::Color0, COLOR, 8, 8, 4);
    fb.attach_texture(&ctx.device, Slot::Color1, COLOR, 8, 8);

    let err = fb.require_complete().unwrap_err();
    assert!(matches!(
        err,
        PbrError::FramebufferIncomplete(FramebufferStatus::IncompleteMultisample)
    ));
}

#[test]
fn only_texture_targets_downcast() {
    let Some(ctx) = common::gpu() else { return };
    let fb = working(&ctx.device, 8, 8, 1);
    let resolved = resolve_target(&ctx.device, 8, 8);

    let err = fb.get_render_target(Slot::Color0).unwrap().as_texture(Slot::Color0).unwrap_err();
    assert!(matches!(err, PbrError::RuntimeCast { slot: Slot::Color0, .. }));

    let texture = resolved
        .get_render_target(Slot::Color1)
        .unwrap()
        .as_texture(Slot::Color1)
        .unwrap();
    assert_eq!(texture.format(), Some(COLOR));
    assert!(texture.view().is_some());
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_reallocates_only_changed_slots() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = working(&ctx.device, 64, 64, 4);
    let before = fb.get_render_target(Slot::Color0).unwrap().id();

    assert_eq!(fb.resize_all(&ctx.device, 64, 64), 0);
    assert_eq!(fb.get_render_target(Slot::Color0).unwrap().id(), before);

    assert_eq!(fb.resize_all(&ctx.device, 100, 50), 3);
    assert_eq!(fb.size(), Some((100, 50)));
    assert_ne!(fb.get_render_target(Slot::Color0).unwrap().id(), before);
    assert_eq!(fb.check_status(), FramebufferStatus::Complete);
    // 采样数在重建后保持不变
    assert_eq!(fb.get_render_target(Slot::Depth).unwrap().samples(), 4);
}

#[test]
fn shrinking_replaces_every_attachment() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = working(&ctx.device, 1, 1, 1);
    fb.resize_all(&ctx.device, 800, 600);

    let slots = [Slot::Color0, Slot::Color1, Slot::Depth];
    let before: Vec<_> = slots.iter().map(|&s| fb.get_render_target(s).unwrap().id()).collect();

    assert_eq!(fb.resize_all(&ctx.device, 400, 300), slots.len());
    for (slot, old) in slots.iter().zip(before) {
        let target = fb.get_render_target(*slot).unwrap();
        assert_ne!(target.id(), old, "{slot:?} was reused");
        assert_eq!((target.width(), target.height()), (400, 300));
    }
}

#[test]
fn release_drops_targets_but_keeps_slots() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = working(&ctx.device, 16, 16, 1);

    fb.release();
    assert!(fb.get_render_target(Slot::Color0).is_none());
    assert_eq!(fb.check_status(), FramebufferStatus::MissingAttachment(Slot::Color0));

    assert_eq!(fb.resize_all(&ctx.device, 16, 16), 3);
    assert_eq!(fb.check_status(), FramebufferStatus::Complete);
}

// ============================================================================
// Resolve
// ============================================================================

const PAIRS: [ResolvePair; 2] = [
    ResolvePair::color(Slot::Color0, Slot::Color0),
    ResolvePair::color(Slot::Color1, Slot::Color1),
];

fn clear_and_resolve(ctx: &pbr_asteroid::GpuContext, samples: u32) -> (Framebuffer, usize) {
    let mut fb = working(&ctx.device, 16, 8, samples);
    let resolved = resolve_target(&ctx.device, 16, 8);

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let _pass = fb.bind(
            &mut encoder,
            Some(wgpu::Color {
                r: 0.25,
                g: 0.5,
                b: 0.75,
                a: 1.0,
            }),
        );
    }
    let performed = fb.resolve(&mut encoder, &resolved, &PAIRS);
    ctx.queue.submit(Some(encoder.finish()));
    (resolved, performed)
}

fn assert_cleared(ctx: &pbr_asteroid::GpuContext, resolved: &Framebuffer) {
    let raw = resolved.get_render_target(Slot::Color1).unwrap().raw().unwrap();
    let texels = common::read_rgba16f(ctx, raw, 0, 0);
    assert_eq!(texels.len(), 16 * 8);
    for texel in texels {
        assert_eq!(texel, [0.25, 0.5, 0.75, 1.0]);
    }
}

#[test]
fn multisampled_color_is_resolved() {
    let Some(ctx) = common::gpu() else { return };
    let (resolved, performed) = clear_and_resolve(&ctx, 4);
    assert_eq!(performed, 2);
    assert_cleared(&ctx, &resolved);
}

#[test]
fn single_sample_color_is_copied() {
    let Some(ctx) = common::gpu() else { return };
    let (resolved, performed) = clear_and_resolve(&ctx, 1);
    assert_eq!(performed, 2);
    assert_cleared(&ctx, &resolved);
}

#[test]
fn mismatched_resolves_are_skipped() {
    let Some(ctx) = common::gpu() else { return };
    let fb = working(&ctx.device, 16, 16, 4);
    let smaller = resolve_target(&ctx.device, 8, 8);
    let mut r16 = Framebuffer::new("R16");
    r16.attach_texture(&ctx.device, Slot::Color0, wgpu::TextureFormat::R16Float, 16, 16);

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    assert_eq!(fb.resolve(&mut encoder, &smaller, &PAIRS), 0);
    assert_eq!(fb.resolve(&mut encoder, &r16, &PAIRS), 0);
    // depth is never resolved
    let depth_pair = ResolvePair {
        src: Slot::Depth,
        ..ResolvePair::color(Slot::Color0, Slot::Color0)
    };
    assert_eq!(fb.resolve(&mut encoder, &smaller, &[depth_pair]), 0);
    ctx.queue.submit(Some(encoder.finish()));
}

#[test]
fn bind_consumes_invalidation() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = working(&ctx.device, 8, 8, 1);
    fb.invalidate_attachments(&[Slot::Color0, Slot::Color1]);
    assert!(fb.is_invalidated(Slot::Color0));
    assert!(!fb.is_invalidated(Slot::Depth));

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    drop(fb.bind(&mut encoder, None));
    ctx.queue.submit(Some(encoder.finish()));
    assert!(!fb.is_invalidated(Slot::Color0));
}

#[test]
fn empty_slots_keep_later_locations() {
    let Some(ctx) = common::gpu() else { return };
    let mut fb = Framebuffer::new("Gapped");
    fb.attach_texture(&ctx.device, Slot::Color0, COLOR, 8, 8);
    fb.attach_texture(&ctx.device, Slot::Color2, COLOR, 8, 8);
    assert_eq!(fb.color_locations(), vec![Some(Slot::Color0), None, Some(Slot::Color2)]);

    // trailing empty slots are dropped
    let two = resolve_target(&ctx.device, 8, 8);
    assert_eq!(two.color_locations(), vec![Some(Slot::Color0), Some(Slot::Color1)]);
    assert!(Framebuffer::new("Empty").color_locations().is_empty());

    // slot 2 is cleared through location 2
    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    drop(fb.bind(
        &mut encoder,
        Some(wgpu::Color {
            r: 1.0,
            g: 0.0,
            b: 0.5,
            a: 1.0,
        }),
    ));
    ctx.queue.submit(Some(encoder.finish()));
    let raw = fb.get_render_target(Slot::Color2).unwrap().raw().unwrap();
    for texel in common::read_rgba16f(&ctx, raw, 0, 0) {
        assert_eq!(texel, [1.0, 0.0, 0.5, 1.0]);
    }
}
