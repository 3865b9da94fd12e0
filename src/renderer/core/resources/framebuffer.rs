//! Framebuffer Manager
//!
//! A [`Framebuffer`] owns the render targets of a set of semantic attachment
//! slots and remembers, per slot, which backing type and format it was asked
//! for. That memory is what lets [`Framebuffer::resize_all`] follow window
//! resizes without the caller re-specifying formats.
//!
//! # Backend mapping
//!
//! | Operation                  | wgpu realisation                                       |
//! |----------------------------|--------------------------------------------------------|
//! | bind                       | begin a render pass over the color slots + depth slot  |
//! | unbind                     | drop the returned `RenderPass`                         |
//! | resolve (multisampled src) | render pass with `resolve_target` = destination view   |
//! | resolve (single-sample src)| `copy_texture_to_texture`                              |
//! | invalidate                 | next bind clears the slot instead of loading it        |
//! | completeness               | [`FramebufferStatus::evaluate`] over the attachment table |

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;

use crate::errors::{PbrError, Result};

use super::render_target::RenderTarget;
use super::renderbuffer::Renderbuffer;
use super::texture::{Texture, TextureKind};

// ============================================================================
// Slots & Parameters
// ============================================================================

/// Semantic attachment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Color0,
    Color1,
    Color2,
    Depth,
}

impl Slot {
    pub const COLORS: [Slot; 3] = [Slot::Color0, Slot::Color1, Slot::Color2];

    #[inline]
    #[must_use]
    pub fn is_color(self) -> bool {
        !matches!(self, Slot::Depth)
    }
}

/// Backing resource type remembered for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Renderbuffer,
    Texture,
}

/// What a slot was asked to be; reused by [`Framebuffer::resize_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentParams {
    pub ty: TargetType,
    pub format: wgpu::TextureFormat,
    pub samples: u32,
}

bitflags! {
    /// Buffers copied by a resolve.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlitMask: u32 {
        const COLOR = 1;
        const DEPTH = 1 << 1;
    }
}

/// Sampling filter of a resolve. Resolves always cover equal extents, so the
/// filter only matters for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlitFilter {
    #[default]
    Nearest,
    Linear,
}

/// One source slot → destination slot copy of [`Framebuffer::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePair {
    pub src: Slot,
    pub dst: Slot,
    pub mask: BlitMask,
    pub filter: BlitFilter,
}

impl ResolvePair {
    /// Color-only, nearest-filtered pair.
    #[must_use]
    pub const fn color(src: Slot, dst: Slot) -> Self {
        Self {
            src,
            dst,
            mask: BlitMask::COLOR,
            filter: BlitFilter::Nearest,
        }
    }
}

// ============================================================================
// Completeness
// ============================================================================

/// Result of [`Framebuffer::check_status`]. Anything but `Complete` is fatal at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    /// No slot has been attached.
    Empty,
    /// A slot was registered but has no usable target.
    MissingAttachment(Slot),
    /// Attachments disagree on extent, or an extent is zero.
    IncompleteDimensions,
    /// Attachments disagree on sample count.
    IncompleteMultisample,
    /// The depth slot holds a non-depth format.
    InvalidDepthFormat,
    /// A color slot holds a depth format.
    InvalidColorFormat(Slot),
}

/// Shape of one attachment as seen by the completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentState {
    pub slot: Slot,
    pub format: Option<wgpu::TextureFormat>,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

impl FramebufferStatus {
    /// Evaluates completeness of an attachment table.
    #[must_use]
    pub fn evaluate(attachments: &[AttachmentState]) -> Self {
        let Some(first) = attachments.first() else {
            return Self::Empty;
        };

        for attachment in attachments {
            let Some(format) = attachment.format else {
                return Self::MissingAttachment(attachment.slot);
            };
            let is_depth = format.is_depth_stencil_format();
            if attachment.slot == Slot::Depth && !is_depth {
                return Self::InvalidDepthFormat;
            }
            if attachment.slot.is_color() && is_depth {
                return Self::InvalidColorFormat(attachment.slot);
            }
            if attachment.width == 0 || attachment.height == 0 {
                return Self::IncompleteDimensions;
            }
        }

        if attachments
            .iter()
            .any(|a| a.width != first.width || a.height != first.height)
        {
            return Self::IncompleteDimensions;
        }
        if attachments.iter().any(|a| a.samples != first.samples) {
            return Self::IncompleteMultisample;
        }
        Self::Complete
    }
}

// ============================================================================
// Framebuffer
// ============================================================================

/// Owner of a slot → render target table.
#[derive(Debug)]
pub struct Framebuffer {
    label: String,
    targets: BTreeMap<Slot, RenderTarget>,
    params: BTreeMap<Slot, AttachmentParams>,
    invalidated: BTreeSet<Slot>,
}

impl Framebuffer {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            targets: BTreeMap::new(),
            params: BTreeMap::new(),
            invalidated: BTreeSet::new(),
        }
    }

    /// Registers `slot` as a (possibly multisampled) renderbuffer and materializes it.
    pub fn attach_renderbuffer(
        &mut self,
        device: &wgpu::Device,
        slot: Slot,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        samples: u32,
    ) {
        self.set_params(
            slot,
            AttachmentParams {
                ty: TargetType::Renderbuffer,
                format,
                samples: samples.max(1),
            },
        );
        self.recreate_if_needed(device, slot, width, height);
    }

    /// Registers `slot` as a single-sample sampled texture and materializes it.
    pub fn attach_texture(
        &mut self,
        device: &wgpu::Device,
        slot: Slot,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.set_params(
            slot,
            AttachmentParams {
                ty: TargetType::Texture,
                format,
                samples: 1,
            },
        );
        self.recreate_if_needed(device, slot, width, height);
    }

    fn set_params(&mut self, slot: Slot, params: AttachmentParams) {
        // A changed backing type or format must not survive as a stale target.
        if self.params.insert(slot, params).is_some_and(|old| old != params) {
            self.targets.remove(&slot);
        }
    }

    /// Re-materializes every registered slot at the new extent.
    ///
    /// Slots whose target already has this extent are left alone. Returns the
    /// number of slots that were reallocated.
    pub fn resize_all(&mut self, device: &wgpu::Device, width: u32, height: u32) -> usize {
        let slots: Vec<Slot> = self.params.keys().copied().collect();
        slots
            .into_iter()
            .filter(|&slot| self.recreate_if_needed(device, slot, width, height))
            .count()
    }

    fn recreate_if_needed(
        &mut self,
        device: &wgpu::Device,
        slot: Slot,
        width: u32,
        height: u32,
    ) -> bool {
        let Some(params) = self.params.get(&slot).copied() else {
            log::warn!("Framebuffer '{}': slot {slot:?} was never attached", self.label);
            return false;
        };

        if let Some(target) = self.targets.get(&slot)
            && target.width() == width
            && target.height() == height
        {
            return false;
        }

        let label = format!("{} {slot:?}", self.label);
        let target = match params.ty {
            TargetType::Renderbuffer => RenderTarget::Renderbuffer(Renderbuffer::new(
                device,
                params.format,
                width,
                height,
                params.samples,
                &label,
            )),
            TargetType::Texture => RenderTarget::Texture(Texture::with_storage(
                device,
                TextureKind::D2,
                params.format,
                width,
                height,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                &label,
            )),
        };
        log::debug!("Framebuffer '{}': (re)created {slot:?} at {width}x{height}", self.label);

        // Replacing the map entry drops (and releases) the previous target.
        self.targets.insert(slot, target);
        true
    }

    #[must_use]
    pub fn get_render_target(&self, slot: Slot) -> Option<&RenderTarget> {
        self.targets.get(&slot)
    }

    /// Completeness of the current attachment table.
    #[must_use]
    pub fn check_status(&self) -> FramebufferStatus {
        let states: Vec<AttachmentState> = self
            .params
            .keys()
            .map(|&slot| match self.targets.get(&slot).filter(|t| t.is_usable()) {
                Some(target) => AttachmentState {
                    slot,
                    format: target.format(),
                    width: target.width(),
                    height: target.height(),
                    samples: target.samples(),
                },
                None => AttachmentState {
                    slot,
                    format: None,
                    width: 0,
                    height: 0,
                    samples: 0,
                },
            })
            .collect();
        FramebufferStatus::evaluate(&states)
    }

    /// Turns a non-complete status into a setup error.
    pub fn require_complete(&self) -> Result<()> {
        match self.check_status() {
            FramebufferStatus::Complete => Ok(()),
            status => Err(PbrError::FramebufferIncomplete(status)),
        }
    }

    /// Extent of the attachments, if any are allocated.
    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.targets
            .values()
            .next()
            .map(|target| (target.width(), target.height()))
    }

    /// Sample count shared by the attachments (1 when empty).
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.params.values().next().map_or(1, |params| params.samples)
    }

    /// Color formats in slot order, as pipelines targeting this framebuffer expect them.
    #[must_use]
    pub fn color_formats(&self) -> Vec<wgpu::TextureFormat> {
        self.params
            .iter()
            .filter(|(slot, _)| slot.is_color())
            .map(|(_, params)| params.format)
            .collect()
    }

    /// Color slot bound at each `@location`, up to the last attached slot.
    ///
    /// Empty slots in between stay `None` so later slots keep their index.
    #[must_use]
    pub fn color_locations(&self) -> Vec<Option<Slot>> {
        let mut locations: Vec<Option<Slot>> = Slot::COLORS
            .iter()
            .map(|&slot| self.targets.get(&slot).and_then(RenderTarget::attach).map(|_| slot))
            .collect();
        while matches!(locations.last(), Some(None)) {
            locations.pop();
        }
        locations
    }

    #[must_use]
    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.params.get(&Slot::Depth).map(|params| params.format)
    }

    /// Begins a render pass over this framebuffer.
    ///
    /// With `clear` set every attachment is cleared; otherwise only slots
    /// invalidated since the last bind are cleared and the rest are loaded.
    pub fn bind<'e>(
        &mut self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: Option<wgpu::Color>,
    ) -> wgpu::RenderPass<'e> {
        let clear_color = clear.unwrap_or(wgpu::Color::TRANSPARENT);
        let should_clear = |slot: Slot| clear.is_some() || self.invalidated.contains(&slot);

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = self
            .color_locations()
            .into_iter()
            .map(|slot| {
                let slot = slot?;
                let view = self.targets.get(&slot)?.attach()?;
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if should_clear(slot) {
                            wgpu::LoadOp::Clear(clear_color)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();

        let depth_stencil_attachment = self
            .targets
            .get(&Slot::Depth)
            .and_then(RenderTarget::attach)
            .map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: if should_clear(Slot::Depth) {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.invalidated.clear();
        pass
    }

    /// Copies each source slot's full extent into the destination slot of `dst`.
    ///
    /// Multisampled sources are resolved, single-sample sources copied. Only
    /// color is supported; depth masks are skipped with a warning. Returns the
    /// number of pairs performed.
    pub fn resolve(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        dst: &Framebuffer,
        pairs: &[ResolvePair],
    ) -> usize {
        let mut performed = 0;

        for pair in pairs {
            if !pair.mask.contains(BlitMask::COLOR) || !pair.src.is_color() || !pair.dst.is_color() {
                log::warn!(
                    "Framebuffer '{}': only color resolves are supported, skipping {:?} -> {:?}",
                    self.label,
                    pair.src,
                    pair.dst
                );
                continue;
            }
            if pair.mask.contains(BlitMask::DEPTH) {
                log::warn!("Framebuffer '{}': depth bits of a resolve are ignored", self.label);
            }

            let (Some(src), Some(dst_target)) =
                (self.targets.get(&pair.src), dst.targets.get(&pair.dst))
            else {
                log::warn!(
                    "Framebuffer '{}': resolve {:?} -> {:?} has a missing attachment",
                    self.label,
                    pair.src,
                    pair.dst
                );
                continue;
            };

            if (src.width(), src.height()) != (dst_target.width(), dst_target.height()) {
                log::error!(
                    "Framebuffer '{}': resolve {:?} ({}x{}) -> {:?} ({}x{}) extent mismatch",
                    self.label,
                    pair.src,
                    src.width(),
                    src.height(),
                    pair.dst,
                    dst_target.width(),
                    dst_target.height()
                );
                continue;
            }
            if src.format() != dst_target.format() || dst_target.samples() != 1 {
                log::error!(
                    "Framebuffer '{}': resolve {:?} -> {:?} needs matching formats and a single-sample destination",
                    self.label,
                    pair.src,
                    pair.dst
                );
                continue;
            }

            log::trace!("resolve {:?} -> {:?} ({:?})", pair.src, pair.dst, pair.filter);

            if src.samples() > 1 {
                let (Some(view), Some(resolve_view)) = (src.attach(), dst_target.attach()) else {
                    continue;
                };
                let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Framebuffer Resolve"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: Some(resolve_view),
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });
            } else {
                let (Some(src_raw), Some(dst_raw)) = (src.raw(), dst_target.raw()) else {
                    continue;
                };
                encoder.copy_texture_to_texture(
                    src_raw.as_image_copy(),
                    dst_raw.as_image_copy(),
                    wgpu::Extent3d {
                        width: src.width(),
                        height: src.height(),
                        depth_or_array_layers: 1,
                    },
                );
            }
            performed += 1;
        }

        performed
    }

    /// Marks slots whose current contents may be discarded.
    pub fn invalidate_attachments(&mut self, slots: &[Slot]) {
        self.invalidated.extend(slots.iter().copied());
    }

    #[must_use]
    pub fn is_invalidated(&self, slot: Slot) -> bool {
        self.invalidated.contains(&slot)
    }

    /// Releases every target. Remembered slot parameters are kept.
    pub fn release(&mut self) {
        self.targets.clear();
        self.invalidated.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(slot: Slot, format: wgpu::TextureFormat, w: u32, h: u32, samples: u32) -> AttachmentState {
        AttachmentState {
            slot,
            format: Some(format),
            width: w,
            height: h,
            samples,
        }
    }

    #[test]
    fn empty_table_is_not_complete() {
        assert_eq!(FramebufferStatus::evaluate(&[]), FramebufferStatus::Empty);
    }

    #[test]
    fn matching_attachments_are_complete() {
        let table = [
            state(Slot::Color0, wgpu::TextureFormat::Rgba16Float, 64, 64, 4),
            state(Slot::Color2, wgpu::TextureFormat::R16Float, 64, 64, 4),
            state(Slot::Depth, wgpu::TextureFormat::Depth32Float, 64, 64, 4),
        ];
        assert_eq!(FramebufferStatus::evaluate(&table), FramebufferStatus::Complete);
    }

    #[test]
    fn mismatched_extent_is_incomplete() {
        let table = [
            state(Slot::Color0, wgpu::TextureFormat::Rgba16Float, 64, 64, 1),
            state(Slot::Color1, wgpu::TextureFormat::Rgba16Float, 32, 64, 1),
        ];
        assert_eq!(
            FramebufferStatus::evaluate(&table),
            FramebufferStatus::IncompleteDimensions
        );
    }

    #[test]
    fn mismatched_samples_is_incomplete() {
        let table = [
            state(Slot::Color0, wgpu::TextureFormat::Rgba16Float, 64, 64, 4),
            state(Slot::Depth, wgpu::TextureFormat::Depth32Float, 64, 64, 1),
        ];
        assert_eq!(
            FramebufferStatus::evaluate(&table),
            FramebufferStatus::IncompleteMultisample
        );
    }

    #[test]
    fn formats_must_match_slot_role() {
        let depth_in_color = [state(Slot::Color1, wgpu::TextureFormat::Depth32Float, 8, 8, 1)];
        assert_eq!(
            FramebufferStatus::evaluate(&depth_in_color),
            FramebufferStatus::InvalidColorFormat(Slot::Color1)
        );

        let color_in_depth = [state(Slot::Depth, wgpu::TextureFormat::R16Float, 8, 8, 1)];
        assert_eq!(
            FramebufferStatus::evaluate(&color_in_depth),
            FramebufferStatus::InvalidDepthFormat
        );
    }

    #[test]
    fn missing_target_and_zero_extent() {
        let missing = [AttachmentState {
            slot: Slot::Color0,
            format: None,
            width: 0,
            height: 0,
            samples: 0,
        }];
        assert_eq!(
            FramebufferStatus::evaluate(&missing),
            FramebufferStatus::MissingAttachment(Slot::Color0)
        );

        let zero = [state(Slot::Color0, wgpu::TextureFormat::Rgba16Float, 0, 16, 1)];
        assert_eq!(
            FramebufferStatus::evaluate(&zero),
            FramebufferStatus::IncompleteDimensions
        );
    }

    #[test]
    fn slot_ordering_and_roles() {
        assert!(Slot::Color0 < Slot::Color1 && Slot::Color2 < Slot::Depth);
        assert!(Slot::COLORS.iter().all(|s| s.is_color()));
        assert!(!Slot::Depth.is_color());
    }

    #[test]
    fn new_framebuffer_reports_empty() {
        let fb = Framebuffer::new("test");
        assert_eq!(fb.check_status(), FramebufferStatus::Empty);
        assert_eq!(fb.size(), None);
        assert_eq!(fb.sample_count(), 1);
        assert!(fb.color_formats().is_empty());
    }
}
