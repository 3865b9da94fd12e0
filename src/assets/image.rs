//! Image Loader
//!
//! Decodes image files into tightly packed 8-bit or 32-bit float pixels with
//! a caller-chosen channel count. Radiance HDR and 32-bit float sources stay
//! high dynamic range; everything else is converted to 8 bits per channel.

use std::path::Path;

use half::f16;
use image::{DynamicImage, GenericImageView};

use crate::errors::{PbrError, Result};

/// Decoded pixel storage, row-major with interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    Ldr(Vec<u8>),
    Hdr(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u32,
    pixels: PixelData,
}

impl Image {
    /// Decodes `path`. `channels == 0` keeps the file's native channel count.
    pub fn from_file(path: impl AsRef<Path>, channels: u32) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading image: {}", path.display());

        let decoded = image::open(path).map_err(|err| PbrError::asset(path.display().to_string(), err.to_string()))?;
        Self::from_dynamic(decoded, channels)
            .map_err(|err| PbrError::asset(path.display().to_string(), err.to_string()))
    }

    /// Decodes an in-memory encoded image.
    pub fn from_memory(bytes: &[u8], channels: u32) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_dynamic(decoded, channels)
    }

    /// Converts a decoded image to the requested channel count.
    pub fn from_dynamic(decoded: DynamicImage, channels: u32) -> Result<Self> {
        let (width, height) = decoded.dimensions();
        let native = u32::from(decoded.color().channel_count());
        let channels = if channels == 0 { native } else { channels };
        let hdr = matches!(
            decoded,
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
        );

        let pixels = match (hdr, channels) {
            (true, 1) => PixelData::Hdr(decoded.to_luma32f().into_raw()),
            (true, 2) => PixelData::Hdr(decoded.to_luma_alpha32f().into_raw()),
            (true, 3) => PixelData::Hdr(decoded.to_rgb32f().into_raw()),
            (true, 4) => PixelData::Hdr(decoded.to_rgba32f().into_raw()),
            (false, 1) => PixelData::Ldr(decoded.to_luma8().into_raw()),
            (false, 2) => PixelData::Ldr(decoded.to_luma_alpha8().into_raw()),
            (false, 3) => PixelData::Ldr(decoded.to_rgb8().into_raw()),
            (false, 4) => PixelData::Ldr(decoded.to_rgba8().into_raw()),
            _ => {
                return Err(PbrError::ImageDecodeError(format!(
                    "unsupported channel count {channels}"
                )));
            }
        };

        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Wraps raw 8-bit pixels.
    pub fn from_ldr(width: u32, height: u32, channels: u32, pixels: Vec<u8>) -> Result<Self> {
        Self::check_len(width, height, channels, pixels.len())?;
        Ok(Self {
            width,
            height,
            channels,
            pixels: PixelData::Ldr(pixels),
        })
    }

    /// Wraps raw float pixels.
    pub fn from_hdr(width: u32, height: u32, channels: u32, pixels: Vec<f32>) -> Result<Self> {
        Self::check_len(width, height, channels, pixels.len())?;
        Ok(Self {
            width,
            height,
            channels,
            pixels: PixelData::Hdr(pixels),
        })
    }

    fn check_len(width: u32, height: u32, channels: u32, len: usize) -> Result<()> {
        if !(1..=4).contains(&channels) {
            return Err(PbrError::ImageDecodeError(format!(
                "unsupported channel count {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if len != expected {
            return Err(PbrError::ImageDecodeError(format!(
                "expected {expected} values for {width}x{height}x{channels}, got {len}"
            )));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    #[inline]
    #[must_use]
    pub fn is_hdr(&self) -> bool {
        matches!(self.pixels, PixelData::Hdr(_))
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &PixelData {
        &self.pixels
    }

    fn value(&self, index: usize) -> f32 {
        match &self.pixels {
            PixelData::Ldr(p) => f32::from(p[index]) / 255.0,
            PixelData::Hdr(p) => p[index],
        }
    }

    /// Single-channel image holding channel `channel` of every pixel.
    pub fn extract_channel(&self, channel: u32) -> Result<Self> {
        if channel >= self.channels {
            return Err(PbrError::ImageDecodeError(format!(
                "channel {channel} out of range for a {}-channel image",
                self.channels
            )));
        }
        let stride = self.channels as usize;
        let pick = |len: usize| (channel as usize..len).step_by(stride);
        let pixels = match &self.pixels {
            PixelData::Ldr(p) => PixelData::Ldr(pick(p.len()).map(|i| p[i]).collect()),
            PixelData::Hdr(p) => PixelData::Hdr(pick(p.len()).map(|i| p[i]).collect()),
        };
        Ok(Self {
            width: self.width,
            height: self.height,
            channels: 1,
            pixels,
        })
    }

    /// Pixels as normalized floats widened to RGBA; missing alpha is 1.
    fn rgba_f32(&self) -> impl Iterator<Item = [f32; 4]> + '_ {
        let stride = self.channels as usize;
        let count = self.width as usize * self.height as usize;
        (0..count).map(move |i| {
            let base = i * stride;
            let v = |c: usize| self.value(base + c);
            match stride {
                1 => [v(0), v(0), v(0), 1.0],
                2 => [v(0), v(0), v(0), v(1)],
                3 => [v(0), v(1), v(2), 1.0],
                _ => [v(0), v(1), v(2), v(3)],
            }
        })
    }

    /// 8-bit RGBA, padding missing channels (alpha 255).
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        if let PixelData::Ldr(p) = &self.pixels
            && self.channels == 4
        {
            return p.clone();
        }
        self.rgba_f32()
            .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    /// 8-bit pixels with the image's own channel count.
    #[must_use]
    pub fn to_ldr_bytes(&self) -> Vec<u8> {
        match &self.pixels {
            PixelData::Ldr(p) => p.clone(),
            PixelData::Hdr(p) => p
                .iter()
                .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect(),
        }
    }

    /// Half-float RGBA bit patterns, padding missing channels (alpha 1).
    #[must_use]
    pub fn to_rgba16f_bits(&self) -> Vec<u16> {
        self.rgba_f32()
            .flat_map(|px| px.map(|c| f16::from_f32(c).to_bits()))
            .collect()
    }
}
