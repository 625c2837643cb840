//! Image codec adapter over the `image` crate.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, GrayImage, ImageBuffer, ImageFormat, Luma};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::sample::{NormalizedImage, PixelData};

/// Depth values at or beyond this many units render black.
pub const DEPTH_DISPLAY_MAX: u16 = 10_000;

/// Colorspace of a buffer handed to [`convert_colorspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Bgr,
    Bgra,
    Rgb,
    Rgba,
    Gray,
}

impl ColorSpace {
    fn channels(self) -> usize {
        match self {
            ColorSpace::Bgr | ColorSpace::Rgb => 3,
            ColorSpace::Bgra | ColorSpace::Rgba => 4,
            ColorSpace::Gray => 1,
        }
    }
}

/// Convert interleaved 8-bit pixels between colorspaces.
pub fn convert_colorspace(buf: &[u8], from: ColorSpace, to: ColorSpace) -> Vec<u8> {
    use ColorSpace::*;

    if from == to {
        return buf.to_vec();
    }
    let pixels = buf.len() / from.channels();
    let mut out = Vec::with_capacity(pixels * to.channels());
    for px in buf.chunks_exact(from.channels()) {
        let (r, g, b, a) = match from {
            Bgr => (px[2], px[1], px[0], 255),
            Bgra => (px[2], px[1], px[0], px[3]),
            Rgb => (px[0], px[1], px[2], 255),
            Rgba => (px[0], px[1], px[2], px[3]),
            Gray => (px[0], px[0], px[0], 255),
        };
        match to {
            Bgr => out.extend_from_slice(&[b, g, r]),
            Bgra => out.extend_from_slice(&[b, g, r, a]),
            Rgb => out.extend_from_slice(&[r, g, b]),
            Rgba => out.extend_from_slice(&[r, g, b, a]),
            Gray => out.push(luma(r, g, b)),
        }
    }
    out
}

// ITU-R BT.601 luma
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

/// `255 - 255 * min(d, 10000) / 10000`, rounded into `[0, 255]`.
pub fn scale_depth_for_display(depth: &[u16]) -> Vec<u8> {
    depth
        .iter()
        .map(|&d| {
            let d = d.min(DEPTH_DISPLAY_MAX) as f32;
            (255.0 - 255.0 * d / DEPTH_DISPLAY_MAX as f32).round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Encode an 8-bit image as JPEG. BGR(A) is swapped to RGB and alpha dropped.
pub fn encode_jpeg(img: &NormalizedImage, path: &Path, quality: u8) -> Result<()> {
    let (buf, color) = match &img.pixels {
        PixelData::Bgr8(data) => (convert_colorspace(data, ColorSpace::Bgr, ColorSpace::Rgb), ExtendedColorType::Rgb8),
        PixelData::Bgra8(data) => (convert_colorspace(data, ColorSpace::Bgra, ColorSpace::Rgb), ExtendedColorType::Rgb8),
        PixelData::Gray8(data) => (data.clone(), ExtendedColorType::L8),
        PixelData::Depth16(_) => anyhow::bail!("16-bit depth can't be written as JPEG"),
    };
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode(&buf, img.width, img.height, color)
        .with_context(|| format!("failed to encode {}", path.display()))?;
    writer.flush().with_context(|| format!("failed to write {}", path.display()))
}

/// Write a depth image as PNG: raw 16-bit, or 8-bit display-scaled.
pub fn encode_depth_png(img: &NormalizedImage, path: &Path, scaling: bool) -> Result<()> {
    let PixelData::Depth16(depth) = &img.pixels else {
        anyhow::bail!("expected a 16-bit depth image for {}", path.display());
    };
    let written = if scaling {
        let gray = GrayImage::from_raw(img.width, img.height, scale_depth_for_display(depth))
            .context("depth buffer does not match its dimensions")?;
        gray.save_with_format(path, ImageFormat::Png)
    } else {
        let buf = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(img.width, img.height, depth.clone())
            .context("depth buffer does not match its dimensions")?;
        buf.save_with_format(path, ImageFormat::Png)
    };
    written.with_context(|| format!("failed to write {}", path.display()))
}

/// Packed RGB24 for the preview viewer; depth is always display-scaled.
pub fn to_rgb24(img: &NormalizedImage) -> Vec<u8> {
    match &img.pixels {
        PixelData::Bgr8(data) => convert_colorspace(data, ColorSpace::Bgr, ColorSpace::Rgb),
        PixelData::Bgra8(data) => convert_colorspace(data, ColorSpace::Bgra, ColorSpace::Rgb),
        PixelData::Gray8(data) => convert_colorspace(data, ColorSpace::Gray, ColorSpace::Rgb),
        PixelData::Depth16(depth) => {
            convert_colorspace(&scale_depth_for_display(depth), ColorSpace::Gray, ColorSpace::Rgb)
        }
    }
}
