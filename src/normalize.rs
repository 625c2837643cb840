//! Sensor-native encodings → canonical in-memory representation.
//!
//! Normalization is pure: no I/O, and the same input bytes always produce the
//! same output. Image conversions are looked up in [`CONVERSIONS`] by
//! modality and native format; each entry is a plain function over the packed
//! pixel buffer.

use crate::error::Bag2ImageError;
use crate::sample::{
    Modality, MotionSample, Normalized, NormalizedImage, PixelData, PixelFormat, RawSample,
    SamplePayload, StreamKind,
};

pub type Conversion = fn(width: usize, height: usize, data: &[u8]) -> PixelData;

pub struct ConversionEntry {
    pub modality: Modality,
    /// `None` accepts any native format.
    pub format: Option<PixelFormat>,
    /// Canonical output, for the `formats` listing.
    pub output: &'static str,
    pub convert: Conversion,
}

pub static CONVERSIONS: [ConversionEntry; 13] = [
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Rgb8), output: "BGR8", convert: rgb_to_bgr },
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Rgba8), output: "BGRA8", convert: rgba_to_bgra },
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Bgr8), output: "BGR8", convert: copy_bgr },
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Bgra8), output: "BGRA8", convert: copy_bgra },
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Y16), output: "GRAY8", convert: y16_to_gray8 },
    ConversionEntry { modality: Modality::Color, format: Some(PixelFormat::Yuyv), output: "BGR8", convert: yuyv_to_bgr },
    ConversionEntry { modality: Modality::Depth, format: None, output: "GRAY16", convert: depth_passthrough },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Rgb8), output: "BGR8", convert: rgb_to_bgr },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Rgba8), output: "BGRA8", convert: rgba_to_bgra },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Bgr8), output: "BGR8", convert: copy_bgr },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Bgra8), output: "BGRA8", convert: copy_bgra },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Y8), output: "GRAY8", convert: copy_gray },
    ConversionEntry { modality: Modality::Infrared, format: Some(PixelFormat::Uyvy), output: "GRAY8", convert: uyvy_to_gray },
];

/// Exact format match first, then the modality's wildcard entry.
pub fn lookup(modality: Modality, format: &PixelFormat) -> Option<&'static ConversionEntry> {
    CONVERSIONS
        .iter()
        .find(|e| e.modality == modality && e.format.as_ref() == Some(format))
        .or_else(|| CONVERSIONS.iter().find(|e| e.modality == modality && e.format.is_none()))
}

pub fn normalize(kind: StreamKind, sample: &RawSample) -> Result<Normalized, Bag2ImageError> {
    let malformed = |reason: String| Bag2ImageError::MalformedSample {
        stream: kind,
        frame_number: sample.frame_number,
        reason,
    };

    match &sample.payload {
        SamplePayload::Motion(vector) => {
            if !kind.is_motion() {
                return Err(malformed("motion payload on an image stream".to_string()));
            }
            Ok(Normalized::Motion(MotionSample {
                frame_number: sample.frame_number,
                timestamp: sample.timestamp,
                vector: *vector,
            }))
        }
        SamplePayload::Pixels { width, height, data } => {
            if kind.is_motion() {
                return Err(malformed("pixel payload on a motion stream".to_string()));
            }
            let entry = lookup(kind.modality(), &sample.format).ok_or_else(|| {
                Bag2ImageError::UnsupportedFormat { stream: kind, format: sample.format.clone() }
            })?;

            let (w, h) = (*width as usize, *height as usize);
            // depth is always read as 16-bit, whatever the tag says
            let bpp = match kind {
                StreamKind::Depth => 2,
                _ => sample.format.bytes_per_pixel().unwrap_or(2),
            };
            let expected = w * h * bpp;
            if data.len() != expected {
                return Err(malformed(format!(
                    "{}x{} {} needs {} bytes, got {}",
                    w,
                    h,
                    sample.format,
                    expected,
                    data.len()
                )));
            }
            if matches!(sample.format, PixelFormat::Yuyv | PixelFormat::Uyvy) && w % 2 != 0 {
                return Err(malformed(format!("4:2:2 image with odd width {w}")));
            }

            let image = NormalizedImage {
                width: *width,
                height: *height,
                pixels: (entry.convert)(w, h, data),
            };
            debug_assert!(image.is_consistent());
            Ok(Normalized::Image(image))
        }
    }
}

fn rgb_to_bgr(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    let mut buf = data.to_vec();
    for px in buf.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    PixelData::Bgr8(buf)
}

fn rgba_to_bgra(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    let mut buf = data.to_vec();
    for px in buf.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    PixelData::Bgra8(buf)
}

fn copy_bgr(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Bgr8(data.to_vec())
}

fn copy_bgra(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Bgra8(data.to_vec())
}

fn copy_gray(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Gray8(data.to_vec())
}

/// Linear `[0, 65535] → [0, 255]`.
fn y16_to_gray8(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Gray8(
        data.chunks_exact(2)
            .map(|c| {
                let v = u16::from_le_bytes([c[0], c[1]]);
                (v as f64 * 255.0 / 65535.0).round() as u8
            })
            .collect(),
    )
}

fn depth_passthrough(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Depth16(data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect())
}

/// U Y0 V Y1: luma is every second byte.
fn uyvy_to_gray(_width: usize, _height: usize, data: &[u8]) -> PixelData {
    PixelData::Gray8(data.chunks_exact(2).map(|c| c[1]).collect())
}

// BT.601 video-range coefficients, 20-bit fixed point.
const YUV_SHIFT: i32 = 20;
const YUV_HALF: i32 = 1 << (YUV_SHIFT - 1);
const YUV_CY: i32 = 1_220_542;
const YUV_CUB: i32 = 2_116_026;
const YUV_CUG: i32 = -409_993;
const YUV_CVG: i32 = -852_492;
const YUV_CVR: i32 = 1_673_527;

/// Y0 U Y1 V macro-pixels → two BGR pixels each.
fn yuyv_to_bgr(width: usize, height: usize, data: &[u8]) -> PixelData {
    let mut out = Vec::with_capacity(width * height * 3);
    for quad in data.chunks_exact(4) {
        let u = quad[1] as i32 - 128;
        let v = quad[3] as i32 - 128;
        let ruv = YUV_HALF + YUV_CVR * v;
        let guv = YUV_HALF + YUV_CVG * v + YUV_CUG * u;
        let buv = YUV_HALF + YUV_CUB * u;
        for y in [quad[0], quad[2]] {
            let y = (y as i32 - 16).max(0) * YUV_CY;
            out.push(clamp_u8((y + buv) >> YUV_SHIFT));
            out.push(clamp_u8((y + guv) >> YUV_SHIFT));
            out.push(clamp_u8((y + ruv) >> YUV_SHIFT));
        }
    }
    PixelData::Bgr8(out)
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}
