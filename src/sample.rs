//! Sample types shared by the playback provider, classifier, normalizer and exporter.

use std::fmt;

use nalgebra::Vector3;
use serde::Serialize;
use smallvec::SmallVec;

/// Sensor modality as named by the recording (`Color_0`, `Infrared_2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Modality {
    Color,
    Depth,
    Infrared,
    Gyro,
    Accel,
}

impl Modality {
    /// Map a RealSense stream name to a supported modality.
    pub fn from_stream_name(name: &str) -> Option<Self> {
        match name {
            "Color" => Some(Modality::Color),
            "Depth" => Some(Modality::Depth),
            "Infrared" => Some(Modality::Infrared),
            "Gyro" => Some(Modality::Gyro),
            "Accel" => Some(Modality::Accel),
            _ => None,
        }
    }

    pub fn is_motion(self) -> bool {
        matches!(self, Modality::Gyro | Modality::Accel)
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::Color => "Color",
            Modality::Depth => "Depth",
            Modality::Infrared => "Infrared",
            Modality::Gyro => "Gyro",
            Modality::Accel => "Accel",
        };
        f.write_str(name)
    }
}

/// Logical export channel. Left and right infrared are separate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StreamKind {
    Color,
    Depth,
    InfraredLeft,
    InfraredRight,
    Gyro,
    Accel,
}

impl StreamKind {
    pub const ALL: [StreamKind; 6] = [
        StreamKind::Color,
        StreamKind::Depth,
        StreamKind::InfraredLeft,
        StreamKind::InfraredRight,
        StreamKind::Gyro,
        StreamKind::Accel,
    ];

    /// Output subdirectory under the export root. Gyro and Accel share `IMU`.
    pub fn subdir(self) -> &'static str {
        match self {
            StreamKind::Color => "Color",
            StreamKind::Depth => "Depth",
            StreamKind::InfraredLeft => "IR",
            StreamKind::InfraredRight => "IR_Right",
            StreamKind::Gyro | StreamKind::Accel => "IMU",
        }
    }

    /// Name of the metadata log inside [`StreamKind::subdir`].
    pub fn metadata_file(self) -> &'static str {
        match self {
            StreamKind::Gyro => "gyro_data.csv",
            StreamKind::Accel => "accel_data.csv",
            _ => "metadata.csv",
        }
    }

    /// Image file extension, `None` for motion kinds.
    pub fn image_extension(self) -> Option<&'static str> {
        match self {
            StreamKind::Color | StreamKind::InfraredLeft | StreamKind::InfraredRight => Some("jpg"),
            StreamKind::Depth => Some("png"),
            StreamKind::Gyro | StreamKind::Accel => None,
        }
    }

    pub fn modality(self) -> Modality {
        match self {
            StreamKind::Color => Modality::Color,
            StreamKind::Depth => Modality::Depth,
            StreamKind::InfraredLeft | StreamKind::InfraredRight => Modality::Infrared,
            StreamKind::Gyro => Modality::Gyro,
            StreamKind::Accel => Modality::Accel,
        }
    }

    pub fn is_motion(self) -> bool {
        self.modality().is_motion()
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Color => "Color",
            StreamKind::Depth => "Depth",
            StreamKind::InfraredLeft => "Infrared (left)",
            StreamKind::InfraredRight => "Infrared (right)",
            StreamKind::Gyro => "Gyro",
            StreamKind::Accel => "Accel",
        };
        f.write_str(name)
    }
}

/// Sensor-native encoding of a sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Z16,
    Y8,
    Y16,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
    Yuyv,
    Uyvy,
    MotionXyz32f,
    Unknown(String),
}

impl PixelFormat {
    /// Resolve a ROS image encoding tag. `mono16` is depth (Z16) on depth
    /// streams and Y16 everywhere else.
    pub fn from_encoding(encoding: &str, modality: Modality) -> Self {
        match encoding.to_ascii_lowercase().as_str() {
            "rgb8" => PixelFormat::Rgb8,
            "bgr8" => PixelFormat::Bgr8,
            "rgba8" => PixelFormat::Rgba8,
            "bgra8" => PixelFormat::Bgra8,
            "8uc1" | "mono8" | "y8" => PixelFormat::Y8,
            "16uc1" | "y16" => PixelFormat::Y16,
            "mono16" if modality == Modality::Depth => PixelFormat::Z16,
            "mono16" => PixelFormat::Y16,
            "z16" => PixelFormat::Z16,
            "yuv422" | "uyvy" => PixelFormat::Uyvy,
            "yuyv" => PixelFormat::Yuyv,
            _ => PixelFormat::Unknown(encoding.to_string()),
        }
    }

    /// Packed bytes per pixel, `None` when unknown or not an image format.
    pub fn bytes_per_pixel(&self) -> Option<usize> {
        match self {
            PixelFormat::Y8 => Some(1),
            PixelFormat::Z16 | PixelFormat::Y16 | PixelFormat::Yuyv | PixelFormat::Uyvy => Some(2),
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => Some(3),
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => Some(4),
            PixelFormat::MotionXyz32f | PixelFormat::Unknown(_) => None,
        }
    }

    /// True for formats stored as 16-bit words.
    pub fn is_16bit(&self) -> bool {
        matches!(self, PixelFormat::Z16 | PixelFormat::Y16)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Z16 => f.write_str("Z16"),
            PixelFormat::Y8 => f.write_str("Y8"),
            PixelFormat::Y16 => f.write_str("Y16"),
            PixelFormat::Rgb8 => f.write_str("RGB8"),
            PixelFormat::Bgr8 => f.write_str("BGR8"),
            PixelFormat::Rgba8 => f.write_str("RGBA8"),
            PixelFormat::Bgra8 => f.write_str("BGRA8"),
            PixelFormat::Yuyv => f.write_str("YUYV"),
            PixelFormat::Uyvy => f.write_str("UYVY"),
            PixelFormat::MotionXyz32f => f.write_str("MOTION_XYZ32F"),
            PixelFormat::Unknown(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamplePayload {
    /// Tightly packed little-endian pixel rows.
    Pixels { width: u32, height: u32, data: Vec<u8> },
    Motion(Vector3<f64>),
}

/// One sensor sample as delivered by the playback provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub modality: Modality,
    /// Provider-assigned stream index (`Infrared_1` → 1).
    pub stream_index: u32,
    pub format: PixelFormat,
    /// Native frame number, unique per stream only.
    pub frame_number: u64,
    /// Capture timestamp in milliseconds.
    pub timestamp: f64,
    pub payload: SamplePayload,
}

/// Samples returned by one acquisition call, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SampleBundle {
    samples: SmallVec<[RawSample; 6]>,
}

impl SampleBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: RawSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains_stream(&self, modality: Modality, stream_index: u32) -> bool {
        self.samples
            .iter()
            .any(|s| s.modality == modality && s.stream_index == stream_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawSample> {
        self.samples.iter()
    }
}

impl FromIterator<RawSample> for SampleBundle {
    fn from_iter<I: IntoIterator<Item = RawSample>>(iter: I) -> Self {
        Self { samples: iter.into_iter().collect() }
    }
}

impl IntoIterator for SampleBundle {
    type Item = RawSample;
    type IntoIter = smallvec::IntoIter<[RawSample; 6]>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// Canonical pixel storage. Color is 8-bit BGR/BGRA, depth is 16-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    Bgr8(Vec<u8>),
    Bgra8(Vec<u8>),
    Gray8(Vec<u8>),
    Depth16(Vec<u16>),
}

impl PixelData {
    pub fn channels(&self) -> usize {
        match self {
            PixelData::Bgr8(_) => 3,
            PixelData::Bgra8(_) => 4,
            PixelData::Gray8(_) | PixelData::Depth16(_) => 1,
        }
    }

    pub fn bytes_per_channel(&self) -> usize {
        match self {
            PixelData::Depth16(_) => 2,
            _ => 1,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            PixelData::Bgr8(b) | PixelData::Bgra8(b) | PixelData::Gray8(b) => b.len(),
            PixelData::Depth16(d) => d.len() * 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: PixelData,
}

impl NormalizedImage {
    /// Buffer length matches `width * height * channels * bytes_per_channel`.
    pub fn is_consistent(&self) -> bool {
        let expected = self.width as usize
            * self.height as usize
            * self.pixels.channels()
            * self.pixels.bytes_per_channel();
        self.pixels.byte_len() == expected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub frame_number: u64,
    pub timestamp: f64,
    pub vector: Vector3<f64>,
}

/// Output of the normalizer for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Image(NormalizedImage),
    Motion(MotionSample),
}

/// One metadata row.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportRecord {
    Image {
        frame_number: u64,
        timestamp: f64,
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    Motion {
        frame_number: u64,
        timestamp: f64,
        x: f64,
        y: f64,
        z: f64,
    },
}

pub const IMAGE_CSV_HEADER: &str = "frame_number,timestamp,width,height,format";
pub const MOTION_CSV_HEADER: &str = "frame_number,timestamp,x,y,z";

impl ExportRecord {
    /// Build the metadata row for a sample. Image rows carry the raw dimensions.
    pub fn from_sample(sample: &RawSample) -> Self {
        match &sample.payload {
            SamplePayload::Pixels { width, height, .. } => ExportRecord::Image {
                frame_number: sample.frame_number,
                timestamp: sample.timestamp,
                width: *width,
                height: *height,
                format: sample.format.clone(),
            },
            SamplePayload::Motion(v) => ExportRecord::Motion {
                frame_number: sample.frame_number,
                timestamp: sample.timestamp,
                x: v.x,
                y: v.y,
                z: v.z,
            },
        }
    }

    pub fn frame_number(&self) -> u64 {
        match self {
            ExportRecord::Image { frame_number, .. } | ExportRecord::Motion { frame_number, .. } => *frame_number,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            ExportRecord::Image { .. } => IMAGE_CSV_HEADER,
            ExportRecord::Motion { .. } => MOTION_CSV_HEADER,
        }
    }

    /// Metadata fields in header order.
    pub fn csv_record(&self) -> Vec<String> {
        match self {
            ExportRecord::Image { frame_number, timestamp, width, height, format } => vec![
                frame_number.to_string(),
                format!("{timestamp:.6}"),
                width.to_string(),
                height.to_string(),
                format.to_string(),
            ],
            ExportRecord::Motion { frame_number, timestamp, x, y, z } => vec![
                frame_number.to_string(),
                format!("{timestamp:.6}"),
                format!("{x:.6}"),
                format!("{y:.6}"),
                format!("{z:.6}"),
            ],
        }
    }
}
