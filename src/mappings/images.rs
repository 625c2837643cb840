//! `sensor_msgs/Image` → [`RawSample`].

use anyhow::Result;

use super::{Header, parse_header, parse_string, read_bytes, read_u8, read_u32_le};
use crate::sample::{Modality, PixelFormat, RawSample, SamplePayload};

#[derive(Debug)]
pub struct RosImage<'a> {
    pub header: Header,
    pub height: usize,
    pub width: usize,
    pub encoding: String,
    pub is_bigendian: bool,
    pub step: usize,
    pub data: &'a [u8],
}

/// Decode an image message into a tightly packed little-endian sample.
///
/// Row padding (`step` larger than the packed row) is stripped and 16-bit
/// big-endian data is byte-swapped. Frame number and timestamp come from the
/// message header.
pub fn image_to_sample(modality: Modality, stream_index: u32, payload: &[u8]) -> Result<RawSample> {
    let img = parse_ros_image(payload)?;
    let format = PixelFormat::from_encoding(&img.encoding, modality);

    // depth is always 16-bit, whatever the encoding tag
    let depth = modality == Modality::Depth;
    let bpp = if depth { Some(2) } else { format.bytes_per_pixel() };
    let row_bytes = match bpp {
        Some(bpp) => img.width * bpp,
        None => img.step,
    };
    if img.step < row_bytes {
        return Err(anyhow::anyhow!(
            "image step {} shorter than packed row of {} bytes",
            img.step,
            row_bytes
        ));
    }
    let needed = img.step * (img.height - 1) + row_bytes;
    if img.data.len() < needed {
        return Err(anyhow::anyhow!(
            "image data has {} bytes, {}x{} {} needs {}",
            img.data.len(),
            img.width,
            img.height,
            img.encoding,
            needed
        ));
    }

    let mut data = if img.step == row_bytes {
        img.data[..row_bytes * img.height].to_vec()
    } else {
        let mut packed = Vec::with_capacity(row_bytes * img.height);
        for row in 0..img.height {
            let start = row * img.step;
            packed.extend_from_slice(&img.data[start..start + row_bytes]);
        }
        packed
    };
    if img.is_bigendian && (depth || format.is_16bit()) {
        for px in data.chunks_exact_mut(2) {
            px.swap(0, 1);
        }
    }

    tracing::debug!(
        "decoded {} {}x{} {} frame {}",
        modality,
        img.width,
        img.height,
        format,
        img.header.seq
    );
    Ok(RawSample {
        modality,
        stream_index,
        format,
        frame_number: img.header.seq as u64,
        timestamp: img.header.stamp_ms,
        payload: SamplePayload::Pixels {
            width: img.width as u32,
            height: img.height as u32,
            data,
        },
    })
}

pub fn parse_ros_image(payload: &[u8]) -> Result<RosImage<'_>> {
    let mut cursor = 0;
    let header = parse_header(payload, &mut cursor)?;
    let height = read_u32_le(payload, &mut cursor)? as usize;
    let width = read_u32_le(payload, &mut cursor)? as usize;
    let encoding = parse_string(payload, &mut cursor)?;
    let is_bigendian = read_u8(payload, &mut cursor)? != 0;
    let step = read_u32_le(payload, &mut cursor)? as usize;
    let data = read_bytes(payload, &mut cursor)?;

    if height == 0 || width == 0 || height > 10000 || width > 10000 {
        return Err(anyhow::anyhow!(
            "invalid image dimensions: {}x{}",
            width,
            height
        ));
    }

    Ok(RosImage {
        header,
        height,
        width,
        encoding,
        is_bigendian,
        step,
        data,
    })
}

#[cfg(test)]
pub(crate) fn encode_ros_image(
    seq: u32,
    stamp_ms: u64,
    width: u32,
    height: u32,
    encoding: &str,
    step: u32,
    is_bigendian: bool,
    data: &[u8],
) -> Vec<u8> {
    use super::test_payloads::{header, push_string};

    let secs = (stamp_ms / 1000) as u32;
    let nsecs = ((stamp_ms % 1000) * 1_000_000) as u32;
    let mut payload = header(seq, secs, nsecs, "camera_optical_frame");
    payload.extend_from_slice(&height.to_le_bytes());
    payload.extend_from_slice(&width.to_le_bytes());
    push_string(&mut payload, encoding);
    payload.push(is_bigendian as u8);
    payload.extend_from_slice(&step.to_le_bytes());
    payload.extend_from_slice(&(data.len() as u32).to_le_bytes());
    payload.extend_from_slice(data);
    payload
}
