//! ROS message payload decoders for the message types a RealSense recording uses.

pub mod images;
pub mod imu;
pub mod stream_info;

use anyhow::Result;

/// `std_msgs/Header` fields the exporter needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub seq: u32,
    /// Stamp in milliseconds.
    pub stamp_ms: f64,
    pub frame_id: String,
}

pub(crate) fn parse_header(payload: &[u8], cursor: &mut usize) -> Result<Header> {
    let seq = read_u32_le(payload, cursor)?;
    let secs = read_u32_le(payload, cursor)?;
    let nsecs = read_u32_le(payload, cursor)?;
    let frame_id = parse_string(payload, cursor)?;
    Ok(Header {
        seq,
        stamp_ms: secs as f64 * 1_000.0 + nsecs as f64 / 1_000_000.0,
        frame_id,
    })
}

pub(crate) fn parse_string(payload: &[u8], cursor: &mut usize) -> Result<String> {
    let bytes = read_bytes(payload, cursor)?;
    Ok(String::from_utf8_lossy(bytes).to_string())
}

/// Length-prefixed byte array (`uint8[]`).
pub(crate) fn read_bytes<'a>(payload: &'a [u8], cursor: &mut usize) -> Result<&'a [u8]> {
    let len = read_u32_le(payload, cursor)? as usize;
    if payload.len() < *cursor + len {
        return Err(anyhow::anyhow!("payload too short for {} byte array", len));
    }
    let bytes = &payload[*cursor..*cursor + len];
    *cursor += len;
    Ok(bytes)
}

pub(crate) fn read_u8(payload: &[u8], cursor: &mut usize) -> Result<u8> {
    if *cursor + 1 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let val = payload[*cursor];
    *cursor += 1;
    Ok(val)
}

pub(crate) fn read_u32_le(payload: &[u8], cursor: &mut usize) -> Result<u32> {
    if *cursor + 4 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let val = u32::from_le_bytes([
        payload[*cursor],
        payload[*cursor + 1],
        payload[*cursor + 2],
        payload[*cursor + 3],
    ]);
    *cursor += 4;
    Ok(val)
}

pub(crate) fn read_f64_le(payload: &[u8], cursor: &mut usize) -> Result<f64> {
    if *cursor + 8 > payload.len() {
        return Err(anyhow::anyhow!("payload too short"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&payload[*cursor..*cursor + 8]);
    *cursor += 8;
    Ok(f64::from_le_bytes(buf))
}
