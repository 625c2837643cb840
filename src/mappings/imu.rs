//! `sensor_msgs/Imu` → motion [`RawSample`].
//!
//! RealSense writes one message per gyro or accel sample; the gyro vector is
//! stored in `angular_velocity` and the accel vector in `linear_acceleration`.

use anyhow::Result;
use nalgebra::{Quaternion, Vector3};

use super::{Header, parse_header, read_f64_le};
use crate::sample::{Modality, PixelFormat, RawSample, SamplePayload};

#[derive(Debug)]
pub struct ImuData {
    pub header: Header,
    pub orientation: Quaternion<f64>,
    pub angular_velocity: Vector3<f64>,
    pub linear_acceleration: Vector3<f64>,
}

pub fn imu_to_sample(modality: Modality, stream_index: u32, payload: &[u8]) -> Result<RawSample> {
    let imu = parse_ros_imu(payload)?;
    let vector = match modality {
        Modality::Gyro => imu.angular_velocity,
        Modality::Accel => imu.linear_acceleration,
        other => return Err(anyhow::anyhow!("{} stream carries no motion data", other)),
    };
    Ok(RawSample {
        modality,
        stream_index,
        format: PixelFormat::MotionXyz32f,
        frame_number: imu.header.seq as u64,
        timestamp: imu.header.stamp_ms,
        payload: SamplePayload::Motion(vector),
    })
}

pub fn parse_ros_imu(payload: &[u8]) -> Result<ImuData> {
    let mut cursor = 0;
    let header = parse_header(payload, &mut cursor)?;

    let qx = read_f64_le(payload, &mut cursor)?;
    let qy = read_f64_le(payload, &mut cursor)?;
    let qz = read_f64_le(payload, &mut cursor)?;
    let qw = read_f64_le(payload, &mut cursor)?;
    skip_covariance(payload, &mut cursor)?;

    let angular_velocity = read_vector3(payload, &mut cursor)?;
    skip_covariance(payload, &mut cursor)?;

    let linear_acceleration = read_vector3(payload, &mut cursor)?;

    Ok(ImuData {
        header,
        orientation: Quaternion::new(qw, qx, qy, qz),
        angular_velocity,
        linear_acceleration,
    })
}

fn read_vector3(payload: &[u8], cursor: &mut usize) -> Result<Vector3<f64>> {
    let x = read_f64_le(payload, cursor)?;
    let y = read_f64_le(payload, cursor)?;
    let z = read_f64_le(payload, cursor)?;
    Ok(Vector3::new(x, y, z))
}

// float64[9]
fn skip_covariance(payload: &[u8], cursor: &mut usize) -> Result<()> {
    if payload.len() < *cursor + 72 {
        return Err(anyhow::anyhow!("payload too short for covariance"));
    }
    *cursor += 72;
    Ok(())
}

#[cfg(test)]
pub(crate) fn encode_ros_imu(seq: u32, stamp_ms: u64, angular: [f64; 3], linear: [f64; 3]) -> Vec<u8> {
    use super::test_payloads::header;

    let secs = (stamp_ms / 1000) as u32;
    let nsecs = ((stamp_ms % 1000) * 1_000_000) as u32;
    let mut payload = header(seq, secs, nsecs, "camera_imu_optical_frame");
    for v in [0.0f64, 0.0, 0.0, 1.0] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload.extend_from_slice(&[0u8; 72]);
    for v in angular {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload.extend_from_slice(&[0u8; 72]);
    for v in linear {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload.extend_from_slice(&[0u8; 72]);
    payload
}
