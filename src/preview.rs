//! Live preview of exported samples in a Rerun viewer or `.rrd` file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::codec;
use crate::sample::{Normalized, StreamKind};

pub const TIMELINE: &str = "capture_time";

/// Entity each stream is logged under.
pub fn entity_path(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Color => "/Color",
        StreamKind::Depth => "/Depth",
        StreamKind::InfraredLeft => "/IR",
        StreamKind::InfraredRight => "/IR_Right",
        StreamKind::Gyro => "/IMU/gyro",
        StreamKind::Accel => "/IMU/accel",
    }
}

pub struct Preview {
    rec: rerun::RecordingStream,
}

impl Preview {
    /// Spawn a viewer process and stream into it.
    pub fn spawn(recording_id: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(recording_id)
            .spawn()
            .context("failed to spawn the rerun viewer")?;
        Ok(Self { rec })
    }

    pub fn save(recording_id: &str, path: &Path) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(recording_id)
            .save(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        tracing::info!("saving preview to {}", path.display());
        Ok(Self { rec })
    }

    /// `timestamp` is the sample's capture time in milliseconds.
    pub fn log(&self, kind: StreamKind, timestamp: f64, normalized: &Normalized) -> Result<()> {
        self.rec.set_timestamp_secs_since_epoch(TIMELINE, timestamp / 1000.0);
        let path = entity_path(kind);

        match normalized {
            Normalized::Image(img) => {
                let rgb = codec::to_rgb24(img);
                let image = rerun::archetypes::Image::from_rgb24(rgb, [img.width, img.height]);
                self.rec.log(path, &image)?;
            }
            Normalized::Motion(motion) => {
                let v = motion.vector;
                let color = match kind {
                    StreamKind::Gyro => rerun::Color::from_rgb(255, 165, 0),
                    _ => rerun::Color::from_rgb(255, 0, 0),
                };
                self.rec.log(
                    format!("{}/vector", path),
                    &rerun::archetypes::Arrows3D::from_vectors([[v.x as f32, v.y as f32, v.z as f32]])
                        .with_colors([color]),
                )?;
                self.rec.log(
                    format!("{}/magnitude", path),
                    &rerun::archetypes::Scalars::new(vec![v.norm()]),
                )?;
            }
        }
        Ok(())
    }
}
