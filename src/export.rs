//! Writes normalized samples and their metadata rows under the output root.
//!
//! Layout: `<root>/{Color,Depth,IR,IR_Right}/<frame:06>.<ext>` plus a
//! `metadata.csv` per image stream, and `<root>/IMU/{gyro,accel}_data.csv` for
//! motion. Metadata files are opened, appended and closed on every call.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::sample::{ExportRecord, Normalized, StreamKind};

#[derive(Debug, Clone)]
pub struct Exporter {
    root: PathBuf,
    quality: u8,
    scaling: bool,
}

impl Exporter {
    pub fn new(root: impl Into<PathBuf>, quality: u8, scaling: bool) -> Self {
        Self {
            root: root.into(),
            quality: quality.min(100),
            scaling,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create every stream subdirectory. Existing directories are kept.
    pub fn prepare(&self) -> Result<()> {
        for kind in StreamKind::ALL {
            let dir = self.root.join(kind.subdir());
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn image_path(&self, kind: StreamKind, frame_number: u64) -> Option<PathBuf> {
        let ext = kind.image_extension()?;
        Some(self.root.join(kind.subdir()).join(format!("{:06}.{}", frame_number, ext)))
    }

    pub fn metadata_path(&self, kind: StreamKind) -> PathBuf {
        self.root.join(kind.subdir()).join(kind.metadata_file())
    }

    /// Write the image (if any) and append its metadata row.
    pub fn export(&self, kind: StreamKind, normalized: &Normalized, record: &ExportRecord) -> Result<()> {
        match normalized {
            Normalized::Image(img) => {
                let path = self
                    .image_path(kind, record.frame_number())
                    .with_context(|| format!("{} stream has no image output", kind))?;
                match kind {
                    StreamKind::Depth => codec::encode_depth_png(img, &path, self.scaling)?,
                    _ => codec::encode_jpeg(img, &path, self.quality)?,
                }
                tracing::debug!("wrote {}", path.display());
            }
            Normalized::Motion(_) if !kind.is_motion() => {
                anyhow::bail!("motion sample routed to {} stream", kind);
            }
            Normalized::Motion(_) => {}
        }
        append_row(&self.metadata_path(kind), record.header(), &record.csv_record())
    }
}

/// Append one row, emitting `header` first when the file does not exist yet.
fn append_row(path: &Path, header: &str, row: &[String]) -> Result<()> {
    let fresh = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if fresh {
        writer
            .write_record(header.split(','))
            .with_context(|| format!("failed to write header to {}", path.display()))?;
    }
    writer
        .write_record(row)
        .with_context(|| format!("failed to append to {}", path.display()))?;
    writer.flush().with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
