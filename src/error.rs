//! Domain errors. Pipeline code wraps these in `anyhow` with path context.

use std::path::PathBuf;

use thiserror::Error;

use crate::sample::{PixelFormat, StreamKind};

#[derive(Debug, Error)]
pub enum Bag2ImageError {
    /// Input is missing, not a regular file, or lacks the `.bag` extension.
    #[error("can't find input bag file: {0}")]
    InvalidBagPath(PathBuf),

    #[error("invalid option {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// No safe interpretation exists for this pixel encoding.
    #[error("unknown {stream} format: {format}")]
    UnsupportedFormat { stream: StreamKind, format: PixelFormat },

    #[error("{stream} frame {frame_number} is malformed: {reason}")]
    MalformedSample {
        stream: StreamKind,
        frame_number: u64,
        reason: String,
    },

    #[error("recording contains no supported streams: {0}")]
    NoSupportedStreams(PathBuf),

    /// The provider looped twice without the consumer stopping.
    #[error("playback exhausted without a position wrap")]
    PlaybackExhausted,
}
