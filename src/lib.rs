//! rs_bag2image - Export RealSense .bag recordings into per-stream image files
//!
//! A RealSense recording is a ROS1 bag holding synchronized Color, Depth,
//! Infrared (left/right) and IMU streams. This library replays it as
//! synchronized sample bundles and writes every sample out under one root:
//!
//! - **Color**: `Color/<frame>.jpg` + `Color/metadata.csv`
//! - **Depth**: `Depth/<frame>.png` (raw 16-bit, or display-scaled) + `metadata.csv`
//! - **Infrared**: `IR/` for the left imager, `IR_Right/` for the right one
//! - **IMU**: `IMU/gyro_data.csv`, `IMU/accel_data.csv`
//!
//! Each iteration pulls one bundle from a [`PlaybackSource`], classifies it by
//! stream, normalizes pixel encodings to BGR/BGRA/gray or 16-bit depth, and
//! exports. The run stops once the playback position wraps.
//!
//! # Example
//!
//! ```rust,no_run
//! use rs_bag2image::{extract_bag, ExtractOptions};
//!
//! let options = ExtractOptions::new("capture.bag");
//! let summary = extract_bag(&options)?;
//! summary.print();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod classify;
pub mod cli;
pub mod codec;
pub mod error;
pub mod export;
pub mod extract;
pub mod formats;
pub mod mappings;
pub mod normalize;
pub mod playback;
pub mod position;
pub mod preview;
pub mod progress;
pub mod quit;
pub mod realsense_io;
pub mod sample;
pub mod validate;

// Re-export main types for convenience
pub use error::Bag2ImageError;
pub use extract::{ExtractOptions, ExtractSummary, Extractor, StopReason, extract_bag};
pub use playback::{Playback, PlaybackSource, SampleFeed, TimedSample, VecFeed};
pub use sample::{RawSample, SampleBundle, StreamKind};
