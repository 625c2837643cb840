use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::extract::{DEFAULT_QUALITY, DEFAULT_SYNC_WINDOW_MS};

#[derive(Parser, Debug)]
#[command(
    name = "rs-bag2image",
    about = "Export RealSense .bag recordings into per-stream images and metadata",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every Color, Depth, IR, IR_Right and IMU sample of a recording
    Extract {
        /// Path to the .bag file
        #[arg(short = 'b', long = "bag")]
        bag: PathBuf,
        /// Write depth PNGs rescaled for display instead of raw 16-bit values
        #[arg(short = 's', long = "scaling")]
        scaling: bool,
        /// JPEG quality for Color/IR images, clamped to 0..=100
        #[arg(short = 'q', long = "quality", default_value_t = DEFAULT_QUALITY, allow_negative_numbers = true)]
        quality: i64,
        /// Show a live preview in the Rerun viewer
        #[arg(short = 'd', long = "display")]
        display: bool,
        /// Save the preview stream to this .rrd file instead of spawning a viewer
        #[arg(long = "rrd")]
        rrd: Option<PathBuf>,
        /// Output root (default: <bag dir>/<bag stem>)
        #[arg(short = 'o', long = "out-dir")]
        out_dir: Option<PathBuf>,
        /// Hide the progress indicator
        #[arg(long = "no-progress")]
        no_progress: bool,
        /// Window in which samples are grouped into one bundle
        #[arg(long = "sync-window-ms", default_value_t = DEFAULT_SYNC_WINDOW_MS)]
        sync_window_ms: u64,
    },

    /// List the RealSense streams of a recording
    Inspect {
        /// Path to the .bag file
        bag: PathBuf,
        /// Print JSON instead of a table
        #[arg(long = "json")]
        json: bool,
    },

    /// Show supported stream formats and their canonical outputs
    Formats {},

    /// Check an export directory for header, ordering and file consistency
    Validate { dir: PathBuf },
}
