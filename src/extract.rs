//! The extraction driver: acquire, classify, normalize, export, report, stop.

use anyhow::{Context, Result};
use rosbag::RosBag;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::classify::classify;
use crate::error::Bag2ImageError;
use crate::export::Exporter;
use crate::normalize::normalize;
use crate::playback::PlaybackSource;
use crate::position::{PositionSignal, PositionTracker};
use crate::preview::Preview;
use crate::progress::ProgressReporter;
use crate::quit::QuitSignal;
use crate::realsense_io;
use crate::sample::{ExportRecord, StreamKind};

pub const DEFAULT_QUALITY: i64 = 95;
pub const DEFAULT_SYNC_WINDOW_MS: u64 = 20;

/// Options for an extraction run.
///
/// # Example
///
/// ```rust,no_run
/// use rs_bag2image::{extract_bag, ExtractOptions};
///
/// let mut options = ExtractOptions::new("recording.bag");
/// options.quality = 90;
/// options.scaling = true;
///
/// let summary = extract_bag(&options)?;
/// println!("{} samples exported", summary.total());
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub bag_path: PathBuf,
    /// Rescale depth PNGs for display instead of writing raw 16-bit values.
    pub scaling: bool,
    /// JPEG quality, clamped to `0..=100`.
    pub quality: i64,
    pub display: bool,
    /// Save the preview stream here instead of spawning a viewer.
    pub rrd_path: Option<PathBuf>,
    /// Output root; defaults to `<bag parent>/<bag stem>`.
    pub out_dir: Option<PathBuf>,
    pub show_progress: bool,
    pub sync_window_ms: u64,
}

impl ExtractOptions {
    pub fn new(bag_path: impl Into<PathBuf>) -> Self {
        Self {
            bag_path: bag_path.into(),
            scaling: false,
            quality: DEFAULT_QUALITY,
            display: false,
            rrd_path: None,
            out_dir: None,
            show_progress: true,
            sync_window_ms: DEFAULT_SYNC_WINDOW_MS,
        }
    }

    /// Reject bad inputs before anything touches the disk.
    pub fn validate(&self) -> Result<(), Bag2ImageError> {
        let has_bag_ext = self
            .bag_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bag"));
        if !self.bag_path.is_file() || !has_bag_ext {
            return Err(Bag2ImageError::InvalidBagPath(self.bag_path.clone()));
        }
        self.sync_window_ns()?;
        if let Some(rrd) = &self.rrd_path
            && rrd.extension().is_none_or(|ext| ext != "rrd")
        {
            return Err(Bag2ImageError::InvalidOption {
                name: "rrd",
                reason: format!("{} must end in .rrd", rrd.display()),
            });
        }
        Ok(())
    }

    /// The sync window in nanoseconds; rejects zero and values that overflow.
    pub fn sync_window_ns(&self) -> Result<u64, Bag2ImageError> {
        if self.sync_window_ms == 0 {
            return Err(Bag2ImageError::InvalidOption {
                name: "sync-window-ms",
                reason: "must be > 0".to_string(),
            });
        }
        self.sync_window_ms
            .checked_mul(1_000_000)
            .ok_or_else(|| Bag2ImageError::InvalidOption {
                name: "sync-window-ms",
                reason: format!("{} ms is too large", self.sync_window_ms),
            })
    }

    pub fn output_root(&self) -> PathBuf {
        if let Some(dir) = &self.out_dir {
            return dir.clone();
        }
        let stem = self.bag_path.file_stem().unwrap_or_default();
        self.bag_path.parent().unwrap_or(Path::new("")).join(stem)
    }

    pub fn jpeg_quality(&self) -> u8 {
        clamp_quality(self.quality)
    }
}

pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(0, 100) as u8
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The playback position wrapped.
    EndOfRecording,
    Quit,
}

#[derive(Debug, Clone)]
pub struct ExtractSummary {
    pub output_root: PathBuf,
    pub iterations: u64,
    pub per_stream: BTreeMap<StreamKind, u64>,
    pub stop: StopReason,
}

impl ExtractSummary {
    pub fn total(&self) -> u64 {
        self.per_stream.values().sum()
    }

    pub fn count(&self, kind: StreamKind) -> u64 {
        self.per_stream.get(&kind).copied().unwrap_or(0)
    }

    pub fn print(&self) {
        let mut table = prettytable::Table::new();
        table.set_titles(prettytable::row!["Stream", "Output", "Samples"]);
        for kind in StreamKind::ALL {
            let output = self.output_root.join(kind.subdir()).join(match kind.image_extension() {
                Some(ext) => format!("*.{}", ext),
                None => kind.metadata_file().to_string(),
            });
            table.add_row(prettytable::row![kind, output.display(), r->self.count(kind)]);
        }
        table.printstd();
        println!(
            "{} samples in {} iterations ({})",
            self.total(),
            self.iterations,
            match self.stop {
                StopReason::EndOfRecording => "end of recording",
                StopReason::Quit => "stopped by user",
            }
        );
    }
}

/// Owns all state that survives across iterations.
pub struct Extractor<P: PlaybackSource> {
    source: P,
    exporter: Exporter,
    tracker: PositionTracker,
    preview: Option<Preview>,
    progress: ProgressReporter,
    quit: QuitSignal,
    log_every: Option<u64>,
    iterations: u64,
    per_stream: BTreeMap<StreamKind, u64>,
}

impl<P: PlaybackSource> Extractor<P> {
    /// The position tracker starts from the source's position before the first acquisition.
    pub fn new(source: P, exporter: Exporter) -> Self {
        let tracker = PositionTracker::new(source.position());
        Self {
            source,
            exporter,
            tracker,
            preview: None,
            progress: ProgressReporter::hidden(),
            quit: QuitSignal::never(),
            log_every: None,
            iterations: 0,
            per_stream: BTreeMap::new(),
        }
    }

    pub fn with_preview(mut self, preview: Option<Preview>) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_quit(mut self, quit: QuitSignal) -> Self {
        self.quit = quit;
        self
    }

    pub fn with_log_every(mut self, log_every: Option<u64>) -> Self {
        self.log_every = log_every.filter(|n| *n > 0);
        self
    }

    fn processed(&self) -> u64 {
        self.per_stream.values().sum()
    }

    /// Run one iteration. Returns the stop reason once the loop should end.
    pub fn step(&mut self) -> Result<Option<StopReason>> {
        let bundle = match self.source.next_bundle() {
            Ok(bundle) => bundle,
            Err(e)
                if self.source.duration() == 0
                    && matches!(e.downcast_ref::<Bag2ImageError>(), Some(Bag2ImageError::PlaybackExhausted)) =>
            {
                tracing::info!("zero-length recording exported once");
                return Ok(Some(StopReason::EndOfRecording));
            }
            Err(e) => return Err(e),
        };
        let frames = classify(bundle);

        for (kind, sample) in frames.into_streams() {
            let normalized = normalize(kind, &sample)?;
            let record = ExportRecord::from_sample(&sample);
            self.exporter
                .export(kind, &normalized, &record)
                .with_context(|| format!("failed to export {} frame {}", kind, sample.frame_number))?;
            if let Some(preview) = &self.preview
                && let Err(e) = preview.log(kind, sample.timestamp, &normalized)
            {
                tracing::warn!("preview logging failed for {}: {}", kind, e);
            }
            *self.per_stream.entry(kind).or_insert(0) += 1;
        }
        self.iterations += 1;

        let processed = self.processed();
        self.progress
            .report(self.source.position(), self.source.duration(), processed);
        if let Some(n) = self.log_every
            && self.iterations % n == 0
        {
            tracing::info!(
                "[progress] iterations={} samples={} per_stream={:?}",
                self.iterations,
                processed,
                self.per_stream
            );
        }

        if self.quit.requested() {
            return Ok(Some(StopReason::Quit));
        }
        match self.tracker.observe(self.source.position()) {
            PositionSignal::Terminate => Ok(Some(StopReason::EndOfRecording)),
            PositionSignal::Continue => Ok(None),
        }
    }

    pub fn run(mut self) -> Result<ExtractSummary> {
        let stop = loop {
            if let Some(reason) = self.step()? {
                break reason;
            }
        };
        self.progress.finish();
        Ok(ExtractSummary {
            output_root: self.exporter.root().to_path_buf(),
            iterations: self.iterations,
            per_stream: self.per_stream,
            stop,
        })
    }
}

fn log_every_from_env() -> Option<u64> {
    parse_log_every(std::env::var("RS_BAG2IMAGE_LOG_EVERY").ok().as_deref())
}

fn parse_log_every(value: Option<&str>) -> Option<u64> {
    value.and_then(|s| s.trim().parse::<u64>().ok()).filter(|v| *v > 0)
}

/// Preview is optional; a viewer that cannot start only costs the preview.
fn preview_or_warn(preview: Result<Preview>) -> Option<Preview> {
    match preview {
        Ok(preview) => Some(preview),
        Err(e) => {
            tracing::warn!("preview disabled: {:#}", e);
            None
        }
    }
}

/// Export every supported stream of a RealSense bag.
pub fn extract_bag(options: &ExtractOptions) -> Result<ExtractSummary> {
    options.validate()?;
    let started = Instant::now();

    let bag = RosBag::new(&options.bag_path)
        .with_context(|| format!("failed to open bag: {}", options.bag_path.display()))?;
    let (playback, info) =
        realsense_io::open_playback(&bag, &options.bag_path, options.sync_window_ns()?)?;

    let root = options.output_root();
    tracing::info!("rs-bag2image v{}", env!("CARGO_PKG_VERSION"));
    for stream in &info.streams {
        tracing::info!("enabled stream {} ({})", stream, stream.stream_path());
    }
    tracing::info!(
        "recording spans {:.3}s, writing to {}",
        (info.last_ns - info.first_ns) as f64 / 1_000_000_000.0,
        root.display()
    );

    let exporter = Exporter::new(&root, options.jpeg_quality(), options.scaling);
    exporter.prepare()?;

    let recording_id = format!("rs-bag2image:{}", options.bag_path.display());
    let preview = match (&options.rrd_path, options.display) {
        (Some(path), _) => preview_or_warn(Preview::save(&recording_id, path)),
        (None, true) => preview_or_warn(Preview::spawn(&recording_id)),
        (None, false) => None,
    };

    let summary = Extractor::new(playback, exporter)
        .with_preview(preview)
        .with_progress(ProgressReporter::new(options.show_progress)?)
        .with_quit(QuitSignal::from_stdin())
        .with_log_every(log_every_from_env())
        .run()?;

    tracing::info!("extraction finished in {:?}", started.elapsed());
    Ok(summary)
}
