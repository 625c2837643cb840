use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use rs_bag2image::export::Exporter;
use rs_bag2image::quit::QuitSignal;
use rs_bag2image::sample::{Modality, PixelFormat, SamplePayload};
use rs_bag2image::{
    Bag2ImageError, Extractor, Playback, PlaybackSource, RawSample, SampleBundle, StopReason, StreamKind,
    TimedSample, VecFeed,
};

/// Replays fixed bundles with fixed positions.
struct ScriptedSource {
    steps: VecDeque<(Vec<RawSample>, u64)>,
    position: u64,
    duration: u64,
}

impl ScriptedSource {
    fn new(steps: Vec<(Vec<RawSample>, u64)>, duration: u64) -> Self {
        Self { steps: steps.into(), position: 0, duration }
    }
}

impl PlaybackSource for ScriptedSource {
    fn next_bundle(&mut self) -> anyhow::Result<SampleBundle> {
        let (samples, position) = self.steps.pop_front().ok_or(Bag2ImageError::PlaybackExhausted)?;
        self.position = position;
        Ok(samples.into_iter().collect())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn duration(&self) -> u64 {
        self.duration
    }
}

fn pixels(modality: Modality, stream_index: u32, format: PixelFormat, frame_number: u64, data: Vec<u8>) -> RawSample {
    RawSample {
        modality,
        stream_index,
        format,
        frame_number,
        timestamp: frame_number as f64 * 33.3,
        payload: SamplePayload::Pixels { width: 2, height: 2, data },
    }
}

fn motion(modality: Modality, frame_number: u64, v: [f64; 3]) -> RawSample {
    RawSample {
        modality,
        stream_index: 0,
        format: PixelFormat::MotionXyz32f,
        frame_number,
        timestamp: frame_number as f64 * 5.0,
        payload: SamplePayload::Motion(Vector3::new(v[0], v[1], v[2])),
    }
}

fn color(frame_number: u64) -> RawSample {
    pixels(Modality::Color, 0, PixelFormat::Rgb8, frame_number, vec![200; 12])
}

fn depth(frame_number: u64) -> RawSample {
    let data = [0u16, 1000, 5000, 20000].iter().flat_map(|v| v.to_le_bytes()).collect();
    pixels(Modality::Depth, 0, PixelFormat::Z16, frame_number, data)
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

fn two_iteration_script() -> Vec<(Vec<RawSample>, u64)> {
    vec![
        (vec![color(1), depth(1), motion(Modality::Gyro, 1, [0.1, 0.2, 0.3])], 10),
        (
            vec![
                color(2),
                pixels(Modality::Infrared, 2, PixelFormat::Y8, 1, vec![7; 4]),
                motion(Modality::Accel, 1, [0.0, -9.8, 0.0]),
            ],
            20,
        ),
        // loop boundary
        (vec![], 0),
    ]
}

#[test]
fn two_iteration_recording_exports_every_stream() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("capture");
    let exporter = Exporter::new(&root, 95, false);
    exporter.prepare().unwrap();

    let source = ScriptedSource::new(two_iteration_script(), 20);
    let summary = Extractor::new(source, exporter).run().unwrap();

    assert_eq!(summary.stop, StopReason::EndOfRecording);
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.total(), 6);
    assert_eq!(summary.count(StreamKind::Color), 2);
    assert_eq!(summary.count(StreamKind::InfraredLeft), 0);

    assert!(root.join("Color/000001.jpg").is_file());
    assert!(root.join("Color/000002.jpg").is_file());
    assert!(root.join("Depth/000001.png").is_file());
    assert!(root.join("IR_Right/000001.jpg").is_file());
    assert!(fs::read_dir(root.join("IR")).unwrap().next().is_none());

    let color_csv = lines(&root.join("Color/metadata.csv"));
    assert_eq!(color_csv.len(), 3);
    assert_eq!(color_csv[0], "frame_number,timestamp,width,height,format");
    assert_eq!(color_csv[2], "2,66.600000,2,2,RGB8");

    for csv in ["Depth/metadata.csv", "IR_Right/metadata.csv", "IMU/gyro_data.csv", "IMU/accel_data.csv"] {
        assert_eq!(lines(&root.join(csv)).len(), 2, "{csv}");
    }
    assert_eq!(lines(&root.join("IMU/accel_data.csv"))[1], "1,5.000000,0.000000,-9.800000,0.000000");
    assert_eq!(lines(&root.join("IR_Right/metadata.csv"))[1], "1,33.300000,2,2,Y8");
}

#[test]
fn depth_is_raw_unless_scaling() {
    let dir = tempfile::tempdir().unwrap();
    for (name, scaling) in [("raw", false), ("scaled", true)] {
        let exporter = Exporter::new(dir.path().join(name), 95, scaling);
        exporter.prepare().unwrap();
        let source = ScriptedSource::new(vec![(vec![depth(3)], 1), (vec![], 0)], 1);
        Extractor::new(source, exporter).run().unwrap();
    }

    let raw = image::open(dir.path().join("raw/Depth/000003.png")).unwrap().into_luma16();
    assert_eq!(raw.into_raw(), vec![0, 1000, 5000, 20000]);
    let scaled = image::open(dir.path().join("scaled/Depth/000003.png")).unwrap().into_luma8();
    assert_eq!(scaled.into_raw(), vec![255, 230, 128, 0]);
}

#[test]
fn stalled_position_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 95, false);
    exporter.prepare().unwrap();

    let script = vec![(vec![color(1)], 5), (vec![], 5), (vec![color(2)], 9), (vec![], 0)];
    let summary = Extractor::new(ScriptedSource::new(script, 9), exporter).run().unwrap();
    assert_eq!(summary.iterations, 4);
    assert_eq!(summary.count(StreamKind::Color), 2);
}

#[test]
fn header_written_once_across_rerun_appends() {
    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let exporter = Exporter::new(dir.path(), 95, false);
        exporter.prepare().unwrap();
        let script = vec![(vec![motion(Modality::Gyro, 1, [1.0, 0.0, 0.0])], 1), (vec![], 0)];
        Extractor::new(ScriptedSource::new(script, 1), exporter).run().unwrap();
    }
    let gyro = lines(&dir.path().join("IMU/gyro_data.csv"));
    assert_eq!(gyro.len(), 3);
    assert_eq!(gyro.iter().filter(|l| l.starts_with("frame_number")).count(), 1);
}

#[test]
fn unsupported_color_format_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 95, false);
    exporter.prepare().unwrap();

    let mjpeg = pixels(Modality::Color, 0, PixelFormat::Unknown("MJPEG".to_string()), 1, vec![0; 12]);
    let source = ScriptedSource::new(vec![(vec![mjpeg], 1), (vec![], 0)], 1);
    let err = Extractor::new(source, exporter).run().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Bag2ImageError>(),
        Some(Bag2ImageError::UnsupportedFormat { stream: StreamKind::Color, .. })
    ));
    assert_eq!(err.to_string(), "unknown Color format: MJPEG");
    assert!(!dir.path().join("Color/metadata.csv").exists());
}

#[test]
fn quit_stops_after_the_current_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 95, false);
    exporter.prepare().unwrap();

    let (tx, rx) = flume::bounded(1);
    tx.send(()).unwrap();
    let summary = Extractor::new(ScriptedSource::new(two_iteration_script(), 20), exporter)
        .with_quit(QuitSignal::from_channel(rx))
        .run()
        .unwrap();

    assert_eq!(summary.stop, StopReason::Quit);
    assert_eq!(summary.iterations, 1);
    assert!(dir.path().join("IMU/gyro_data.csv").is_file());
    assert!(!dir.path().join("Color/000002.jpg").exists());
}

#[test]
fn bundled_playback_runs_until_wrap() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 80, false);
    exporter.prepare().unwrap();

    let at = |ms: u64, sample: RawSample| TimedSample { time_ns: ms * 1_000_000, sample };
    let feed = VecFeed::new(vec![
        at(0, color(1)),
        at(2, depth(1)),
        at(3, motion(Modality::Gyro, 1, [0.0, 0.0, 1.0])),
        at(5, motion(Modality::Gyro, 2, [0.0, 0.0, 1.0])),
        at(33, color(2)),
        at(34, pixels(Modality::Infrared, 1, PixelFormat::Y8, 1, vec![1; 4])),
        at(35, pixels(Modality::Infrared, 2, PixelFormat::Y8, 1, vec![2; 4])),
    ]);
    let (start, end) = feed.bounds().unwrap();
    let summary = Extractor::new(Playback::new(feed, start, end), exporter).run().unwrap();

    assert_eq!(summary.stop, StopReason::EndOfRecording);
    assert_eq!(summary.count(StreamKind::Gyro), 2);
    assert_eq!(summary.count(StreamKind::InfraredLeft), 1);
    assert_eq!(summary.count(StreamKind::InfraredRight), 1);
    assert_eq!(summary.total(), 7);
    assert!(dir.path().join("IR/000001.jpg").is_file());
    assert!(dir.path().join("IR_Right/000001.jpg").is_file());
}

#[test]
fn zero_length_recording_is_exported_once() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 95, false);
    exporter.prepare().unwrap();

    let feed = VecFeed::new(vec![TimedSample { time_ns: 42, sample: color(1) }]);
    let summary = Extractor::new(Playback::new(feed, 42, 42), exporter).run().unwrap();
    assert_eq!(summary.stop, StopReason::EndOfRecording);
    assert_eq!(summary.count(StreamKind::Color), 1);
    assert_eq!(lines(&dir.path().join("Color/metadata.csv")).len(), 2);
}

#[test]
fn exhaustion_with_duration_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(dir.path(), 95, false);
    exporter.prepare().unwrap();

    // never wraps: positions keep growing until the script runs dry
    let source = ScriptedSource::new(vec![(vec![color(1)], 1), (vec![color(2)], 2)], 2);
    let err = Extractor::new(source, exporter).run().unwrap_err();
    assert!(matches!(err.downcast_ref::<Bag2ImageError>(), Some(Bag2ImageError::PlaybackExhausted)));
}
