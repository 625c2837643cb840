//! Playback provider: replays recorded samples as synchronized bundles.
//!
//! [`Playback`] groups time-ordered samples from a [`SampleFeed`] into
//! [`SampleBundle`]s and tracks a playback position in nanoseconds since the
//! first sample. When the feed runs dry the playback rewinds, resets the
//! position to zero and hands out one empty bundle, so consumers watching the
//! position see it wrap.

use anyhow::Result;

use crate::error::Bag2ImageError;
use crate::sample::{RawSample, SampleBundle};

/// What the extraction pipeline consumes from a recording.
pub trait PlaybackSource {
    /// Next synchronized bundle. Blocks until one is ready.
    fn next_bundle(&mut self) -> Result<SampleBundle>;
    /// Current playback position in nanoseconds.
    fn position(&self) -> u64;
    /// Total recording duration in nanoseconds.
    fn duration(&self) -> u64;
}

/// A decoded sample with its record time in nanoseconds.
#[derive(Debug, Clone)]
pub struct TimedSample {
    pub time_ns: u64,
    pub sample: RawSample,
}

/// Ordered source of decoded samples that can restart from the beginning.
pub trait SampleFeed {
    fn next_sample(&mut self) -> Result<Option<TimedSample>>;
    fn rewind(&mut self);
}

/// Default window in which samples are grouped into one bundle.
pub const DEFAULT_SYNC_WINDOW_NS: u64 = 20_000_000;

pub struct Playback<F: SampleFeed> {
    feed: F,
    start_ns: u64,
    duration_ns: u64,
    sync_window_ns: u64,
    position: u64,
    peeked: Option<TimedSample>,
    wraps: u32,
}

impl<F: SampleFeed> Playback<F> {
    /// `start_ns`/`end_ns` are the record times of the first and last sample.
    pub fn new(feed: F, start_ns: u64, end_ns: u64) -> Self {
        Self {
            feed,
            start_ns,
            duration_ns: end_ns.saturating_sub(start_ns),
            sync_window_ns: DEFAULT_SYNC_WINDOW_NS,
            position: 0,
            peeked: None,
            wraps: 0,
        }
    }

    pub fn with_sync_window(mut self, sync_window_ns: u64) -> Self {
        self.sync_window_ns = sync_window_ns;
        self
    }

    fn pull(&mut self) -> Result<Option<TimedSample>> {
        match self.peeked.take() {
            Some(sample) => Ok(Some(sample)),
            None => self.feed.next_sample(),
        }
    }
}

impl<F: SampleFeed> PlaybackSource for Playback<F> {
    fn next_bundle(&mut self) -> Result<SampleBundle> {
        let mut bundle = SampleBundle::new();
        let mut bundle_start: Option<u64> = None;

        loop {
            let Some(next) = self.pull()? else {
                if !bundle.is_empty() {
                    return Ok(bundle);
                }
                self.wraps += 1;
                // a zero-length recording has no position to wrap from
                if self.wraps > 1 || self.duration_ns == 0 {
                    return Err(Bag2ImageError::PlaybackExhausted.into());
                }
                tracing::debug!("end of recording reached; rewinding");
                self.feed.rewind();
                self.position = 0;
                return Ok(bundle);
            };

            let outside_window = bundle_start
                .is_some_and(|start| next.time_ns.saturating_sub(start) > self.sync_window_ns);
            let repeated = bundle.contains_stream(next.sample.modality, next.sample.stream_index);
            if outside_window || repeated {
                self.peeked = Some(next);
                return Ok(bundle);
            }

            bundle_start.get_or_insert(next.time_ns);
            // chunks may overlap in time; never report a backward step mid-pass
            self.position = self.position.max(next.time_ns.saturating_sub(self.start_ns));
            bundle.push(next.sample);
        }
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn duration(&self) -> u64 {
        self.duration_ns
    }
}

/// In-memory feed, used to replay already decoded samples.
#[derive(Debug, Clone, Default)]
pub struct VecFeed {
    samples: Vec<TimedSample>,
    cursor: usize,
}

impl VecFeed {
    pub fn new(mut samples: Vec<TimedSample>) -> Self {
        samples.sort_by_key(|s| s.time_ns);
        Self { samples, cursor: 0 }
    }

    /// Record time bounds of the feed, `None` when empty.
    pub fn bounds(&self) -> Option<(u64, u64)> {
        Some((self.samples.first()?.time_ns, self.samples.last()?.time_ns))
    }
}

impl SampleFeed for VecFeed {
    fn next_sample(&mut self) -> Result<Option<TimedSample>> {
        let sample = self.samples.get(self.cursor).cloned();
        if sample.is_some() {
            self.cursor += 1;
        }
        Ok(sample)
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Modality, PixelFormat, SamplePayload};

    fn timed(time_ms: u64, modality: Modality, stream_index: u32, frame_number: u64) -> TimedSample {
        TimedSample {
            time_ns: time_ms * 1_000_000,
            sample: RawSample {
                modality,
                stream_index,
                format: PixelFormat::Y8,
                frame_number,
                timestamp: time_ms as f64,
                payload: SamplePayload::Pixels { width: 1, height: 1, data: vec![0] },
            },
        }
    }

    fn playback(samples: Vec<TimedSample>) -> Playback<VecFeed> {
        let feed = VecFeed::new(samples);
        let (start, end) = feed.bounds().unwrap();
        Playback::new(feed, start, end)
    }

    fn frames(bundle: &SampleBundle) -> Vec<(Modality, u64)> {
        bundle.iter().map(|s| (s.modality, s.frame_number)).collect()
    }

    #[test]
    fn test_groups_within_sync_window() {
        let mut pb = playback(vec![
            timed(1000, Modality::Color, 0, 1),
            timed(1005, Modality::Depth, 0, 1),
            timed(1033, Modality::Color, 0, 2),
            timed(1034, Modality::Depth, 0, 2),
        ]);
        assert_eq!(pb.duration(), 34_000_000);
        assert_eq!(pb.position(), 0);

        let first = pb.next_bundle().unwrap();
        assert_eq!(frames(&first), vec![(Modality::Color, 1), (Modality::Depth, 1)]);
        assert_eq!(pb.position(), 5_000_000);

        let second = pb.next_bundle().unwrap();
        assert_eq!(frames(&second), vec![(Modality::Color, 2), (Modality::Depth, 2)]);
        assert_eq!(pb.position(), 34_000_000);
    }

    #[test]
    fn test_repeated_stream_closes_bundle() {
        let mut pb = playback(vec![
            timed(0, Modality::Gyro, 0, 1),
            timed(1, Modality::Gyro, 0, 2),
            timed(2, Modality::Infrared, 1, 1),
            timed(3, Modality::Infrared, 2, 1),
        ]);
        assert_eq!(frames(&pb.next_bundle().unwrap()), vec![(Modality::Gyro, 1)]);
        let second = pb.next_bundle().unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.contains_stream(Modality::Infrared, 1));
        assert!(second.contains_stream(Modality::Infrared, 2));
    }

    #[test]
    fn test_wrap_yields_empty_bundle_and_resets_position() {
        let mut pb = playback(vec![timed(0, Modality::Color, 0, 1), timed(100, Modality::Color, 0, 2)]);
        pb.next_bundle().unwrap();
        pb.next_bundle().unwrap();
        assert_eq!(pb.position(), 100_000_000);

        let boundary = pb.next_bundle().unwrap();
        assert!(boundary.is_empty());
        assert_eq!(pb.position(), 0);

        // Replays from the start after the boundary.
        let replay = pb.next_bundle().unwrap();
        assert_eq!(frames(&replay), vec![(Modality::Color, 1)]);
    }

    #[test]
    fn test_second_wrap_is_exhaustion() {
        let mut pb = playback(vec![timed(0, Modality::Color, 0, 1), timed(100, Modality::Color, 0, 2)]);
        for _ in 0..2 {
            assert_eq!(pb.next_bundle().unwrap().len(), 1);
            assert_eq!(pb.next_bundle().unwrap().len(), 1);
            assert!(pb.next_bundle().unwrap().is_empty());
        }
        let err = pb.next_bundle().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Bag2ImageError>(),
            Some(Bag2ImageError::PlaybackExhausted)
        ));
    }

    #[test]
    fn test_zero_length_recording_is_exhausted_without_wrap() {
        let mut pb = playback(vec![timed(7, Modality::Color, 0, 1), timed(7, Modality::Depth, 0, 1)]);
        assert_eq!(pb.duration(), 0);
        assert_eq!(pb.next_bundle().unwrap().len(), 2);
        assert!(pb.next_bundle().is_err());
    }

    struct UnsortedFeed(Vec<TimedSample>, usize);

    impl SampleFeed for UnsortedFeed {
        fn next_sample(&mut self) -> Result<Option<TimedSample>> {
            self.1 += 1;
            Ok(self.0.get(self.1 - 1).cloned())
        }

        fn rewind(&mut self) {
            self.1 = 0;
        }
    }

    #[test]
    fn test_position_never_steps_back_mid_pass() {
        let feed = UnsortedFeed(
            vec![
                timed(0, Modality::Color, 0, 1),
                timed(100, Modality::Depth, 0, 1),
                timed(60, Modality::Color, 0, 2),
            ],
            0,
        );
        let mut pb = Playback::new(feed, 0, 100_000_000);
        pb.next_bundle().unwrap();
        assert_eq!(pb.position(), 0);
        assert_eq!(pb.next_bundle().unwrap().len(), 2);
        assert_eq!(pb.position(), 100_000_000);
    }

    #[test]
    fn test_custom_sync_window() {
        let feed = VecFeed::new(vec![timed(0, Modality::Color, 0, 1), timed(10, Modality::Depth, 0, 1)]);
        let mut pb = Playback::new(feed, 0, 10_000_000).with_sync_window(5_000_000);
        assert_eq!(pb.next_bundle().unwrap().len(), 1);
        assert_eq!(pb.next_bundle().unwrap().len(), 1);
    }
}
