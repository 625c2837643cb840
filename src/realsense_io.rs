//! RealSense recordings on top of ROS1 bags: topic layout, sample feed, inspect.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rosbag::{ChunkRecord, MessageRecord, RosBag};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::Path;

use crate::error::Bag2ImageError;
use crate::mappings::{images, imu, stream_info};
use crate::playback::{Playback, SampleFeed, TimedSample};
use crate::sample::{Modality, RawSample};

static STREAM_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/device_(\d+)/sensor_(\d+)/([A-Za-z]+)_(\d+)/(image/data|imu/data|info)$")
        .expect("stream topic pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TopicKind {
    ImageData,
    ImuData,
    Info,
}

/// A per-stream topic such as `/device_0/sensor_0/Infrared_2/image/data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTopic {
    pub device: u32,
    pub sensor: u32,
    pub stream_name: String,
    pub stream_index: u32,
    pub kind: TopicKind,
}

impl StreamTopic {
    pub fn modality(&self) -> Option<Modality> {
        Modality::from_stream_name(&self.stream_name)
    }

    /// Topic prefix shared by a stream's data and info topics.
    pub fn stream_path(&self) -> String {
        format!(
            "/device_{}/sensor_{}/{}_{}",
            self.device, self.sensor, self.stream_name, self.stream_index
        )
    }

    /// True when this topic carries samples the pipeline can export.
    pub fn is_supported_sample(&self) -> bool {
        match (self.kind, self.modality()) {
            (TopicKind::ImageData, Some(m)) => !m.is_motion(),
            (TopicKind::ImuData, Some(m)) => m.is_motion(),
            _ => false,
        }
    }
}

impl fmt::Display for StreamTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.stream_name, self.stream_index)
    }
}

pub fn parse_stream_topic(topic: &str) -> Option<StreamTopic> {
    let caps = STREAM_TOPIC.captures(topic)?;
    let kind = match &caps[5] {
        "image/data" => TopicKind::ImageData,
        "imu/data" => TopicKind::ImuData,
        _ => TopicKind::Info,
    };
    Some(StreamTopic {
        device: caps[1].parse().ok()?,
        sensor: caps[2].parse().ok()?,
        stream_name: caps[3].to_string(),
        stream_index: caps[4].parse().ok()?,
        kind,
    })
}

/// Decode one message of a supported sample topic.
pub fn decode_sample(topic: &StreamTopic, payload: &[u8]) -> Result<Option<RawSample>> {
    let Some(modality) = topic.modality() else {
        return Ok(None);
    };
    match topic.kind {
        TopicKind::ImageData if !modality.is_motion() => {
            images::image_to_sample(modality, topic.stream_index, payload).map(Some)
        }
        TopicKind::ImuData if modality.is_motion() => {
            imu::imu_to_sample(modality, topic.stream_index, payload).map(Some)
        }
        _ => Ok(None),
    }
}

/// Sample feed over the chunks of a bag, one decoded chunk at a time.
pub struct BagFeed<'a> {
    chunks: Vec<ChunkRecord<'a>>,
    sample_topics: BTreeMap<u32, StreamTopic>,
    next_chunk: usize,
    pending: VecDeque<TimedSample>,
}

/// Streams and time span found while opening a recording.
#[derive(Debug, Clone)]
pub struct RecordingInfo {
    pub streams: Vec<StreamTopic>,
    pub first_ns: u64,
    pub last_ns: u64,
}

impl<'a> BagFeed<'a> {
    pub fn open(bag: &'a RosBag, path: &Path) -> Result<(Self, RecordingInfo)> {
        // collect all chunks first since the iterator may not be restartable
        let chunks: Vec<_> = bag.chunk_records().collect::<Result<Vec<_>, _>>()?;

        let mut sample_topics = BTreeMap::new();
        for record in &chunks {
            if let ChunkRecord::Chunk(chunk) = record {
                for msg in chunk.messages() {
                    if let MessageRecord::Connection(conn) = msg? {
                        match parse_stream_topic(conn.topic) {
                            Some(topic) if topic.is_supported_sample() => {
                                sample_topics.insert(conn.id, topic);
                            }
                            Some(topic) if topic.kind != TopicKind::Info => {
                                tracing::debug!("skipping unsupported stream {} on {}", topic, conn.topic);
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        let mut first_ns = u64::MAX;
        let mut last_ns = 0u64;
        for record in &chunks {
            if let ChunkRecord::Chunk(chunk) = record {
                for msg in chunk.messages() {
                    if let MessageRecord::MessageData(msg_data) = msg?
                        && sample_topics.contains_key(&msg_data.conn_id)
                    {
                        first_ns = first_ns.min(msg_data.time);
                        last_ns = last_ns.max(msg_data.time);
                    }
                }
            }
        }
        if first_ns == u64::MAX {
            return Err(Bag2ImageError::NoSupportedStreams(path.to_path_buf()).into());
        }

        let mut streams: Vec<StreamTopic> = sample_topics.values().cloned().collect();
        streams.sort_by_key(|t| (t.sensor, t.stream_name.clone(), t.stream_index));
        streams.dedup();

        let info = RecordingInfo { streams, first_ns, last_ns };
        let feed = Self {
            chunks,
            sample_topics,
            next_chunk: 0,
            pending: VecDeque::new(),
        };
        Ok((feed, info))
    }

    fn load_chunk(&mut self, index: usize) -> Result<()> {
        let ChunkRecord::Chunk(chunk) = &self.chunks[index] else {
            return Ok(());
        };
        let mut batch = Vec::new();
        for msg in chunk.messages() {
            if let MessageRecord::MessageData(msg_data) = msg?
                && let Some(topic) = self.sample_topics.get(&msg_data.conn_id)
                && let Some(sample) = decode_sample(topic, msg_data.data)
                    .with_context(|| format!("failed to decode {} message", topic))?
            {
                batch.push(TimedSample { time_ns: msg_data.time, sample });
            }
        }
        batch.sort_by_key(|s| s.time_ns);
        self.pending.extend(batch);
        Ok(())
    }
}

impl SampleFeed for BagFeed<'_> {
    fn next_sample(&mut self) -> Result<Option<TimedSample>> {
        loop {
            if let Some(sample) = self.pending.pop_front() {
                return Ok(Some(sample));
            }
            if self.next_chunk >= self.chunks.len() {
                return Ok(None);
            }
            let index = self.next_chunk;
            self.next_chunk += 1;
            self.load_chunk(index)?;
        }
    }

    fn rewind(&mut self) {
        self.next_chunk = 0;
        self.pending.clear();
    }
}

pub type BagPlayback<'a> = Playback<BagFeed<'a>>;

/// Open a recording for bundled playback.
pub fn open_playback<'a>(bag: &'a RosBag, path: &Path, sync_window_ns: u64) -> Result<(BagPlayback<'a>, RecordingInfo)> {
    let (feed, info) = BagFeed::open(bag, path)?;
    let playback = Playback::new(feed, info.first_ns, info.last_ns).with_sync_window(sync_window_ns);
    Ok((playback, info))
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub topic: String,
    pub message_type: String,
    pub stream: String,
    pub supported: bool,
    pub count: u64,
    pub first_s: f64,
    pub last_s: f64,
    pub fps: Option<u32>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BagSummary {
    pub path: String,
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub total_messages: u64,
    pub other_topics: usize,
    pub streams: Vec<TopicSummary>,
}

/// Gather per-stream statistics of a recording.
pub fn summarize_bag(path: &Path) -> Result<BagSummary> {
    let bag = RosBag::new(path).with_context(|| format!("failed to open bag: {}", path.display()))?;

    let mut connections = BTreeMap::new();
    for record in bag.chunk_records() {
        if let ChunkRecord::Chunk(chunk) = record? {
            for msg in chunk.messages() {
                if let MessageRecord::Connection(conn) = msg? {
                    connections.insert(conn.id, (conn.topic.to_string(), conn.tp.to_string()));
                }
            }
        }
    }

    struct Stat { count: u64, first: u64, last: u64 }
    let mut stats: BTreeMap<u32, Stat> = BTreeMap::new();
    let mut infos: BTreeMap<String, stream_info::StreamInfo> = BTreeMap::new();
    let mut bag_start = u64::MAX;
    let mut bag_end = 0u64;
    let mut total: u64 = 0;

    for record in bag.chunk_records() {
        if let ChunkRecord::Chunk(chunk) = record? {
            for msg in chunk.messages() {
                if let MessageRecord::MessageData(msg_data) = msg? {
                    bag_start = bag_start.min(msg_data.time);
                    bag_end = bag_end.max(msg_data.time);
                    total += 1;
                    let entry = stats.entry(msg_data.conn_id).or_insert(Stat {
                        count: 0,
                        first: msg_data.time,
                        last: msg_data.time,
                    });
                    entry.count += 1;
                    entry.first = entry.first.min(msg_data.time);
                    entry.last = entry.last.max(msg_data.time);

                    if let Some((topic, _)) = connections.get(&msg_data.conn_id)
                        && let Some(st) = parse_stream_topic(topic)
                        && st.kind == TopicKind::Info
                    {
                        match stream_info::parse_stream_info(msg_data.data) {
                            Ok(info) => {
                                infos.insert(st.stream_path(), info);
                            }
                            Err(e) => tracing::warn!("failed to parse stream info on {}: {}", topic, e),
                        }
                    }
                }
            }
        }
    }
    if bag_start == u64::MAX {
        bag_start = 0;
    }
    let rel = |t: u64| t.saturating_sub(bag_start) as f64 / 1_000_000_000.0;

    let mut streams = Vec::new();
    let mut other_topics = 0;
    for (id, (topic, tp)) in &connections {
        let Some(st) = parse_stream_topic(topic).filter(|t| t.kind != TopicKind::Info) else {
            other_topics += 1;
            continue;
        };
        let (count, first_s, last_s) = match stats.get(id) {
            Some(s) => (s.count, rel(s.first), rel(s.last)),
            None => (0, 0.0, 0.0),
        };
        let info = infos.get(&st.stream_path());
        streams.push(TopicSummary {
            topic: topic.clone(),
            message_type: tp.clone(),
            stream: st.to_string(),
            supported: st.is_supported_sample(),
            count,
            first_s,
            last_s,
            fps: info.map(|i| i.fps),
            encoding: info.map(|i| i.encoding.clone()),
        });
    }
    streams.sort_by(|a, b| a.topic.cmp(&b.topic));

    Ok(BagSummary {
        path: path.display().to_string(),
        start_s: 0.0,
        end_s: rel(bag_end),
        duration_s: rel(bag_end),
        total_messages: total,
        other_topics,
        streams,
    })
}

pub fn inspect_bag(path: &Path, json: bool) -> Result<()> {
    let summary = summarize_bag(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Bag: {}", summary.path);
    println!(
        "Duration (s): {:.6}, Total messages: {}, Non-stream topics: {}\n",
        summary.duration_s, summary.total_messages, summary.other_topics
    );

    let mut table = prettytable::Table::new();
    table.set_titles(prettytable::row![
        "Stream", "Topic", "Type", "Count", "FPS", "Encoding", "Start(s)", "End(s)", "Exported"
    ]);
    for s in &summary.streams {
        table.add_row(prettytable::row![
            s.stream,
            s.topic,
            s.message_type,
            r->s.count,
            r->s.fps.map(|f| f.to_string()).unwrap_or_else(|| "-".to_string()),
            s.encoding.as_deref().unwrap_or("-"),
            r->format!("{:.6}", s.first_s),
            r->format!("{:.6}", s.last_s),
            if s.supported { "yes" } else { "no" }
        ]);
    }
    table.printstd();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::{images::encode_ros_image, imu::encode_ros_imu};
    use crate::sample::{PixelFormat, SamplePayload};

    #[test]
    fn test_parse_image_topic() {
        let topic = parse_stream_topic("/device_0/sensor_0/Infrared_2/image/data").unwrap();
        assert_eq!(topic.device, 0);
        assert_eq!(topic.sensor, 0);
        assert_eq!(topic.stream_name, "Infrared");
        assert_eq!(topic.stream_index, 2);
        assert_eq!(topic.kind, TopicKind::ImageData);
        assert_eq!(topic.modality(), Some(Modality::Infrared));
        assert!(topic.is_supported_sample());
        assert_eq!(topic.stream_path(), "/device_0/sensor_0/Infrared_2");
        assert_eq!(topic.to_string(), "Infrared_2");
    }

    #[test]
    fn test_parse_imu_and_info_topics() {
        let gyro = parse_stream_topic("/device_0/sensor_2/Gyro_0/imu/data").unwrap();
        assert_eq!(gyro.kind, TopicKind::ImuData);
        assert!(gyro.is_supported_sample());

        let info = parse_stream_topic("/device_0/sensor_1/Color_0/info").unwrap();
        assert_eq!(info.kind, TopicKind::Info);
        assert!(!info.is_supported_sample());
    }

    #[test]
    fn test_non_stream_topics_rejected() {
        assert!(parse_stream_topic("/file_version").is_none());
        assert!(parse_stream_topic("/device_0/sensor_1/Color_0/image/metadata").is_none());
        assert!(parse_stream_topic("/device_0/sensor_1/Color_0/info/camera_info").is_none());
    }

    #[test]
    fn test_unsupported_stream_is_skipped() {
        let fisheye = parse_stream_topic("/device_0/sensor_0/Fisheye_1/image/data").unwrap();
        assert!(!fisheye.is_supported_sample());
        let payload = encode_ros_image(1, 0, 1, 1, "mono8", 1, false, &[0]);
        assert!(decode_sample(&fisheye, &payload).unwrap().is_none());
    }

    #[test]
    fn test_decode_samples() {
        let color = parse_stream_topic("/device_0/sensor_1/Color_0/image/data").unwrap();
        let payload = encode_ros_image(9, 250, 1, 1, "rgb8", 3, false, &[1, 2, 3]);
        let sample = decode_sample(&color, &payload).unwrap().unwrap();
        assert_eq!(sample.modality, Modality::Color);
        assert_eq!(sample.format, PixelFormat::Rgb8);
        assert_eq!(sample.frame_number, 9);

        let accel = parse_stream_topic("/device_0/sensor_2/Accel_0/imu/data").unwrap();
        let payload = encode_ros_imu(4, 250, [0.0; 3], [1.0, 2.0, 3.0]);
        let sample = decode_sample(&accel, &payload).unwrap().unwrap();
        assert_eq!(sample.modality, Modality::Accel);
        assert!(matches!(sample.payload, SamplePayload::Motion(v) if v.z == 3.0));
    }
}
