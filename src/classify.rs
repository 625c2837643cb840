//! Partition a sample bundle by stream kind.

use crate::sample::{Modality, RawSample, SampleBundle, StreamKind};

/// At most one sample per stream kind for a single iteration.
#[derive(Debug, Default)]
pub struct ClassifiedFrames {
    pub color: Option<RawSample>,
    pub depth: Option<RawSample>,
    /// Slot 0 is the left imager, slot 1 the right one.
    pub infrared: [Option<RawSample>; 2],
    pub gyro: Option<RawSample>,
    pub accel: Option<RawSample>,
}

impl ClassifiedFrames {
    pub fn get(&self, kind: StreamKind) -> Option<&RawSample> {
        match kind {
            StreamKind::Color => self.color.as_ref(),
            StreamKind::Depth => self.depth.as_ref(),
            StreamKind::InfraredLeft => self.infrared[0].as_ref(),
            StreamKind::InfraredRight => self.infrared[1].as_ref(),
            StreamKind::Gyro => self.gyro.as_ref(),
            StreamKind::Accel => self.accel.as_ref(),
        }
    }

    pub fn len(&self) -> usize {
        StreamKind::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present samples in export order: Color, Depth, IR, IR_Right, Gyro, Accel.
    pub fn into_streams(self) -> impl Iterator<Item = (StreamKind, RawSample)> {
        let [ir_left, ir_right] = self.infrared;
        [
            (StreamKind::Color, self.color),
            (StreamKind::Depth, self.depth),
            (StreamKind::InfraredLeft, ir_left),
            (StreamKind::InfraredRight, ir_right),
            (StreamKind::Gyro, self.gyro),
            (StreamKind::Accel, self.accel),
        ]
        .into_iter()
        .filter_map(|(kind, sample)| sample.map(|s| (kind, s)))
    }
}

/// Instance slot for an infrared stream index: `0` stays `0`, otherwise `index - 1`.
pub fn infrared_slot(stream_index: u32) -> usize {
    if stream_index == 0 { 0 } else { stream_index as usize - 1 }
}

/// Index 2 is the right imager; everything else is written as left (`IR`).
pub fn infrared_kind(stream_index: u32) -> StreamKind {
    match infrared_slot(stream_index) {
        1 => StreamKind::InfraredRight,
        _ => StreamKind::InfraredLeft,
    }
}

pub fn classify(bundle: SampleBundle) -> ClassifiedFrames {
    let mut frames = ClassifiedFrames::default();
    for sample in bundle {
        match sample.modality {
            Modality::Color => {
                if frames.color.is_none() {
                    frames.color = Some(sample);
                }
            }
            Modality::Depth => {
                if frames.depth.is_none() {
                    frames.depth = Some(sample);
                }
            }
            Modality::Infrared => {
                if sample.stream_index > 2 {
                    tracing::warn!(
                        stream_index = sample.stream_index,
                        "unexpected infrared stream index; writing as left"
                    );
                }
                let slot = match infrared_kind(sample.stream_index) {
                    StreamKind::InfraredRight => 1,
                    _ => 0,
                };
                frames.infrared[slot] = Some(sample);
            }
            Modality::Gyro => frames.gyro = Some(sample),
            Modality::Accel => frames.accel = Some(sample),
        }
    }
    frames
}
