//! `formats` command - print the per-stream normalization table

use anyhow::Result;

use crate::normalize::CONVERSIONS;
use crate::sample::{Modality, StreamKind};

/// One line per stream: accepted native formats, canonical outputs and file type.
pub fn format_rows() -> Vec<(String, String, String, String)> {
    let streams = [
        (Modality::Color, "Color", StreamKind::Color),
        (Modality::Depth, "Depth", StreamKind::Depth),
        (Modality::Infrared, "IR, IR_Right", StreamKind::InfraredLeft),
        (Modality::Gyro, "IMU", StreamKind::Gyro),
        (Modality::Accel, "IMU", StreamKind::Accel),
    ];

    streams
        .into_iter()
        .map(|(modality, dirs, kind)| {
            let entries: Vec<_> = CONVERSIONS.iter().filter(|e| e.modality == modality).collect();
            let (natives, outputs) = if modality.is_motion() {
                ("MOTION_XYZ32F".to_string(), "x,y,z".to_string())
            } else {
                let natives = entries
                    .iter()
                    .map(|e| e.format.as_ref().map_or("any".to_string(), |f| f.to_string()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut outputs: Vec<&str> = Vec::new();
                for e in &entries {
                    if !outputs.contains(&e.output) {
                        outputs.push(e.output);
                    }
                }
                (natives, outputs.join("/"))
            };
            let file = match kind.image_extension() {
                Some(ext) => format!("{}/<frame>.{} + {}", dirs, ext, kind.metadata_file()),
                None => format!("{}/{}", dirs, kind.metadata_file()),
            };
            (modality.to_string(), natives, outputs, file)
        })
        .collect()
}

pub fn print_formats() -> Result<()> {
    println!("Supported stream formats:");
    let mut table = prettytable::Table::new();
    table.set_titles(prettytable::row!["Stream", "Native formats", "Canonical", "Output"]);
    for (stream, natives, outputs, file) in format_rows() {
        table.add_row(prettytable::row![stream, natives, outputs, file]);
    }
    table.printstd();
    println!("Unlisted Color/Infrared formats abort the run.");
    Ok(())
}
