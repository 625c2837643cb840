//! Validate command - Check an export directory for consistency

use anyhow::{Context, Result};
use std::path::Path;

use crate::sample::{IMAGE_CSV_HEADER, MOTION_CSV_HEADER, StreamKind};

/// Findings for one export directory.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub rows: usize,
    pub files_checked: usize,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every metadata file under `dir`:
/// - the header is the first line and appears exactly once
/// - each row has the expected column count
/// - frame numbers never decrease within a file
/// - every image row has its image file
pub fn check_export_dir(dir: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    if !dir.is_dir() {
        report.errors.push(format!("[ERROR] {} is not a directory", dir.display()));
        return Ok(report);
    }

    for kind in StreamKind::ALL {
        let subdir = dir.join(kind.subdir());
        if !subdir.is_dir() {
            report.errors.push(format!("[ERROR] missing directory {}", kind.subdir()));
            continue;
        }
        let csv_path = subdir.join(kind.metadata_file());
        if !csv_path.exists() {
            continue;
        }
        report.files_checked += 1;
        let name = format!("{}/{}", kind.subdir(), kind.metadata_file());
        let header = if kind.is_motion() { MOTION_CSV_HEADER } else { IMAGE_CSV_HEADER };
        let columns = header.split(',').count();
        let is_header = |record: &csv::StringRecord| record.iter().eq(header.split(','));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&csv_path)
            .with_context(|| format!("failed to open {}", csv_path.display()))?;
        let mut records = reader.records();
        match records.next().transpose()? {
            Some(first) if is_header(&first) => {}
            Some(first) => report.errors.push(format!(
                "[ERROR] {}: unexpected header \"{}\"",
                name,
                first.iter().collect::<Vec<_>>().join(",")
            )),
            None => {
                report.errors.push(format!("[ERROR] {}: empty file", name));
                continue;
            }
        }

        let mut last_frame: Option<u64> = None;
        for record in records {
            let record = record.with_context(|| format!("failed to read {}", csv_path.display()))?;
            let line_no = record.position().map_or(0, |pos| pos.line());
            if is_header(&record) {
                report.errors.push(format!("[ERROR] {}:{}: duplicate header", name, line_no));
                continue;
            }
            if record.len() != columns {
                report.errors.push(format!(
                    "[ERROR] {}:{}: expected {} columns, found {}",
                    name,
                    line_no,
                    columns,
                    record.len()
                ));
                continue;
            }
            let Ok(frame) = record[0].parse::<u64>() else {
                report.errors.push(format!("[ERROR] {}:{}: bad frame number \"{}\"", name, line_no, &record[0]));
                continue;
            };
            if let Some(prev) = last_frame
                && frame < prev
            {
                report.errors.push(format!(
                    "[ERROR] {}:{}: frame numbers not monotonic: {} < {}",
                    name, line_no, frame, prev
                ));
            }
            last_frame = Some(frame);
            report.rows += 1;

            if let Some(ext) = kind.image_extension() {
                let image = subdir.join(format!("{:06}.{}", frame, ext));
                if !image.is_file() {
                    report.errors.push(format!("[ERROR] {}:{}: missing {}", name, line_no, image.display()));
                }
            }
        }
    }
    Ok(report)
}

pub fn validate_export_dir(dir: &Path) -> Result<()> {
    let report = check_export_dir(dir)?;
    if report.passed() {
        println!("Validation of {}: PASSED", dir.display());
        println!("Metadata files: {}, Rows: {}", report.files_checked, report.rows);
        Ok(())
    } else {
        println!("Validation of {}: FAILED", dir.display());
        for error in &report.errors {
            println!("{}", error);
        }
        Err(anyhow::anyhow!("Validation failed with {} error(s)", report.errors.len()))
    }
}
