//! Textual progress indicator. Purely presentational.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_WIDTH: usize = 50;

/// `min(100, 100 * position / duration)`, or `None` for an empty recording.
pub fn percentage(position: u64, duration: u64) -> Option<f64> {
    if duration == 0 {
        return None;
    }
    Some((100.0 * position as f64 / duration as f64).min(100.0))
}

/// Fixed-width indicator, e.g. `Progress: [=====>    ] 42.0% (17 frames)`.
pub fn render(percent: f64, frames: u64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64) as usize;
    let filled = filled.min(BAR_WIDTH);
    let mut bar = String::with_capacity(BAR_WIDTH);
    for i in 0..BAR_WIDTH {
        bar.push(match i.cmp(&filled) {
            std::cmp::Ordering::Less => '=',
            std::cmp::Ordering::Equal => '>',
            std::cmp::Ordering::Greater => ' ',
        });
    }
    format!("Progress: [{}] {:.1}% ({} frames)", bar, percent, frames)
}

pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Result<Self> {
        let bar = if enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{msg}")?);
            Some(pb)
        } else {
            None
        };
        Ok(Self { bar })
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn report(&self, position: u64, duration: u64, frames: u64) {
        let Some(bar) = &self.bar else {
            return;
        };
        if let Some(pct) = percentage(position, duration) {
            bar.set_message(render(pct, frames));
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
