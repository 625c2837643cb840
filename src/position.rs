//! End-of-recording detection from the provider's playback position.
//!
//! The provider loops when it reaches the end of a recording, so its position
//! jumps back toward zero. A strictly negative signed delta between two
//! observations is treated as that wrap. Equal positions are stalls, not wraps.
//!
//! Known fragility: a provider whose position moves backward transiently (for
//! example while refilling an internal buffer) would trigger a false stop.

/// Outcome of one position observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSignal {
    Continue,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    last_position: u64,
}

impl PositionTracker {
    /// `initial` is the provider position just before the first acquisition.
    pub fn new(initial: u64) -> Self {
        Self { last_position: initial }
    }

    pub fn last_position(&self) -> u64 {
        self.last_position
    }

    pub fn observe(&mut self, current_position: u64) -> PositionSignal {
        let delta = current_position.wrapping_sub(self.last_position) as i64;
        if delta < 0 {
            tracing::debug!(
                last = self.last_position,
                current = current_position,
                "playback position wrapped"
            );
            return PositionSignal::Terminate;
        }
        self.last_position = current_position;
        PositionSignal::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increasing_then_wrap() {
        let mut tracker = PositionTracker::new(0);
        let positions = [10u64, 20, 35, 1_000, 5];
        let signals: Vec<_> = positions.iter().map(|&p| tracker.observe(p)).collect();
        assert_eq!(
            signals,
            vec![
                PositionSignal::Continue,
                PositionSignal::Continue,
                PositionSignal::Continue,
                PositionSignal::Continue,
                PositionSignal::Terminate,
            ]
        );
        // A terminating observation does not move the last position.
        assert_eq!(tracker.last_position(), 1_000);
    }

    #[test]
    fn test_stall_is_not_a_wrap() {
        let mut tracker = PositionTracker::new(500);
        assert_eq!(tracker.observe(500), PositionSignal::Continue);
        assert_eq!(tracker.observe(500), PositionSignal::Continue);
        assert_eq!(tracker.observe(499), PositionSignal::Terminate);
    }

    #[test]
    fn test_wrap_to_zero() {
        let mut tracker = PositionTracker::new(0);
        assert_eq!(tracker.observe(9_000_000_000), PositionSignal::Continue);
        assert_eq!(tracker.observe(0), PositionSignal::Terminate);
    }

    #[test]
    fn test_delta_is_signed() {
        // An unsigned subtraction would see a huge forward jump here.
        let mut tracker = PositionTracker::new(u64::MAX - 10);
        assert_eq!(tracker.observe(u64::MAX - 20), PositionSignal::Terminate);
    }
}
