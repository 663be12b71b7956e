use crate::midi_file::Microseconds;
use log::debug;

/// Bar checkpointing for practice retries.
///
/// The checkpoint follows the most recently crossed bar line. A miss arms
/// a retry; crossing the next bar line then reports the checkpoint as the
/// place to rewind to, and the checkpoint stays put.
#[derive(Debug, Clone, Default)]
pub struct RetryTracker {
    retry_start: Microseconds,
    /// Number of bar lines crossed so far.
    crossed: usize,
    armed: bool,
}

impl RetryTracker {
    pub fn new(bar_lines: &[Microseconds], position: Microseconds) -> Self {
        let mut tracker = Self::default();
        tracker.reset(bar_lines, position);
        tracker
    }

    pub fn reset(&mut self, bar_lines: &[Microseconds], position: Microseconds) {
        self.crossed = bar_lines.partition_point(|&b| b <= position);
        self.retry_start = match self.crossed {
            0 => position,
            n => bar_lines[n - 1],
        };
        self.armed = false;
    }

    pub fn arm(&mut self) {
        if !self.armed {
            debug!("Retry armed for bar at {}us", self.retry_start);
        }
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn retry_start(&self) -> Microseconds {
        self.retry_start
    }

    /// Returns the rewind target when a bar line was crossed with a retry
    /// armed.
    pub fn check(&mut self, bar_lines: &[Microseconds], now: Microseconds) -> Option<Microseconds> {
        let crossed = bar_lines.partition_point(|&b| b <= now);
        if crossed <= self.crossed {
            return None;
        }
        self.crossed = crossed;

        if self.armed {
            self.armed = false;
            debug!("Retrying from {}us", self.retry_start);
            return Some(self.retry_start);
        }

        self.retry_start = bar_lines[crossed - 1];
        None
    }
}
