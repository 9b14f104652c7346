//! Poll pacing
//!
//! Keeps fetches near one per `target_interval` while guaranteeing at least
//! `min_delay` between consecutive fetches, even when rendering is slow.

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

/// Floor for the gap between two fetches
pub const MIN_POLL_DELAY: Duration = Duration::from_millis(100);
/// Desired spacing between two fetches
pub const TARGET_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Poll timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollTiming {
    #[serde(rename = "target_interval_ms", deserialize_with = "millis")]
    pub target_interval: Duration,
    #[serde(rename = "min_delay_ms", deserialize_with = "millis")]
    pub min_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            target_interval: TARGET_POLL_INTERVAL,
            min_delay: MIN_POLL_DELAY,
        }
    }
}

impl PollTiming {
    /// Raise `min_delay` to the global floor
    pub fn normalized(self) -> Self {
        Self {
            target_interval: self.target_interval,
            min_delay: self.min_delay.max(MIN_POLL_DELAY),
        }
    }
}

fn millis<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

/// Tracks the last fetch and computes the next delay
#[derive(Debug)]
pub struct PollPacer {
    timing: PollTiming,
    last_fetch: Option<Instant>,
}

impl PollPacer {
    pub fn new(timing: PollTiming) -> Self {
        Self {
            timing: timing.normalized(),
            last_fetch: None,
        }
    }

    /// Record that a fetch is starting now
    pub fn mark_fetch(&mut self) {
        self.last_fetch = Some(Instant::now());
    }

    /// `max(min_delay, target_interval - elapsed_since_last_fetch)`
    pub fn next_delay(&self) -> Duration {
        let elapsed = self
            .last_fetch
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO);
        self.timing
            .target_interval
            .saturating_sub(elapsed)
            .max(self.timing.min_delay)
    }
}
