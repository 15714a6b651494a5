//! Wall-clock budget shared by every solve of one run.

use std::time::{Duration, Instant};

/// A start instant plus an optional limit.
///
/// `Copy`, so it can be handed to parallel station solves without sharing.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Deadline expiring `limit` after now.
    pub fn new(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit: Some(limit),
        }
    }

    /// Deadline that never expires.
    pub fn unlimited() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    /// Time since the deadline was created.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Remaining budget, `None` when unlimited.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|l| l.saturating_sub(self.elapsed()))
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.elapsed() >= limit,
            None => false,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unlimited()
    }
}
