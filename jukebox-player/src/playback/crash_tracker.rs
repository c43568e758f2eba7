//! Crash-loop detection
//!
//! Counts consecutive unexpected child exits. A song that ends any other way
//! resets the count; reaching `threshold` crashes inside `window` is fatal.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct CrashTracker {
    threshold: usize,
    window: Duration,
    crashes: VecDeque<Instant>,
}

impl CrashTracker {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            crashes: VecDeque::new(),
        }
    }

    /// Record a crash at `now`.
    ///
    /// Returns `CrashLoop` once `threshold` consecutive crashes fall within
    /// the window.
    pub fn record_crash(&mut self, now: Instant) -> Result<()> {
        while let Some(&oldest) = self.crashes.front() {
            if now.duration_since(oldest) > self.window {
                self.crashes.pop_front();
            } else {
                break;
            }
        }
        self.crashes.push_back(now);

        if self.crashes.len() >= self.threshold {
            return Err(Error::CrashLoop {
                crashes: self.crashes.len(),
                window_secs: self.window.as_secs(),
            });
        }
        Ok(())
    }

    /// A song ended without crashing
    pub fn record_success(&mut self) {
        self.crashes.clear();
    }

    pub fn consecutive_crashes(&self) -> usize {
        self.crashes.len()
    }
}
