/// Performance measurement utilities
/// Pipeline stages are timed and counted for optimization analysis
pub mod profiling;

pub use profiling::{CounterSnapshot, PipelineCounters, PIPELINE_COUNTERS};

use std::time::{Duration, Instant};

/// Scope timer that reports its lifetime through `tracing` when dropped.
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        tracing::debug!(
            scope = self.name,
            elapsed_us = self.elapsed().as_micros() as u64,
            "perf"
        );
    }
}
