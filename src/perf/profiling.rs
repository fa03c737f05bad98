/// Instrumentation for the rendering pipeline
/// Call counting is compiled in only with the `profiling` feature
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for the pipeline stages
pub struct PipelineCounters {
    // Geometry counters
    pub triangles_processed: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub lines_drawn: AtomicU64,

    // Fragment counters
    pub fragments_tested: AtomicU64,
    pub depth_passed: AtomicU64,
    pub depth_failed: AtomicU64,
    pub fragments_discarded: AtomicU64,

    // Framebuffer counters
    pub framebuffer_clears: AtomicU64,
}

impl PipelineCounters {
    pub const fn new() -> Self {
        Self {
            triangles_processed: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            lines_drawn: AtomicU64::new(0),
            fragments_tested: AtomicU64::new(0),
            depth_passed: AtomicU64::new(0),
            depth_failed: AtomicU64::new(0),
            fragments_discarded: AtomicU64::new(0),
            framebuffer_clears: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.triangles_processed.store(0, Ordering::Relaxed);
        self.triangles_clipped.store(0, Ordering::Relaxed);
        self.triangles_culled.store(0, Ordering::Relaxed);
        self.lines_drawn.store(0, Ordering::Relaxed);
        self.fragments_tested.store(0, Ordering::Relaxed);
        self.depth_passed.store(0, Ordering::Relaxed);
        self.depth_failed.store(0, Ordering::Relaxed);
        self.fragments_discarded.store(0, Ordering::Relaxed);
        self.framebuffer_clears.store(0, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            triangles_processed: self.triangles_processed.load(Ordering::Relaxed),
            triangles_clipped: self.triangles_clipped.load(Ordering::Relaxed),
            triangles_culled: self.triangles_culled.load(Ordering::Relaxed),
            lines_drawn: self.lines_drawn.load(Ordering::Relaxed),
            fragments_tested: self.fragments_tested.load(Ordering::Relaxed),
            depth_passed: self.depth_passed.load(Ordering::Relaxed),
            depth_failed: self.depth_failed.load(Ordering::Relaxed),
            fragments_discarded: self.fragments_discarded.load(Ordering::Relaxed),
            framebuffer_clears: self.framebuffer_clears.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub triangles_processed: u64,
    pub triangles_clipped: u64,
    pub triangles_culled: u64,
    pub lines_drawn: u64,
    pub fragments_tested: u64,
    pub depth_passed: u64,
    pub depth_failed: u64,
    pub fragments_discarded: u64,
    pub framebuffer_clears: u64,
}

impl CounterSnapshot {
    /// Share of depth-tested fragments that passed, in percent.
    pub fn depth_pass_rate(&self) -> Option<f64> {
        let tested = self.depth_passed + self.depth_failed;
        (tested > 0).then(|| self.depth_passed as f64 / tested as f64 * 100.0)
    }

    /// Emit the counters as a single `info` event
    pub fn log_report(&self) {
        tracing::info!(
            triangles_processed = self.triangles_processed,
            triangles_clipped = self.triangles_clipped,
            triangles_culled = self.triangles_culled,
            lines_drawn = self.lines_drawn,
            fragments_tested = self.fragments_tested,
            depth_passed = self.depth_passed,
            depth_failed = self.depth_failed,
            depth_pass_rate = self.depth_pass_rate().unwrap_or(0.0),
            fragments_discarded = self.fragments_discarded,
            framebuffer_clears = self.framebuffer_clears,
            "pipeline counters"
        );
    }
}

/// Global pipeline counters instance
pub static PIPELINE_COUNTERS: PipelineCounters = PipelineCounters::new();

/// Increment a field of [`PIPELINE_COUNTERS`] (only when the profiling
/// feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:ident) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::PIPELINE_COUNTERS
                .$counter
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
