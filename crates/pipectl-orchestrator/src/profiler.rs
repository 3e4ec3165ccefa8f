//! Phase timing and resource accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

/// Wall time spent in one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub elapsed: Duration,
}

/// Snapshot of everything the profiler recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    /// Name of the profiled root.
    pub root: String,

    /// Time from start to stop (or to now, if still running).
    pub total: Duration,

    /// Completed phases, in order.
    pub phases: Vec<PhaseTiming>,

    /// Engine objects handed out.
    pub resources_created: u64,

    /// Engine objects released.
    pub resources_released: u64,

    /// Release calls the engine refused.
    pub release_failures: u64,
}

/// Records how long each build and shutdown phase takes and how many
/// engine objects were created and released.
pub struct Profiler {
    root: String,
    start_time: RwLock<Option<Instant>>,
    stop_time: RwLock<Option<Instant>>,
    current: RwLock<Option<(&'static str, Instant)>>,
    phases: RwLock<Vec<PhaseTiming>>,
    resources_created: AtomicU64,
    resources_released: AtomicU64,
    release_failures: AtomicU64,
}

impl Profiler {
    /// Create a profiler for the named root.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            start_time: RwLock::new(None),
            stop_time: RwLock::new(None),
            current: RwLock::new(None),
            phases: RwLock::new(Vec::new()),
            resources_created: AtomicU64::new(0),
            resources_released: AtomicU64::new(0),
            release_failures: AtomicU64::new(0),
        }
    }

    /// Start profiling.
    pub fn start(&self) {
        *self.start_time.write() = Some(Instant::now());
        *self.stop_time.write() = None;
        debug!(root = %self.root, "Profiler started");
    }

    /// Returns true between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.start_time.read().is_some() && self.stop_time.read().is_none()
    }

    /// Close the current phase, if any, and open a new one.
    pub fn enter(&self, phase: &'static str) {
        let now = Instant::now();
        self.close_current(now);
        *self.current.write() = Some((phase, now));
    }

    fn close_current(&self, now: Instant) {
        if let Some((name, started)) = self.current.write().take() {
            self.phases.write().push(PhaseTiming {
                name,
                elapsed: now.duration_since(started),
            });
        }
    }

    /// Stop profiling. The open phase, if any, is closed.
    pub fn stop(&self) {
        let now = Instant::now();
        self.close_current(now);
        *self.stop_time.write() = Some(now);
    }

    /// Record an engine object being handed out.
    pub fn record_created(&self) {
        self.resources_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an engine object being released.
    pub fn record_released(&self) {
        self.resources_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a release the engine refused.
    pub fn record_release_failure(&self) {
        self.release_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current report.
    pub fn report(&self) -> ProfileReport {
        let total = match (*self.start_time.read(), *self.stop_time.read()) {
            (Some(start), Some(stop)) => stop.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };

        ProfileReport {
            root: self.root.clone(),
            total,
            phases: self.phases.read().clone(),
            resources_created: self.resources_created.load(Ordering::Relaxed),
            resources_released: self.resources_released.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
        }
    }

    /// Write the report to the log.
    pub fn print(&self) {
        let report = self.report();

        info!(
            root = %report.root,
            total_ms = report.total.as_millis() as u64,
            created = report.resources_created,
            released = report.resources_released,
            release_failures = report.release_failures,
            "Profiler report"
        );
        for phase in &report.phases {
            info!(
                "  {}: {:.3} ms",
                phase.name,
                phase.elapsed.as_secs_f64() * 1000.0
            );
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(crate::PROFILER_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_recorded_in_order() {
        let profiler = Profiler::new("test");
        profiler.start();
        profiler.enter("one");
        profiler.enter("two");
        profiler.stop();

        let report = profiler.report();
        let names: Vec<_> = report.phases.iter().map(|p| p.name).collect();
        assert_eq!(names, ["one", "two"]);
        assert!(!profiler.is_running());
    }

    #[test]
    fn test_resource_counters() {
        let profiler = Profiler::default();
        profiler.record_created();
        profiler.record_created();
        profiler.record_released();
        profiler.record_release_failure();

        let report = profiler.report();
        assert_eq!(report.resources_created, 2);
        assert_eq!(report.resources_released, 1);
        assert_eq!(report.release_failures, 1);
    }

    #[test]
    fn test_report_before_start() {
        let profiler = Profiler::new("idle");
        assert_eq!(profiler.report().total, Duration::ZERO);
        assert!(!profiler.is_running());
    }
}
