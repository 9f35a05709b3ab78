//! Step metrics and structured logging setup.
//!
//! The simulation itself never reads a clock; timings are measured by the
//! caller and handed to [`Metrics`] for reporting only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Steps between periodic `info` summaries.
const REPORT_INTERVAL: u64 = 600;

/// Counters describing a running creature.
pub struct Metrics {
    step_count: AtomicU64,
    particle_count: AtomicU64,
    group_count: AtomicU64,
    mutation_count: AtomicU64,
    step_nanos: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step_count: AtomicU64::new(0),
            particle_count: AtomicU64::new(0),
            group_count: AtomicU64::new(0),
            mutation_count: AtomicU64::new(0),
            step_nanos: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Records `steps` fixed steps that together took `duration`.
    pub fn record_steps(&self, steps: u64, duration: Duration, particles: usize, groups: usize) {
        if steps == 0 {
            return;
        }
        let before = self.step_count.fetch_add(steps, Ordering::Relaxed);
        self.particle_count.store(particles as u64, Ordering::Relaxed);
        self.group_count.store(groups as u64, Ordering::Relaxed);
        self.step_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        let after = before + steps;
        if after / REPORT_INTERVAL > before / REPORT_INTERVAL {
            tracing::info!(
                step = after,
                particles = particles,
                groups = groups,
                mean_step_us = self.mean_step_time().as_micros() as u64,
                "Simulation step"
            );
        }
    }

    pub fn record_mutations(&self, applied: usize) {
        self.mutation_count
            .fetch_add(applied as u64, Ordering::Relaxed);
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn particle_count(&self) -> u64 {
        self.particle_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn group_count(&self) -> u64 {
        self.group_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutation_count.load(Ordering::Relaxed)
    }

    /// Mean wall time of one fixed step.
    #[must_use]
    pub fn mean_step_time(&self) -> Duration {
        let steps = self.step_count();
        if steps == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.step_nanos.load(Ordering::Relaxed) / steps)
    }

    /// Logs a simulation event.
    pub fn log_event(&self, event_type: &str, details: &str) {
        tracing::info!(
            event_type = event_type,
            details = details,
            "Simulation event"
        );
    }
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.step_count(), 0);
        assert_eq!(metrics.mean_step_time(), Duration::ZERO);
    }

    #[test]
    fn test_record_steps() {
        let metrics = Metrics::new();
        metrics.record_steps(4, Duration::from_micros(400), 500, 5);
        metrics.record_steps(0, Duration::from_secs(1), 0, 0);
        assert_eq!(metrics.step_count(), 4);
        assert_eq!(metrics.particle_count(), 500);
        assert_eq!(metrics.group_count(), 5);
        assert_eq!(metrics.mean_step_time(), Duration::from_micros(100));
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.increment_counter("mutation.skipped");
        metrics.increment_counter("mutation.skipped");
        assert_eq!(metrics.counter("mutation.skipped"), 2);
        assert_eq!(metrics.counter("missing"), 0);
        metrics.record_mutations(3);
        assert_eq!(metrics.mutation_count(), 3);
    }

    #[test]
    fn test_init_logging_installs_once() {
        init_logging("warn");
        assert!(!init_logging("debug"));
    }
}
