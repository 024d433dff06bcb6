//! Per-runner telemetry: aggregate counters plus a bounded run history.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sk_protocol::runtime_models::RunnerStatus;
use std::time::Duration;
use uuid::Uuid;

/// One finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub agent_id: Uuid,
    pub status: RunnerStatus,
    pub steps: u64,
    pub errors: u64,
    pub finished_at: DateTime<Utc>,
}

/// Aggregate view of a runner's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub total_runs: u64,
    pub total_steps: u64,
    pub error_count: u64,
    pub avg_step_duration: Duration,
}

/// Counters owned by a single runner; not shared across runners.
#[derive(Debug, Default)]
pub struct Telemetry {
    total_runs: u64,
    total_steps: u64,
    error_count: u64,
    step_duration_sum: Duration,
    records: Vec<RunRecord>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self, duration: Duration) {
        self.total_steps += 1;
        self.step_duration_sum += duration;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn record_run(&mut self, record: RunRecord) {
        self.total_runs += 1;
        self.records.push(record);
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let avg_step_duration = if self.total_steps == 0 {
            Duration::ZERO
        } else {
            self.step_duration_sum / self.total_steps as u32
        };
        TelemetrySnapshot {
            total_runs: self.total_runs,
            total_steps: self.total_steps,
            error_count: self.error_count,
            avg_step_duration,
        }
    }

    /// Drop run records older than `age`. Counters are cumulative and are
    /// not rewound. Returns how many records were removed.
    pub fn cleanup_older_than(&mut self, age: ChronoDuration) -> usize {
        let cutoff = Utc::now() - age;
        let before = self.records.len();
        self.records.retain(|r| r.finished_at >= cutoff);
        before - self.records.len()
    }
}
