use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use polyfold_comm::Rank;

/// Coordinator operational counters for one reduction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Tasks shipped to workers.
    pub dispatched: u64,
    /// Results received and re-queued.
    pub completed: u64,
    /// Non-blocking completion checks performed.
    pub polls: u64,
    /// Scheduling cycles run.
    pub cycles: u64,
    /// Cycles that neither completed nor dispatched anything.
    pub idle_cycles: u64,
    /// Completed tasks per worker rank.
    pub tasks_per_worker: BTreeMap<Rank, u64>,
    /// Mean time from dispatch to observed completion.
    pub avg_task_latency: Duration,
    /// Largest queue length seen.
    pub max_queue_depth: usize,
}

impl SchedulerMetrics {
    pub fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    /// Record a completed task and fold its latency into the running mean.
    pub fn record_completion(&mut self, worker: Rank, latency: Duration) {
        self.completed += 1;
        *self.tasks_per_worker.entry(worker).or_default() += 1;

        // Incremental mean: new_avg = prev_avg + (latency - prev_avg) / count
        self.avg_task_latency = if self.completed == 1 {
            latency
        } else {
            let prev_nanos = self.avg_task_latency.as_nanos() as f64;
            let cur_nanos = latency.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / self.completed as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }
}
