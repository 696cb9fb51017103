//! Rank-0 dispatch loop.
//!
//! The coordinator owns the work queue and one [`WorkerSlot`] per worker.
//! Each [`cycle`](Coordinator::cycle) polls every outstanding request without
//! blocking, re-queues finished results, and hands a pair of items to every
//! idle worker while at least two are queued. Cycles repeat until one item is
//! left and nothing is in flight; then every worker gets exactly one `Stop`.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use polyfold_comm::{Communicator, COORDINATOR};
use polyfold_core::{Combiner, RunConfig, WorkItem, WorkQueue};

use crate::backoff::Backoff;
use crate::error::SchedulerError;
use crate::metrics::SchedulerMetrics;
use crate::protocol;
use crate::slot::{OutstandingRequest, WorkerSlot};

/// Tuning for the coordinator loop.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// First wait after a cycle without progress.
    pub backoff_min: Duration,
    /// Ceiling for the doubling wait.
    pub backoff_max: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            backoff_min: Duration::from_micros(50),
            backoff_max: Duration::from_micros(5000),
        }
    }
}

impl From<&RunConfig> for CoordinatorConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            backoff_min: config.backoff_min(),
            backoff_max: config.backoff_max(),
        }
    }
}

/// What a single scheduling cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub completed: usize,
    pub dispatched: usize,
}

impl CycleReport {
    pub fn made_progress(&self) -> bool {
        self.completed > 0 || self.dispatched > 0
    }
}

/// Result of a finished reduction.
#[derive(Debug, Clone)]
pub struct CoordinatorOutcome {
    /// The single remaining work item.
    pub item: WorkItem,
    pub metrics: SchedulerMetrics,
}

/// Coordinator state for one reduction run.
pub struct Coordinator<'a, C: Communicator + ?Sized, K: Combiner + ?Sized> {
    comm: &'a C,
    combiner: &'a K,
    queue: WorkQueue,
    slots: Vec<WorkerSlot>,
    metrics: SchedulerMetrics,
    backoff: Backoff,
}

impl<'a, C: Communicator + ?Sized, K: Combiner + ?Sized> Coordinator<'a, C, K> {
    /// Set up the queue and one slot per worker rank. Sends nothing.
    pub fn new(
        comm: &'a C,
        combiner: &'a K,
        seeds: Vec<WorkItem>,
        config: &CoordinatorConfig,
    ) -> Result<Self, SchedulerError> {
        if comm.rank() != COORDINATOR {
            return Err(SchedulerError::Logic(format!(
                "coordinator must run on rank {COORDINATOR}, not {}",
                comm.rank()
            )));
        }
        if seeds.is_empty() {
            return Err(SchedulerError::NoWork);
        }
        let workers = comm.size().saturating_sub(1);
        if workers == 0 && seeds.len() >= 2 {
            return Err(SchedulerError::NoWorkers { items: seeds.len() });
        }

        let queue: WorkQueue = seeds.into_iter().collect();
        let metrics = SchedulerMetrics {
            max_queue_depth: queue.high_water(),
            ..SchedulerMetrics::default()
        };

        Ok(Self {
            comm,
            combiner,
            queue,
            slots: (1..comm.size()).map(WorkerSlot::new).collect(),
            metrics,
            backoff: Backoff::new(config.backoff_min, config.backoff_max),
        })
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of workers holding an outstanding request.
    pub fn outstanding(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_idle()).count()
    }

    pub fn slots(&self) -> &[WorkerSlot] {
        &self.slots
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// One item left and nothing in flight.
    pub fn is_done(&self) -> bool {
        self.queue.len() == 1 && self.outstanding() == 0
    }

    /// Original seeds still represented: each outstanding request stands for
    /// the two operands it consumed.
    ///
    /// Drops by exactly one per completed task and never otherwise.
    pub fn live_items(&self) -> usize {
        self.queue.len() + 2 * self.outstanding()
    }

    /// Queued plus in-flight items. Never increases between cycles.
    pub fn pending_items(&self) -> usize {
        self.queue.len() + self.outstanding()
    }

    /// Run one scheduling pass over every worker. Never waits on a worker.
    pub async fn cycle(&mut self) -> Result<CycleReport, SchedulerError> {
        let live_before = self.live_items();
        let mut report = CycleReport::default();
        self.metrics.cycles += 1;

        for slot in self.slots.iter_mut() {
            let worker = slot.rank();

            if !slot.is_idle() {
                self.metrics.polls += 1;
                let Some((request, message)) = slot.poll()? else {
                    continue;
                };
                let item = protocol::decode_result(&message, request.expected_len)?;
                let latency = request.dispatched_at.elapsed();
                debug!(
                    worker,
                    task_id = %request.task_id,
                    len = item.len(),
                    latency_us = latency.as_micros() as u64,
                    "task completed"
                );
                self.queue.push(item);
                self.metrics.record_completion(worker, latency);
                report.completed += 1;
            }

            if self.queue.len() < 2 {
                continue;
            }
            let Some((a, b)) = self.queue.pop_pair() else {
                continue;
            };
            let expected = self.combiner.output_len(a.len(), b.len());
            protocol::send_task(self.comm, worker, &a, &b).await?;
            let handle = self.comm.irecv(worker, protocol::RESULT)?;
            let request = OutstandingRequest::new(handle, expected);
            debug!(
                worker,
                task_id = %request.task_id,
                len_a = a.len(),
                len_b = b.len(),
                expected,
                "task dispatched"
            );
            slot.assign(request)?;
            self.metrics.record_dispatch();
            report.dispatched += 1;
        }

        self.metrics.max_queue_depth = self.queue.high_water();
        if !report.made_progress() {
            self.metrics.idle_cycles += 1;
        }

        if self.live_items() + report.completed != live_before {
            return Err(SchedulerError::Logic(format!(
                "item count drifted: {live_before} live before cycle, {} after {} completions",
                self.live_items(),
                report.completed
            )));
        }
        Ok(report)
    }

    /// Drive cycles to completion, stop every worker, and return the result.
    ///
    /// On any failure the group is aborted before the error is returned.
    pub async fn run(mut self) -> Result<CoordinatorOutcome, SchedulerError> {
        info!(
            workers = self.slots.len(),
            items = self.queue.len(),
            "coordinator started"
        );
        match self.drain().await {
            Ok(item) => {
                info!(
                    cycles = self.metrics.cycles,
                    completed = self.metrics.completed,
                    "coordinator finished"
                );
                Ok(CoordinatorOutcome {
                    item,
                    metrics: self.metrics,
                })
            }
            Err(e) => {
                abort_group(self.comm, &e).await;
                Err(e)
            }
        }
    }

    async fn drain(&mut self) -> Result<WorkItem, SchedulerError> {
        while !self.is_done() {
            let report = self.cycle().await?;
            if report.made_progress() {
                self.backoff.reset();
            } else {
                self.backoff.wait().await;
            }
        }

        for slot in &self.slots {
            protocol::send_stop(self.comm, slot.rank()).await?;
        }
        debug!(workers = self.slots.len(), "stop sent to every worker");

        self.queue
            .take_last()
            .ok_or_else(|| SchedulerError::Logic("queue did not end with exactly one item".into()))
    }
}

/// Reduce `seeds` to a single item using the workers of `comm`'s group.
///
/// Must run on rank 0. Any error, including a rejected seed set, aborts the
/// group so blocked workers are released.
pub async fn run_coordinator<C, K>(
    comm: &C,
    combiner: &K,
    seeds: Vec<WorkItem>,
    config: &CoordinatorConfig,
) -> Result<CoordinatorOutcome, SchedulerError>
where
    C: Communicator + ?Sized,
    K: Combiner + ?Sized,
{
    match Coordinator::new(comm, combiner, seeds, config) {
        Ok(coordinator) => coordinator.run().await,
        Err(e) => {
            abort_group(comm, &e).await;
            Err(e)
        }
    }
}

async fn abort_group<C: Communicator + ?Sized>(comm: &C, cause: &SchedulerError) {
    if cause.is_abort() {
        warn!(error = %cause, "group already aborted");
        return;
    }
    error!(error = %cause, "coordinator failed, aborting group");
    comm.abort(&cause.to_string()).await;
}
