pub mod backoff;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod slot;
pub mod worker;

pub use backoff::Backoff;
pub use coordinator::{run_coordinator, Coordinator, CoordinatorConfig, CoordinatorOutcome, CycleReport};
pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use protocol::Command;
pub use slot::{OutstandingRequest, WorkerSlot};
pub use worker::{run_worker, WorkerReport};
