use polyfold_comm::{CommError, Rank};

/// Errors that end a reduction run. None of them is recoverable: the caller
/// aborts the group and exits.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("transport error: {0}")]
    Comm(#[from] CommError),

    #[error("protocol error with rank {rank}: expected {expected} elements, got {actual}")]
    Protocol {
        rank: Rank,
        expected: usize,
        actual: usize,
    },

    #[error("no work: at least one seed item is required")]
    NoWork,

    #[error("no workers: {items} items to combine but the group has only the coordinator")]
    NoWorkers { items: usize },

    #[error("scheduler invariant violated: {0}")]
    Logic(String),
}

impl SchedulerError {
    /// Whether this error is the echo of an abort raised elsewhere in the group.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Comm(CommError::Aborted { .. }))
    }
}
