use std::time::Instant;

use uuid::Uuid;

use polyfold_comm::{CommError, Message, Rank, RecvHandle};

use crate::error::SchedulerError;

/// A task shipped to a worker whose result has not been collected yet.
#[derive(Debug)]
pub struct OutstandingRequest {
    /// Correlates dispatch and completion log lines.
    pub task_id: Uuid,
    /// Posted receive for the worker's result.
    pub handle: RecvHandle,
    /// Length the result must have.
    pub expected_len: usize,
    pub dispatched_at: Instant,
}

impl OutstandingRequest {
    pub fn new(handle: RecvHandle, expected_len: usize) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            handle,
            expected_len,
            dispatched_at: Instant::now(),
        }
    }
}

/// Coordinator-side view of one worker: idle, or holding exactly one
/// outstanding request.
#[derive(Debug)]
pub struct WorkerSlot {
    rank: Rank,
    outstanding: Option<OutstandingRequest>,
    dispatched: u64,
}

impl WorkerSlot {
    pub fn new(rank: Rank) -> Self {
        Self {
            rank,
            outstanding: None,
            dispatched: 0,
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding.is_none()
    }

    /// Total tasks ever assigned to this worker.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatched
    }

    pub fn outstanding(&self) -> Option<&OutstandingRequest> {
        self.outstanding.as_ref()
    }

    /// Record a dispatch. A worker never holds two requests at once.
    pub fn assign(&mut self, request: OutstandingRequest) -> Result<(), SchedulerError> {
        if self.outstanding.is_some() {
            return Err(SchedulerError::Logic(format!(
                "worker {} already has an outstanding request",
                self.rank
            )));
        }
        self.outstanding = Some(request);
        self.dispatched += 1;
        Ok(())
    }

    /// Return the slot to idle, handing back the finished request.
    pub fn clear(&mut self) -> Option<OutstandingRequest> {
        self.outstanding.take()
    }

    /// Check the outstanding request without waiting.
    ///
    /// When the result has arrived the slot goes back to idle and the
    /// finished request is returned with it. An idle slot yields `None`.
    pub fn poll(&mut self) -> Result<Option<(OutstandingRequest, Message)>, CommError> {
        let Some(request) = self.outstanding.as_mut() else {
            return Ok(None);
        };
        match request.handle.poll()? {
            None => Ok(None),
            Some(message) => Ok(self.outstanding.take().map(|request| (request, message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use polyfold_comm::{Communicator, LocalGroup, Tag};

    use super::*;

    fn request() -> OutstandingRequest {
        let group = LocalGroup::create(2);
        OutstandingRequest::new(group[0].irecv(1, Tag(4)).unwrap(), 3)
    }

    #[test]
    fn idle_to_dispatched_to_idle() {
        let mut slot = WorkerSlot::new(1);
        assert!(slot.is_idle());

        slot.assign(request()).unwrap();
        assert!(!slot.is_idle());
        assert_eq!(slot.outstanding().unwrap().expected_len, 3);

        let finished = slot.clear().unwrap();
        assert_eq!(finished.expected_len, 3);
        assert!(slot.is_idle());
        assert_eq!(slot.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn poll_clears_slot_once_result_arrives() {
        let group = LocalGroup::create(2);
        let mut slot = WorkerSlot::new(1);
        assert!(slot.poll().unwrap().is_none());

        let handle = group[0].irecv(1, Tag(4)).unwrap();
        slot.assign(OutstandingRequest::new(handle, 1)).unwrap();
        assert!(slot.poll().unwrap().is_none());
        assert!(!slot.is_idle());

        polyfold_comm::traits::send_value(&group[1], 0, Tag(4), &vec![9i64])
            .await
            .unwrap();
        let (request, message) = slot.poll().unwrap().expect("result should be ready");
        assert_eq!(request.expected_len, 1);
        assert_eq!(message.decode::<Vec<i64>>().unwrap(), vec![9]);
        assert!(slot.is_idle());
    }

    #[test]
    fn second_assignment_is_rejected() {
        let mut slot = WorkerSlot::new(2);
        slot.assign(request()).unwrap();

        let err = slot.assign(request()).unwrap_err();
        assert!(matches!(err, SchedulerError::Logic(_)));
        assert_eq!(slot.dispatch_count(), 1);
    }
}
