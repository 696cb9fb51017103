//! Coordinator/worker wire protocol.
//!
//! One dispatch is four messages from the coordinator to a worker:
//!
//! 1. [`COMMAND`]: `Command::Combine { len: len(a) }`
//! 2. [`SIZE`]: `len(b)`
//! 3. [`PAYLOAD`]: coefficients of `a`
//! 4. [`PAYLOAD`]: coefficients of `b`
//!
//! The worker answers with one [`RESULT`] message. Termination is a single
//! `Command::Stop` with nothing after it.

use serde::{Deserialize, Serialize};

use polyfold_comm::traits::send_value;
use polyfold_comm::{CommError, Communicator, Message, Rank, Tag, COORDINATOR};
use polyfold_core::{Coefficient, WorkItem};

use crate::error::SchedulerError;

// ── Tags ──────────────────────────────────────────────────────────────────

/// Control messages: start a combination or stop.
pub const COMMAND: Tag = Tag(1);

/// Length of the second operand.
pub const SIZE: Tag = Tag(2);

/// Operand coefficients.
pub const PAYLOAD: Tag = Tag(3);

/// Combined coefficients returned by a worker.
pub const RESULT: Tag = Tag(4);

/// Control message opening every exchange with a worker.
///
/// Keeping `Stop` separate from the operand length means an empty work item
/// is just `Combine { len: 0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// A task follows; `len` is the length of the first operand.
    Combine { len: usize },
    /// No more work.
    Stop,
}

fn decode<T: for<'de> Deserialize<'de>>(message: &Message) -> Result<T, SchedulerError> {
    message
        .decode()
        .map_err(|e| SchedulerError::Comm(CommError::from(e)))
}

// ── Coordinator side ──────────────────────────────────────────────────────

/// Ship the operands of one task to `worker`.
pub async fn send_task<C: Communicator + ?Sized>(
    comm: &C,
    worker: Rank,
    a: &WorkItem,
    b: &WorkItem,
) -> Result<(), SchedulerError> {
    send_value(comm, worker, COMMAND, &Command::Combine { len: a.len() }).await?;
    send_value(comm, worker, SIZE, &b.len()).await?;
    send_value(comm, worker, PAYLOAD, a.coefficients()).await?;
    send_value(comm, worker, PAYLOAD, b.coefficients()).await?;
    Ok(())
}

/// Tell `worker` there is no more work.
pub async fn send_stop<C: Communicator + ?Sized>(comm: &C, worker: Rank) -> Result<(), SchedulerError> {
    send_value(comm, worker, COMMAND, &Command::Stop).await?;
    Ok(())
}

/// Decode a completed result and check it against the expected length.
pub fn decode_result(message: &Message, expected: usize) -> Result<WorkItem, SchedulerError> {
    let coefficients: Vec<Coefficient> = decode(message)?;
    if coefficients.len() != expected {
        return Err(SchedulerError::Protocol {
            rank: message.source,
            expected,
            actual: coefficients.len(),
        });
    }
    Ok(WorkItem::new(coefficients))
}

// ── Worker side ───────────────────────────────────────────────────────────

pub async fn recv_command<C: Communicator + ?Sized>(comm: &C) -> Result<Command, SchedulerError> {
    let message = comm.recv(COORDINATOR, COMMAND).await?;
    decode(&message)
}

pub async fn recv_size<C: Communicator + ?Sized>(comm: &C) -> Result<usize, SchedulerError> {
    let message = comm.recv(COORDINATOR, SIZE).await?;
    decode(&message)
}

/// Receive one operand and check it has the announced length.
pub async fn recv_payload<C: Communicator + ?Sized>(
    comm: &C,
    expected: usize,
) -> Result<Vec<Coefficient>, SchedulerError> {
    let message = comm.recv(COORDINATOR, PAYLOAD).await?;
    let coefficients: Vec<Coefficient> = decode(&message)?;
    if coefficients.len() != expected {
        return Err(SchedulerError::Protocol {
            rank: COORDINATOR,
            expected,
            actual: coefficients.len(),
        });
    }
    Ok(coefficients)
}

pub async fn send_result<C: Communicator + ?Sized>(comm: &C, result: &WorkItem) -> Result<(), SchedulerError> {
    send_value(comm, COORDINATOR, RESULT, result.coefficients()).await?;
    Ok(())
}
