use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CommError;
use crate::mailbox::RecvHandle;
use crate::message::{Message, Tag};

/// Identity of a member within a fixed group.
pub type Rank = usize;

/// The distinguished rank that owns the work queue.
pub const COORDINATOR: Rank = 0;

/// Point-to-point messaging between members of a fixed group.
///
/// Delivery is reliable and FIFO per `(source, tag)` channel. Group size and
/// membership are fixed for the lifetime of the communicator.
///
/// Implementations: [`LocalComm`](crate::LocalComm) (in-process),
/// [`ZmqComm`](crate::ZmqComm) (one process per rank over ZeroMQ).
#[async_trait]
pub trait Communicator: Send + Sync {
    /// This member's rank.
    fn rank(&self) -> Rank;

    /// Total number of ranks in the group.
    fn size(&self) -> usize;

    /// Send a message to `dest`. Returns once the message is handed off.
    async fn send(&self, dest: Rank, message: Message) -> Result<(), CommError>;

    /// Receive the next message from `source` with `tag`, waiting until one arrives.
    async fn recv(&self, source: Rank, tag: Tag) -> Result<Message, CommError>;

    /// Post a receive for the next message from `source` with `tag`.
    ///
    /// Returns immediately; completion is checked with [`RecvHandle::poll`].
    fn irecv(&self, source: Rank, tag: Tag) -> Result<RecvHandle, CommError>;

    /// Tell every other member to stop. Best effort: delivery failures are
    /// logged, not returned. After this call, receives on this member fail too.
    async fn abort(&self, reason: &str);
}

/// Blanket implementation so `Arc<dyn Communicator>` can be used directly.
#[async_trait]
impl<T: Communicator + ?Sized> Communicator for Arc<T> {
    fn rank(&self) -> Rank {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    async fn send(&self, dest: Rank, message: Message) -> Result<(), CommError> {
        (**self).send(dest, message).await
    }

    async fn recv(&self, source: Rank, tag: Tag) -> Result<Message, CommError> {
        (**self).recv(source, tag).await
    }

    fn irecv(&self, source: Rank, tag: Tag) -> Result<RecvHandle, CommError> {
        (**self).irecv(source, tag)
    }

    async fn abort(&self, reason: &str) {
        (**self).abort(reason).await
    }
}

/// Encode `value` and send it to `dest` under `tag`.
pub async fn send_value<C, T>(comm: &C, dest: Rank, tag: Tag, value: &T) -> Result<(), CommError>
where
    C: Communicator + ?Sized,
    T: Serialize + ?Sized,
{
    let message = Message::new(tag, value)?;
    comm.send(dest, message).await
}

pub(crate) fn check_rank(rank: Rank, size: usize) -> Result<(), CommError> {
    if rank < size {
        Ok(())
    } else {
        Err(CommError::InvalidRank { rank, size })
    }
}
