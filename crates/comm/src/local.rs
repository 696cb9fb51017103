//! In-process group: every rank is a task in the same runtime.
//!
//! Sending files the envelope straight into the destination's [`Mailbox`].
//! Used by the single-binary `run` mode and by tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::CommError;
use crate::mailbox::{Mailbox, RecvHandle};
use crate::message::{Message, Tag};
use crate::traits::{check_rank, Communicator, Rank};

/// Factory for a fixed in-process group.
pub struct LocalGroup;

impl LocalGroup {
    /// Create a group of `size` members, returned in rank order.
    pub fn create(size: usize) -> Vec<LocalComm> {
        let mailboxes: Arc<[Arc<Mailbox>]> = (0..size).map(Mailbox::new).collect();
        debug!(size, "created in-process group");
        (0..size)
            .map(|rank| LocalComm {
                rank,
                mailboxes: Arc::clone(&mailboxes),
            })
            .collect()
    }
}

/// One member of an in-process group.
#[derive(Debug, Clone)]
pub struct LocalComm {
    rank: Rank,
    mailboxes: Arc<[Arc<Mailbox>]>,
}

impl LocalComm {
    fn own_mailbox(&self) -> &Arc<Mailbox> {
        &self.mailboxes[self.rank]
    }

    /// Messages waiting in this member's mailbox.
    pub fn pending(&self) -> usize {
        self.own_mailbox().pending()
    }
}

#[async_trait]
impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.mailboxes.len()
    }

    async fn send(&self, dest: Rank, message: Message) -> Result<(), CommError> {
        check_rank(dest, self.size())?;
        self.mailboxes[dest].deliver(message.stamped(self.rank));
        Ok(())
    }

    async fn recv(&self, source: Rank, tag: Tag) -> Result<Message, CommError> {
        check_rank(source, self.size())?;
        self.own_mailbox().take(source, tag).await
    }

    fn irecv(&self, source: Rank, tag: Tag) -> Result<RecvHandle, CommError> {
        check_rank(source, self.size())?;
        Ok(RecvHandle::new(Arc::clone(self.own_mailbox()), source, tag))
    }

    async fn abort(&self, reason: &str) {
        warn!(rank = self.rank, %reason, "aborting in-process group");
        for (dest, mailbox) in self.mailboxes.iter().enumerate() {
            if dest == self.rank {
                continue;
            }
            match Message::new(Tag::ABORT, reason) {
                Ok(message) => mailbox.deliver(message.stamped(self.rank)),
                Err(e) => warn!(dest, error = %e, "failed to encode abort"),
            }
        }
        self.own_mailbox().poison(self.rank, reason);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::traits::send_value;

    #[tokio::test]
    async fn point_to_point_roundtrip() {
        let group = LocalGroup::create(3);
        send_value(&group[2], 0, Tag(1), &vec![4i64, 5]).await.unwrap();

        let msg = group[0].recv(2, Tag(1)).await.unwrap();
        assert_eq!(msg.source, 2);
        assert_eq!(msg.decode::<Vec<i64>>().unwrap(), vec![4, 5]);
    }

    #[tokio::test]
    async fn irecv_polls_without_blocking() {
        let group = LocalGroup::create(2);
        let mut handle = group[0].irecv(1, Tag(8)).unwrap();
        assert!(handle.poll().unwrap().is_none());

        send_value(&group[1], 0, Tag(8), &3u64).await.unwrap();
        let msg = handle.poll().unwrap().expect("message should be ready");
        assert_eq!(msg.decode::<u64>().unwrap(), 3);
    }

    #[tokio::test]
    async fn invalid_rank_is_rejected() {
        let group = LocalGroup::create(2);
        let err = send_value(&group[0], 5, Tag(1), &0u8).await.unwrap_err();
        assert!(matches!(err, CommError::InvalidRank { rank: 5, size: 2 }));
        assert!(group[0].irecv(2, Tag(1)).is_err());
    }

    #[tokio::test]
    async fn abort_wakes_blocked_receivers() {
        let group = LocalGroup::create(3);
        let blocked = {
            let member = group[1].clone();
            tokio::spawn(async move { member.recv(0, Tag(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        group[0].abort("test failure").await;

        let result = tokio::time::timeout(Duration::from_secs(2), blocked)
            .await
            .expect("blocked receive should wake")
            .unwrap();
        assert!(matches!(result, Err(CommError::Aborted { by: 0, .. })));
        assert!(group[2].irecv(0, Tag(1)).unwrap().poll().is_err());
        assert!(group[0].irecv(1, Tag(1)).unwrap().poll().is_err());
    }
}
