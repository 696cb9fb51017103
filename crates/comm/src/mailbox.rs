//! Per-rank inbound message demultiplexer.
//!
//! Every envelope that reaches a rank lands in its [`Mailbox`], which files it
//! under its `(source, tag)` channel. Blocking receives wait on a [`Notify`];
//! posted receives ([`RecvHandle`]) check the channel without waiting.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::CommError;
use crate::message::{Message, Tag};
use crate::traits::Rank;

type ChannelKey = (Rank, Tag);

#[derive(Debug, Default)]
struct MailboxState {
    channels: HashMap<ChannelKey, VecDeque<Message>>,
    aborted: Option<(Rank, String)>,
    failed: Option<String>,
    closed: bool,
}

/// Inbound queues for one rank, keyed by `(source, tag)`.
#[derive(Debug)]
pub struct Mailbox {
    rank: Rank,
    state: Mutex<MailboxState>,
    arrived: Notify,
}

impl Mailbox {
    pub fn new(rank: Rank) -> Arc<Self> {
        Arc::new(Self {
            rank,
            state: Mutex::new(MailboxState::default()),
            arrived: Notify::new(),
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// File an inbound message and wake any waiting receivers.
    ///
    /// An [`Tag::ABORT`] message poisons the mailbox instead of being queued.
    pub fn deliver(&self, message: Message) {
        {
            let mut state = self.lock();
            if message.tag == Tag::ABORT {
                let reason = message
                    .decode::<String>()
                    .unwrap_or_else(|_| "unspecified".into());
                warn!(rank = self.rank, by = message.source, %reason, "group abort received");
                state.aborted.get_or_insert((message.source, reason));
            } else {
                debug!(
                    rank = self.rank,
                    source = message.source,
                    tag = %message.tag,
                    id = %message.id,
                    "message delivered"
                );
                state
                    .channels
                    .entry((message.source, message.tag))
                    .or_default()
                    .push_back(message);
            }
        }
        self.arrived.notify_waiters();
    }

    /// Mark this rank as aborted locally (no message involved).
    pub fn poison(&self, by: Rank, reason: &str) {
        self.lock().aborted.get_or_insert((by, reason.to_string()));
        self.arrived.notify_waiters();
    }

    /// Mark the inbound side as broken: every receive fails with
    /// [`CommError::Transport`] from now on.
    ///
    /// Unlike [`poison`](Self::poison) this is a local fault, so the owner
    /// is still expected to abort the group.
    pub fn fail(&self, reason: &str) {
        self.lock().failed.get_or_insert_with(|| reason.to_string());
        self.arrived.notify_waiters();
    }

    /// Mark the inbound side as closed. Queued messages stay receivable.
    pub fn close(&self) {
        self.lock().closed = true;
        self.arrived.notify_waiters();
    }

    /// Take the next message on `(source, tag)` without waiting.
    pub fn try_take(&self, source: Rank, tag: Tag) -> Result<Option<Message>, CommError> {
        let mut state = self.lock();
        if let Some((by, reason)) = &state.aborted {
            return Err(CommError::Aborted {
                by: *by,
                reason: reason.clone(),
            });
        }
        if let Some(reason) = &state.failed {
            return Err(CommError::Transport(reason.clone()));
        }
        let next = state
            .channels
            .get_mut(&(source, tag))
            .and_then(VecDeque::pop_front);
        if next.is_none() && state.closed {
            return Err(CommError::Disconnected { rank: self.rank });
        }
        Ok(next)
    }

    /// Take the next message on `(source, tag)`, waiting until one arrives.
    pub async fn take(&self, source: Rank, tag: Tag) -> Result<Message, CommError> {
        loop {
            // Register interest before checking so a delivery between the
            // check and the await still wakes us.
            let notified = self.arrived.notified();
            if let Some(message) = self.try_take(source, tag)? {
                return Ok(message);
            }
            notified.await;
        }
    }

    /// Number of queued messages across all channels.
    pub fn pending(&self) -> usize {
        self.lock().channels.values().map(VecDeque::len).sum()
    }
}

/// A posted, not yet completed receive.
///
/// Holds no buffer of its own: the matching message stays in the mailbox
/// until [`poll`](Self::poll) claims it.
#[derive(Debug)]
pub struct RecvHandle {
    mailbox: Arc<Mailbox>,
    source: Rank,
    tag: Tag,
}

impl RecvHandle {
    pub fn new(mailbox: Arc<Mailbox>, source: Rank, tag: Tag) -> Self {
        Self {
            mailbox,
            source,
            tag,
        }
    }

    /// Non-blocking completion check.
    ///
    /// `Ok(Some(_))` completes the receive; `Ok(None)` means not yet.
    pub fn poll(&mut self) -> Result<Option<Message>, CommError> {
        self.mailbox.try_take(self.source, self.tag)
    }
}
