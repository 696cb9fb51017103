//! Multi-process group over ZeroMQ PUSH/PULL sockets.
//!
//! Each rank binds one PULL socket on its configured endpoint and connects a
//! PUSH socket to every peer's endpoint. A background task drains the PULL
//! socket into the rank's [`Mailbox`], which provides the `(source, tag)`
//! matching. One PUSH socket per ordered pair keeps each channel FIFO.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use zeromq::{PullSocket, PushSocket, Socket, SocketRecv, SocketSend};

use crate::config::GroupConfig;
use crate::error::CommError;
use crate::mailbox::{Mailbox, RecvHandle};
use crate::message::{Message, Tag};
use crate::traits::{check_rank, Communicator, Rank};
use crate::transport::Transport;

/// One member of a ZeroMQ-backed group.
pub struct ZmqComm {
    rank: Rank,
    size: usize,
    mailbox: Arc<Mailbox>,
    /// Outbound sockets indexed by destination rank; `None` at our own rank.
    peers: Vec<Option<Mutex<PushSocket>>>,
    recv_loop: JoinHandle<()>,
}

impl ZmqComm {
    /// Bind this rank's inbound endpoint and connect to every peer.
    ///
    /// Peers may start in any order: connections are retried according to
    /// the `[transport]` section of `config`.
    #[instrument(skip_all, fields(rank = rank))]
    pub async fn join(config: &GroupConfig, rank: Rank) -> Result<Self, CommError> {
        let size = config.size();
        check_rank(rank, size)?;

        let own = config.transport_for(rank)?;
        own.prepare_bind()
            .map_err(|e| CommError::Transport(format!("{own}: {e}")))?;

        let mut inbound = PullSocket::new();
        info!(endpoint = %own, size, "binding PULL socket");
        inbound.bind(&own.endpoint()).await?;

        let mailbox = Mailbox::new(rank);
        let loop_mailbox = Arc::clone(&mailbox);
        let recv_loop = tokio::spawn(async move {
            Self::recv_loop(inbound, loop_mailbox).await;
        });

        let peers = match Self::connect_peers(config, rank).await {
            Ok(peers) => peers,
            Err(e) => {
                recv_loop.abort();
                return Err(e);
            }
        };

        info!(size, "joined group");
        Ok(Self {
            rank,
            size,
            mailbox,
            peers,
            recv_loop,
        })
    }

    async fn connect_peers(
        config: &GroupConfig,
        rank: Rank,
    ) -> Result<Vec<Option<Mutex<PushSocket>>>, CommError> {
        let mut peers = Vec::with_capacity(config.size());
        for peer in 0..config.size() {
            if peer == rank {
                peers.push(None);
                continue;
            }
            let transport = config.transport_for(peer)?;
            let socket = connect_with_retry(
                &transport,
                config.transport.connect_retries,
                config.retry_delay(),
            )
            .await?;
            peers.push(Some(Mutex::new(socket)));
        }
        Ok(peers)
    }

    /// Drain the PULL socket into the mailbox until the socket fails.
    ///
    /// A frame that is not a valid envelope may have been any message, so
    /// the mailbox is failed and every receive on this rank errors from then on.
    async fn recv_loop(mut socket: PullSocket, mailbox: Arc<Mailbox>) {
        let rank = mailbox.rank();
        loop {
            let raw = match socket.recv().await {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(rank, error = %e, "PULL recv loop ending");
                    mailbox.close();
                    return;
                }
            };
            let decoded = match raw.get(0) {
                Some(frame) => Message::from_bytes(frame.as_ref()).map_err(|e| e.to_string()),
                None => Err("empty frame".to_string()),
            };
            match decoded {
                Ok(message) => mailbox.deliver(message),
                Err(e) => {
                    error!(rank, error = %e, "undecodable inbound frame");
                    mailbox.fail(&format!("undecodable inbound frame: {e}"));
                    return;
                }
            }
        }
    }
}

/// Connect a PUSH socket, retrying while the peer has not bound yet.
async fn connect_with_retry(
    transport: &Transport,
    attempts: u32,
    delay: Duration,
) -> Result<PushSocket, CommError> {
    let endpoint = transport.endpoint();
    let attempts = attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        let mut socket = PushSocket::new();
        match socket.connect(&endpoint).await {
            Ok(()) => {
                debug!(endpoint = %endpoint, attempt, "connected PUSH socket");
                return Ok(socket);
            }
            Err(e) => {
                debug!(endpoint = %endpoint, attempt, error = %e, "connect failed, retrying");
                last_error = Some(e);
                tokio::time::sleep(delay).await;
            }
        }
    }
    Err(CommError::Transport(format!(
        "could not connect to {endpoint} after {attempts} attempts: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

impl Drop for ZmqComm {
    fn drop(&mut self) {
        self.recv_loop.abort();
    }
}

#[async_trait]
impl Communicator for ZmqComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn send(&self, dest: Rank, message: Message) -> Result<(), CommError> {
        check_rank(dest, self.size)?;
        let message = message.stamped(self.rank);
        match &self.peers[dest] {
            None => {
                self.mailbox.deliver(message);
            }
            Some(socket) => {
                let bytes = message.to_bytes()?;
                socket.lock().await.send(bytes.into()).await?;
            }
        }
        Ok(())
    }

    async fn recv(&self, source: Rank, tag: Tag) -> Result<Message, CommError> {
        check_rank(source, self.size)?;
        self.mailbox.take(source, tag).await
    }

    fn irecv(&self, source: Rank, tag: Tag) -> Result<RecvHandle, CommError> {
        check_rank(source, self.size)?;
        Ok(RecvHandle::new(Arc::clone(&self.mailbox), source, tag))
    }

    async fn abort(&self, reason: &str) {
        warn!(rank = self.rank, %reason, "aborting group");
        for (dest, peer) in self.peers.iter().enumerate() {
            let Some(socket) = peer else { continue };
            let bytes = Message::new(Tag::ABORT, reason)
                .map(|m| m.stamped(self.rank))
                .and_then(|m| m.to_bytes());
            match bytes {
                Ok(bytes) => {
                    if let Err(e) = socket.lock().await.send(bytes.into()).await {
                        warn!(dest, error = %e, "failed to deliver abort");
                    }
                }
                Err(e) => warn!(dest, error = %e, "failed to encode abort"),
            }
        }
        self.mailbox.poison(self.rank, reason);
    }
}
