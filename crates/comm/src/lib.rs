pub mod config;
pub mod error;
pub mod local;
pub mod mailbox;
pub mod message;
pub mod traits;
pub mod transport;
pub mod zmq_group;

pub use config::{GroupConfig, GroupSection, TransportSection};
pub use error::CommError;
pub use local::{LocalComm, LocalGroup};
pub use mailbox::{Mailbox, RecvHandle};
pub use message::{Message, Tag};
pub use traits::{Communicator, Rank, COORDINATOR};
pub use transport::Transport;
pub use zmq_group::ZmqComm;
