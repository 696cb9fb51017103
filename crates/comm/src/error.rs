use thiserror::Error;

use crate::traits::Rank;

/// Errors raised by the messaging substrate.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rank {rank} is outside the group of {size}")]
    InvalidRank { rank: Rank, size: usize },

    #[error("inbound channel of rank {rank} closed")]
    Disconnected { rank: Rank },

    #[error("group aborted by rank {by}: {reason}")]
    Aborted { by: Rank, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}
