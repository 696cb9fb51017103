use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::Rank;

/// Message class identifier.
///
/// Receives match on `(source, tag)`, so distinct classes never interleave
/// within one channel. Applications pick their own tag values; [`Tag::ABORT`]
/// is reserved by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub u16);

impl Tag {
    /// Group-wide abort notification. Never matched by a receive.
    pub const ABORT: Tag = Tag(u16::MAX);
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ABORT {
            f.write_str("abort")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Wire-format envelope for point-to-point messages.
///
/// Payloads are serialized with MessagePack. `source` is stamped by the
/// sending communicator, so callers never set it themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Rank that sent this message.
    pub source: Rank,

    /// Message class.
    pub tag: Tag,

    /// MessagePack-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    /// When this message was created.
    pub sent_at: DateTime<Utc>,

    /// Unique message id, for tracing.
    pub id: Uuid,
}

impl Message {
    /// Create a new message, serializing the payload with MessagePack.
    pub fn new<T: Serialize + ?Sized>(tag: Tag, payload: &T) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self {
            source: 0,
            tag,
            payload: rmp_serde::to_vec(payload)?,
            sent_at: Utc::now(),
            id: Uuid::new_v4(),
        })
    }

    /// Deserialize the payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, rmp_serde::decode::Error> {
        rmp_serde::from_slice(&self.payload)
    }

    /// Serialize this entire envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }

    pub(crate) fn stamped(mut self, source: Rank) -> Self {
        self.source = source;
        self
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}
