use serde::{Deserialize, Serialize};

// ── Top-level config ────────────────────────────────────────────────

/// Layout of a multi-process group.
///
/// Parsed from `polyfold.toml` with support for environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Member endpoints, indexed by rank.
    pub group: GroupSection,

    /// Connection behaviour.
    #[serde(default)]
    pub transport: TransportSection,
}

// ── Section configs ─────────────────────────────────────────────────

/// Group section: one inbound endpoint per rank. Rank 0 is the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSection {
    /// Endpoint each rank binds its inbound socket to (`tcp://` or `ipc://`).
    pub ranks: Vec<String>,
}

/// Transport section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSection {
    /// Connection attempts per peer before giving up.
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Delay between connection attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_connect_retries() -> u32 {
    50
}

fn default_retry_delay_ms() -> u64 {
    100
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            connect_retries: default_connect_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}
