use std::path::Path;
use std::time::Duration;

use crate::error::CommError;
use crate::traits::Rank;
use crate::transport::Transport;

use super::types::{GroupConfig, GroupSection, TransportSection};

impl GroupConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CommError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CommError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// A single-host group of `size` ranks on consecutive loopback TCP ports.
    ///
    /// Fails if the port range runs past 65535.
    pub fn local(size: usize, base_port: u16) -> Result<Self, CommError> {
        let ranks = (0..size)
            .map(|rank| {
                let port = u16::try_from(rank)
                    .ok()
                    .and_then(|offset| base_port.checked_add(offset))
                    .ok_or_else(|| {
                        CommError::Config(format!(
                            "{size} ranks starting at port {base_port} exceed the port range"
                        ))
                    })?;
                Ok(Transport::tcp("127.0.0.1", port).endpoint())
            })
            .collect::<Result<_, CommError>>()?;
        Ok(Self {
            group: GroupSection { ranks },
            transport: TransportSection::default(),
        })
    }

    /// A single-host group of `size` ranks on IPC sockets named `{prefix}-{rank}`.
    pub fn ipc(size: usize, prefix: &str) -> Self {
        let ranks = (0..size)
            .map(|rank| Transport::ipc(&format!("{prefix}-{rank}")).endpoint())
            .collect();
        Self {
            group: GroupSection { ranks },
            transport: TransportSection::default(),
        }
    }

    /// Number of ranks in the group.
    pub fn size(&self) -> usize {
        self.group.ranks.len()
    }

    /// Resolve a rank's inbound endpoint.
    pub fn transport_for(&self, rank: Rank) -> Result<Transport, CommError> {
        let endpoint = self.group.ranks.get(rank).ok_or(CommError::InvalidRank {
            rank,
            size: self.size(),
        })?;
        Transport::parse(endpoint)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.transport.retry_delay_ms)
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `POLYFOLD_SECTION_KEY` overrides `section.key`.
    /// - `POLYFOLD_GROUP_RANKS` -> `group.ranks` (comma-separated)
    /// - `POLYFOLD_TRANSPORT_CONNECT_RETRIES` -> `transport.connect_retries`
    /// - `POLYFOLD_TRANSPORT_RETRY_DELAY_MS` -> `transport.retry_delay_ms`
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("POLYFOLD_GROUP_RANKS") {
            self.group.ranks = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("POLYFOLD_TRANSPORT_CONNECT_RETRIES") {
            if let Ok(n) = v.parse::<u32>() {
                self.transport.connect_retries = n;
            }
        }
        if let Ok(v) = std::env::var("POLYFOLD_TRANSPORT_RETRY_DELAY_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.transport.retry_delay_ms = ms;
            }
        }
    }
}
