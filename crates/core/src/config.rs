use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Run config ────────────────────────────────────────────────

/// Parameters of a single reduction run.
///
/// Read from `POLYFOLD_*` environment variables; command-line flags override
/// individual fields afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of seed items.
    pub seed_count: usize,
    /// Degree of every seed item.
    pub seed_degree: usize,
    /// Fixed RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Coordinator idle wait after the first cycle without progress, in microseconds.
    pub backoff_min_us: u64,
    /// Upper bound on the coordinator idle wait, in microseconds.
    pub backoff_max_us: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed_count: 4,
            seed_degree: 1,
            rng_seed: None,
            backoff_min_us: 50,
            backoff_max_us: 5_000,
        }
    }
}

impl RunConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            seed_count: env_usize("POLYFOLD_SEED_COUNT", d.seed_count),
            seed_degree: env_usize("POLYFOLD_SEED_DEGREE", d.seed_degree),
            rng_seed: env_opt("POLYFOLD_RNG_SEED").and_then(|v| v.parse().ok()),
            backoff_min_us: env_u64("POLYFOLD_BACKOFF_MIN_US", d.backoff_min_us),
            backoff_max_us: env_u64("POLYFOLD_BACKOFF_MAX_US", d.backoff_max_us),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.seed_count == 0 {
            return Err(CoreError::Config("seed_count must be at least 1".into()));
        }
        if self.backoff_min_us > self.backoff_max_us {
            return Err(CoreError::Config(format!(
                "backoff_min_us ({}) exceeds backoff_max_us ({})",
                self.backoff_min_us, self.backoff_max_us
            )));
        }
        Ok(())
    }

    pub fn backoff_min(&self) -> Duration {
        Duration::from_micros(self.backoff_min_us)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_micros(self.backoff_max_us)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            seed_count = self.seed_count,
            seed_degree = self.seed_degree,
            rng_seed = ?self.rng_seed,
            backoff_min_us = self.backoff_min_us,
            backoff_max_us = self.backoff_max_us,
            "run config loaded"
        );
    }
}
