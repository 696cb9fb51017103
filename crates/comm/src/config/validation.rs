use std::collections::HashSet;

use super::types::GroupConfig;
use crate::error::CommError;
use crate::transport::Transport;

impl GroupConfig {
    /// Validate the config: non-empty group, well-formed and unique endpoints.
    pub fn validate(&self) -> Result<(), CommError> {
        self.validate_not_empty()?;
        self.validate_endpoints()?;
        self.validate_unique_endpoints()?;
        Ok(())
    }

    fn validate_not_empty(&self) -> Result<(), CommError> {
        if self.group.ranks.is_empty() {
            return Err(CommError::Config(
                "group.ranks must list at least the coordinator endpoint".into(),
            ));
        }
        Ok(())
    }

    fn validate_endpoints(&self) -> Result<(), CommError> {
        for (rank, endpoint) in self.group.ranks.iter().enumerate() {
            Transport::parse(endpoint)
                .map_err(|e| CommError::Config(format!("rank {rank}: {e}")))?;
        }
        Ok(())
    }

    /// Compare parsed transports, so two spellings of one socket collide.
    fn validate_unique_endpoints(&self) -> Result<(), CommError> {
        let mut seen = HashSet::new();
        for rank in 0..self.size() {
            let transport = self.transport_for(rank)?;
            if !seen.insert(transport.clone()) {
                return Err(CommError::Config(format!(
                    "rank {rank} reuses endpoint '{transport}'"
                )));
            }
        }
        Ok(())
    }
}
