//! Prover configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which end of the chain the search grows from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    /// From the target's issuer towards its subject
    #[default]
    Forward,
    /// From the target's subject back towards its issuer
    Backward,
}

/// Search settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Search direction
    pub direction: SearchDirection,
    /// Store queries allowed per search (`None` = unbounded)
    pub max_fetches: Option<usize>,
    /// Wall-clock bound in milliseconds (`None` = unbounded)
    pub deadline_ms: Option<u64>,
}

impl ProverConfig {
    /// Set the search direction
    #[must_use]
    pub fn with_direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Limit the number of store queries
    #[must_use]
    pub fn with_max_fetches(mut self, max: usize) -> Self {
        self.max_fetches = Some(max);
        self
    }

    /// Limit the wall-clock time of a search
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The wall-clock bound, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ProverConfig::default();
        assert_eq!(config.direction, SearchDirection::Forward);
        assert_eq!(config.max_fetches, None);
        assert_eq!(config.deadline(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ProverConfig = serde_json::from_str(r#"{ "direction": "backward" }"#).unwrap();
        assert_eq!(config.direction, SearchDirection::Backward);
        assert_eq!(config.max_fetches, None);

        let config: ProverConfig = serde_json::from_str(r#"{ "max_fetches": 3, "deadline_ms": 250 }"#).unwrap();
        assert_eq!(config.max_fetches, Some(3));
        assert_eq!(config.deadline(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_builders() {
        let config = ProverConfig::default()
            .with_direction(SearchDirection::Backward)
            .with_max_fetches(10)
            .with_deadline(Duration::from_secs(2));
        assert_eq!(config.deadline_ms, Some(2000));
        assert_eq!(config.max_fetches, Some(10));
    }
}
