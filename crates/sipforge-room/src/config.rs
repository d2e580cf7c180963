//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration applied to every room a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a round runs before the alarm forces the vote phase.
    pub round_duration: Duration,

    /// Seed for the media draw. `None` seeds from the OS, which is what
    /// production wants; tests pin a seed to make draws deterministic.
    pub rng_seed: Option<u64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            round_duration: Duration::from_secs(30),
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.round_duration, Duration::from_secs(30));
        assert!(config.rng_seed.is_none());
    }
}
