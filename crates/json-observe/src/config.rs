//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default cap on checkpoint passes.
pub const MAX_DIRTY_CHECK_CYCLES: usize = 1000;

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on passes per checkpoint and on re-checks per `deliver`.
    pub max_dirty_check_cycles: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_dirty_check_cycles: MAX_DIRTY_CHECK_CYCLES,
        }
    }
}

impl EngineConfig {
    /// Builder method to set the cycle cap. Zero is treated as one.
    #[must_use]
    pub fn with_max_dirty_check_cycles(mut self, cycles: usize) -> Self {
        self.max_dirty_check_cycles = cycles.max(1);
        self
    }

    /// Parses a JSON config object; missing fields take their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use json_observe::EngineConfig;
    ///
    /// let config = EngineConfig::from_json_str(r#"{"max_dirty_check_cycles": 5}"#).unwrap();
    /// assert_eq!(config.max_dirty_check_cycles, 5);
    /// assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    /// ```
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        if config.max_dirty_check_cycles == 0 {
            return Err(ConfigError::ZeroCycles);
        }
        Ok(config)
    }
}
