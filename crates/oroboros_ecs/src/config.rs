//! # World Configuration
//!
//! Initial capacities for a world, loaded once at startup.
//!
//! ```toml
//! entity_capacity = 65536
//! pool_capacity = 4096
//! ```
//!
//! Missing keys keep their defaults. Capacities are starting sizes only;
//! every container grows past them on demand.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Initial capacities for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Entity table slots reserved up front.
    pub entity_capacity: usize,
    /// Items reserved per component pool.
    pub pool_capacity: usize,
    /// Members reserved per filter, and filters reserved per world.
    pub filter_capacity: usize,
    /// Component links reserved per entity.
    pub entity_component_capacity: usize,
    /// Delayed operations reserved per filter.
    pub delayed_op_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 512,
            pool_capacity: 512,
            filter_capacity: 512,
            entity_component_capacity: 8,
            delayed_op_capacity: 64,
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| EcsError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| EcsError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks every capacity is non-zero and entity ids fit in 32 bits.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> EcsResult<()> {
        let fields = [
            ("entity_capacity", self.entity_capacity),
            ("pool_capacity", self.pool_capacity),
            ("filter_capacity", self.filter_capacity),
            ("entity_component_capacity", self.entity_component_capacity),
            ("delayed_op_capacity", self.delayed_op_capacity),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| *value == 0) {
            return Err(EcsError::InvalidConfig(format!("{name} must be greater than zero")));
        }
        if u32::try_from(self.entity_capacity).is_err() {
            return Err(EcsError::InvalidConfig(format!(
                "entity_capacity {} exceeds the 32-bit entity id space",
                self.entity_capacity
            )));
        }
        Ok(())
    }
}
