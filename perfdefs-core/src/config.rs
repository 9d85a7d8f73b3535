//! Configuration of definition managers.

use crate::error::{DefinitionsError, Result};
use crate::manager::MAX_HASH_TABLE_POWER;
use serde::{Deserialize, Serialize};

/// Default arena capacity in bytes.
pub const DEFAULT_ARENA_CAPACITY: u64 = 16_384_000;

/// Default hash table power (256 buckets per hashed kind).
pub const DEFAULT_HASH_TABLE_POWER: u32 = 8;

/// Environment variable holding the arena capacity.
pub const ENV_TOTAL_MEMORY: &str = "PERFDEFS_TOTAL_MEMORY";

/// Environment variable holding the hash table power.
pub const ENV_HASH_TABLE_POWER: &str = "PERFDEFS_HASH_TABLE_POWER";

/// Sizing of a definition manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Bytes available to each manager's arena.
    pub arena_capacity: u64,
    /// Each hashed kind gets `1 << hash_table_power` buckets.
    pub hash_table_power: u32,
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            hash_table_power: DEFAULT_HASH_TABLE_POWER,
        }
    }
}

impl DefinitionsConfig {
    /// Set the arena capacity.
    #[must_use]
    pub fn with_arena_capacity(mut self, bytes: u64) -> Self {
        self.arena_capacity = bytes;
        self
    }

    /// Set the hash table power.
    #[must_use]
    pub fn with_hash_table_power(mut self, power: u32) -> Self {
        self.hash_table_power = power;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PERFDEFS_TOTAL_MEMORY`: arena capacity in bytes, optionally with a
    ///   `k`, `M` or `G` suffix
    /// - `PERFDEFS_HASH_TABLE_POWER`: hash table power, at most 15
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_TOTAL_MEMORY) {
            match parse_memory_size(&value) {
                Some(bytes) => config.arena_capacity = bytes,
                None => tracing::warn!(
                    variable = ENV_TOTAL_MEMORY,
                    value = %value,
                    "Ignoring unparsable memory size"
                ),
            }
        }

        if let Some(value) = lookup(ENV_HASH_TABLE_POWER) {
            match value.trim().parse::<u32>() {
                Ok(power) if power <= MAX_HASH_TABLE_POWER => config.hash_table_power = power,
                _ => tracing::warn!(
                    variable = ENV_HASH_TABLE_POWER,
                    value = %value,
                    "Ignoring invalid hash table power"
                ),
            }
        }

        config
    }

    /// Check that the configuration can be used to build a manager.
    pub fn validate(&self) -> Result<()> {
        if self.hash_table_power > MAX_HASH_TABLE_POWER {
            return Err(DefinitionsError::InvalidConfig {
                field: "hash_table_power",
                cause: format!(
                    "{} exceeds the maximum of {}",
                    self.hash_table_power, MAX_HASH_TABLE_POWER
                ),
            });
        }
        if self.arena_capacity == 0 {
            return Err(DefinitionsError::InvalidConfig {
                field: "arena_capacity",
                cause: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_memory_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last()? {
        (index, 'k' | 'K') => (&value[..index], 1024),
        (index, 'm' | 'M') => (&value[..index], 1024 * 1024),
        (index, 'g' | 'G') => (&value[..index], 1024 * 1024 * 1024),
        _ => (value, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}
