//! Configuration of the in-memory reference store.

use serde::Deserialize;
use std::time::Duration;

/// Configuration for [`crate::MemoryStore`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the root collection created on startup, e.g. `db` for `/db`.
    pub root_collection: String,

    /// How long to wait for a collection write lock.
    #[serde(with = "duration_millis")]
    pub lock_timeout: Duration,

    /// Maximum number of concurrently active broker sessions.
    pub max_brokers: usize,

    /// How long to wait for a free broker session.
    #[serde(with = "duration_millis")]
    pub broker_timeout: Duration,

    /// Mode bits of newly created documents.
    pub default_document_mode: u32,

    /// Mode bits of newly created collections.
    pub default_collection_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_collection: "db".to_string(),
            lock_timeout: Duration::from_secs(30),
            max_brokers: 16,
            broker_timeout: Duration::from_secs(30),
            default_document_mode: 0o644,
            default_collection_mode: 0o755,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root collection name.
    #[must_use]
    pub fn with_root_collection(mut self, name: impl Into<String>) -> Self {
        self.root_collection = name.into();
        self
    }

    /// Sets the collection lock timeout.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the broker pool size.
    #[must_use]
    pub const fn with_max_brokers(mut self, max: usize) -> Self {
        self.max_brokers = max;
        self
    }

    /// Sets the broker wait timeout.
    #[must_use]
    pub const fn with_broker_timeout(mut self, timeout: Duration) -> Self {
        self.broker_timeout = timeout;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.root_collection, "db");
        assert_eq!(config.default_document_mode, 0o644);
        assert_eq!(config.default_collection_mode, 0o755);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .with_root_collection("replica")
            .with_lock_timeout(Duration::from_millis(50))
            .with_max_brokers(2);

        assert_eq!(config.root_collection, "replica");
        assert_eq!(config.lock_timeout, Duration::from_millis(50));
        assert_eq!(config.max_brokers, 2);
    }
}
