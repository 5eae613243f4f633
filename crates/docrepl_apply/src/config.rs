//! Configuration for the apply path.

use docrepl_protocol::DecoderConfig;
use docrepl_store::Subject;
use serde::Deserialize;

/// Configuration for [`crate::Replicator`] and [`crate::MessageListener`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    /// Message decoding limits.
    pub decoder: DecoderConfig,
    /// Largest accepted decompressed payload in bytes.
    pub max_decompressed_bytes: u64,
    /// Account the listener applies changes as.
    pub acting_account: String,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            max_decompressed_bytes: 256 * 1024 * 1024,
            acting_account: Subject::SYSTEM_ACCOUNT.to_string(),
        }
    }
}

impl ApplyConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decoder configuration.
    #[must_use]
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    /// Sets the decompressed payload limit.
    #[must_use]
    pub fn with_max_decompressed_bytes(mut self, limit: u64) -> Self {
        self.max_decompressed_bytes = limit;
        self
    }

    /// Sets the acting account.
    #[must_use]
    pub fn with_acting_account(mut self, account: impl Into<String>) -> Self {
        self.acting_account = account.into();
        self
    }
}
