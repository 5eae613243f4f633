//! The entry point fed by the message substrate.

use crate::error::{ReplicationError, ReplicationResult};
use crate::replicator::{log_failure, Replicator};
use docrepl_protocol::{Decoder, TransportMessage};
use docrepl_store::Subject;
use tracing::{debug, Level};

/// Decodes inbound messages and applies them as the configured account.
///
/// Every failure is logged and returned unchanged; the caller decides
/// whether to redeliver.
pub struct MessageListener {
    decoder: Decoder,
    replicator: Replicator,
    subject: Subject,
}

impl MessageListener {
    /// Creates a listener acting as the replicator's configured account.
    ///
    /// # Errors
    ///
    /// Fails with `PermissionResolution` if the account does not exist.
    pub fn new(replicator: Replicator) -> ReplicationResult<Self> {
        let config = replicator.config();
        let subject = replicator.subject_for(&config.acting_account)?;
        let decoder = Decoder::new(config.decoder.clone());

        Ok(Self {
            decoder,
            replicator,
            subject,
        })
    }

    /// The subject changes are applied as.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// The underlying replicator.
    #[must_use]
    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Fails with `Decode` if the message is malformed, or with the error of
    /// applying the decoded change.
    pub fn on_message(&self, message: &dyn TransportMessage) -> ReplicationResult<()> {
        let envelope = match self.decoder.decode(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = ReplicationError::from(e);
                log_failure(&err, None);
                return Err(err);
            }
        };

        if tracing::enabled!(Level::DEBUG) {
            debug!(report = %envelope.report(), "received change");
        }
        self.replicator.apply(&envelope, &self.subject)
    }
}
