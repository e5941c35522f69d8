//! SMS effect trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for SMS operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum SmsError {
    #[error("SMS capability unavailable")]
    Unavailable,
    #[error("No recipients")]
    NoRecipients,
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
}

/// Result reported by the platform composer after a batched send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmsSendStatus {
    /// Handed to the carrier
    Sent,
    /// Platform cannot tell whether it went out
    Unknown,
    /// User dismissed the composer
    Cancelled,
}

/// Device SMS capability
#[async_trait]
pub trait SmsEffects: Send + Sync {
    /// Whether this device can send SMS at all
    async fn is_available(&self) -> bool;

    /// Send one body to every recipient in a single batch
    async fn send_batch(&self, recipients: &[String], body: &str)
        -> Result<SmsSendStatus, SmsError>;
}

#[async_trait]
impl<T: SmsEffects + ?Sized> SmsEffects for std::sync::Arc<T> {
    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        body: &str,
    ) -> Result<SmsSendStatus, SmsError> {
        (**self).send_batch(recipients, body).await
    }
}
