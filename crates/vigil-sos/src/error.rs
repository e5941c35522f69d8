//! SOS flow error taxonomy
//!
//! Only [`SosError::PermissionDenied`] and [`SosError::LocationUnavailable`]
//! abort a trigger. The remaining variants describe failures that the flow
//! folds into its result and reports without stopping.

use thiserror::Error;
use vigil_core::ThreadId;

/// Errors from the SOS coordination flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SosError {
    /// Location (or an SMS-adjacent) permission was refused.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The device coordinate could not be acquired.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// Battery level could not be read; callers default it.
    #[error("battery level unavailable")]
    BatteryUnavailable,

    /// The live-location record could not be written.
    #[error("live location session could not be created: {0}")]
    SessionCreateFailed(String),

    /// The SMS capability is not present on this device.
    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// Appending the alert to one chat thread failed.
    #[error("write to thread {thread_id} failed: {reason}")]
    ThreadWriteFailed {
        /// Thread that could not be written
        thread_id: ThreadId,
        /// Underlying failure
        reason: String,
    },

    /// An audit or profile write after dispatch failed.
    #[error("write to {collection} failed: {reason}")]
    RecordWriteFailed {
        /// Collection that could not be written
        collection: String,
        /// Underlying failure
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SosError {
    /// Whether this error aborts a trigger before dispatch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::LocationUnavailable(_) | Self::Config(_)
        )
    }
}

/// Result type for SOS operations
pub type SosResult<T> = std::result::Result<T, SosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_abort_conditions_are_fatal() {
        assert!(SosError::PermissionDenied("location".into()).is_fatal());
        assert!(SosError::LocationUnavailable("timeout".into()).is_fatal());
        assert!(!SosError::BatteryUnavailable.is_fatal());
        assert!(!SosError::SessionCreateFailed("offline".into()).is_fatal());
        assert!(!SosError::ChannelUnavailable("sms".into()).is_fatal());
        assert!(!SosError::ThreadWriteFailed {
            thread_id: ThreadId::new("t1"),
            reason: "offline".into(),
        }
        .is_fatal());
    }

    #[test]
    fn error_display_names_the_thread() {
        let err = SosError::ThreadWriteFailed {
            thread_id: ThreadId::new("thread-7"),
            reason: "quota".into(),
        };
        assert!(err.to_string().contains("thread-7"));
        assert!(err.to_string().contains("quota"));
    }
}
