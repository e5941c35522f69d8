//! Collaborator failures
//!
//! Handlers report through [`VigilError`]; domain crates decide which of these
//! abort a flow and which are folded into a report.

use serde::{Deserialize, Serialize};

/// Failure reported by a collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VigilError {
    /// Malformed input, document or configuration
    #[error("invalid: {message}")]
    Invalid {
        /// What was wrong
        message: String,
    },

    /// The addressed document or session does not exist
    #[error("{what} not found")]
    NotFound {
        /// The missing thing, e.g. `liveLocations/abc`
        what: String,
    },

    /// The store refused the operation for this caller
    #[error("denied: {reason}")]
    PermissionDenied {
        /// Store-provided reason
        reason: String,
    },

    /// The store could not be reached or rejected the write
    #[error("store unreachable: {reason}")]
    Unreachable {
        /// Transport or store reason
        reason: String,
    },

    /// A document could not be encoded or decoded
    #[error("encoding failed: {reason}")]
    Serialization {
        /// Decoder or encoder message
        reason: String,
    },

    /// Bug or broken local state
    #[error("internal: {message}")]
    Internal {
        /// Description
        message: String,
    },
}

impl VigilError {
    /// Malformed input
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Missing document or session
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Refused by the store
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Store offline or write rejected
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Encoding failure
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Broken local state
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Result of a collaborator call
pub type Result<T> = std::result::Result<T, VigilError>;

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
