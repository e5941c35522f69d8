//! Time effect traits
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `vigil-effects`
//! - **Usage**: countdown ticks, session expiry, battery timeouts, timestamps
//!
//! Every timer in the SOS flow goes through [`PhysicalTimeEffects::sleep_ms`]
//! so the countdown and the expiry can be driven by a paused clock in tests.

use crate::time::PhysicalTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for time operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TimeError {
    #[error("Clock unavailable: {reason}")]
    ClockUnavailable { reason: String },
    #[error("Operation failed: {reason}")]
    OperationFailed { reason: String },
}

/// Wall-clock time and sleeping
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;

    /// Suspend the calling task for `ms` milliseconds
    async fn sleep_ms(&self, ms: u64);
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        (**self).physical_time().await
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await;
    }
}
