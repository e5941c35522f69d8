//! Location and permission effect traits
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `vigil-effects` (simulated), platform bridges
//! - **Usage**: SOS trigger gating, live-location sessions

use crate::subscription::{CancelSignal, SubscriptionHandle};
use crate::types::{Coordinate, PermissionStatus, WatchOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Error type for location operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location services disabled")]
    ServicesDisabled,
    #[error("Position unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("Timed out acquiring position")]
    Timeout,
}

/// Runtime permission prompts
#[async_trait]
pub trait PermissionEffects: Send + Sync {
    /// Ask for foreground location permission, prompting if needed
    async fn request_location_permission(&self) -> PermissionStatus;
}

/// Position provider
#[async_trait]
pub trait LocationEffects: Send + Sync {
    /// One-shot current position
    async fn current_position(&self) -> Result<Coordinate, LocationError>;

    /// Start periodic position callbacks at a provider-chosen cadence near
    /// `options`. Callbacks stop when the returned watch is cancelled or
    /// dropped.
    async fn watch_position(&self, options: WatchOptions) -> Result<PositionWatch, LocationError>;
}

/// A running periodic position subscription
#[derive(Debug)]
pub struct PositionWatch {
    updates: mpsc::Receiver<Coordinate>,
    handle: SubscriptionHandle,
    signal: CancelSignal,
}

impl PositionWatch {
    /// Wrap a provider channel and the handle that stops the provider
    pub fn new(updates: mpsc::Receiver<Coordinate>, handle: SubscriptionHandle) -> Self {
        let signal = handle.signal();
        Self {
            updates,
            handle,
            signal,
        }
    }

    /// Next position, or `None` once the watch is cancelled or the provider
    /// has stopped
    pub async fn next(&mut self) -> Option<Coordinate> {
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => None,
            update = self.updates.recv() => update,
        }
    }

    /// Stop callbacks. Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        self.handle.cancel()
    }

    /// Whether the watch has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

#[async_trait]
impl<T: PermissionEffects + ?Sized> PermissionEffects for std::sync::Arc<T> {
    async fn request_location_permission(&self) -> PermissionStatus {
        (**self).request_location_permission().await
    }
}

#[async_trait]
impl<T: LocationEffects + ?Sized> LocationEffects for std::sync::Arc<T> {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        (**self).current_position().await
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<PositionWatch, LocationError> {
        (**self).watch_position(options).await
    }
}
