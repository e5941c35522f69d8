//! Simulated location provider
//!
//! Reports a fixed starting coordinate and, while watched, walks it north by
//! a fixed step on every interval. Used by the CLI when no platform bridge is
//! present.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use vigil_core::effects::{
    LocationEffects, LocationError, PermissionEffects, PhysicalTimeEffects, PositionWatch,
};
use vigil_core::{Coordinate, PermissionStatus, SubscriptionHandle, WatchOptions};

/// Metres per degree of latitude (mean)
const METRES_PER_DEGREE_LAT: f64 = 111_320.0;

/// Simulated position provider walking north on each watch callback
#[derive(Clone)]
pub struct SimulatedLocationHandler {
    position: Arc<Mutex<Coordinate>>,
    permission: PermissionStatus,
    step_m: f64,
    clock: Arc<dyn PhysicalTimeEffects>,
}

impl SimulatedLocationHandler {
    /// Provider at `origin` with location permission granted
    pub fn new(origin: Coordinate, clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self {
            position: Arc::new(Mutex::new(origin)),
            permission: PermissionStatus::Granted,
            step_m: 5.0,
            clock,
        }
    }

    /// Answer permission prompts with `permission`
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    /// Distance walked per watch callback
    pub fn with_step_m(mut self, step_m: f64) -> Self {
        self.step_m = step_m;
        self
    }

    fn advance(&self) -> Coordinate {
        let mut position = self.position.lock();
        position.latitude = (position.latitude + self.step_m / METRES_PER_DEGREE_LAT).min(90.0);
        *position
    }
}

impl std::fmt::Debug for SimulatedLocationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedLocationHandler")
            .field("position", &*self.position.lock())
            .field("permission", &self.permission)
            .field("step_m", &self.step_m)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PermissionEffects for SimulatedLocationHandler {
    async fn request_location_permission(&self) -> PermissionStatus {
        self.permission
    }
}

#[async_trait]
impl LocationEffects for SimulatedLocationHandler {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        if !self.permission.is_granted() {
            return Err(LocationError::PermissionDenied);
        }
        Ok(*self.position.lock())
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<PositionWatch, LocationError> {
        if !self.permission.is_granted() {
            return Err(LocationError::PermissionDenied);
        }
        let (sender, receiver) = mpsc::channel(8);
        let (handle, mut signal) = SubscriptionHandle::new();
        let provider = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = signal.cancelled() => break,
                    _ = provider.clock.sleep_ms(options.interval_ms) => {}
                }
                let next = provider.advance();
                if sender.send(next).await.is_err() {
                    break;
                }
            }
            tracing::debug!("simulated position watch stopped");
        });

        Ok(PositionWatch::new(receiver, handle))
    }
}
