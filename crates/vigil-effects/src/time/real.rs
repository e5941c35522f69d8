//! Real time effect handler for production use

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use vigil_core::effects::{PhysicalTimeEffects, TimeError};
use vigil_core::PhysicalTime;

/// Wall clock from the operating system, sleeping on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        let since_epoch =
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| TimeError::ClockUnavailable {
                    reason: e.to_string(),
                })?;
        Ok(PhysicalTime::from_millis(since_epoch.as_millis() as u64))
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
