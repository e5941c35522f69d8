//! Simulated time effect handler for testing and demos
//!
//! Wall-clock readings are derived from the tokio clock, so when a test runs
//! with a paused runtime, `physical_time` advances exactly as far as the
//! timers that fired.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use vigil_core::effects::{PhysicalTimeEffects, TimeError};
use vigil_core::PhysicalTime;

/// Clock starting at a fixed epoch and advancing with the tokio timer
#[derive(Debug, Clone, Copy)]
pub struct SimulatedTimeHandler {
    start_ms: u64,
    origin: Instant,
}

impl SimulatedTimeHandler {
    /// Create a clock that reads `start_ms` now
    pub fn new(start_ms: u64) -> Self {
        Self {
            start_ms,
            origin: Instant::now(),
        }
    }

    /// Current simulated time without going through the effect trait
    pub fn now(&self) -> PhysicalTime {
        PhysicalTime::from_millis(self.start_ms + self.origin.elapsed().as_millis() as u64)
    }
}

impl Default for SimulatedTimeHandler {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200_000)
    }
}

#[async_trait]
impl PhysicalTimeEffects for SimulatedTimeHandler {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(self.now())
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn physical_time_follows_paused_clock() {
        let clock = SimulatedTimeHandler::new(1_000);
        assert_eq!(clock.physical_time().await.unwrap().ts_ms, 1_000);
        clock.sleep_ms(2_500).await;
        assert_eq!(clock.physical_time().await.unwrap().ts_ms, 3_500);
    }
}
