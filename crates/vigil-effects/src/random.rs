//! Random effect handler

use async_trait::async_trait;
use uuid::Uuid;
use vigil_core::effects::RandomEffects;

/// UUID v4 generator backed by the OS RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RealRandomHandler;

#[async_trait]
impl RandomEffects for RealRandomHandler {
    async fn random_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}
