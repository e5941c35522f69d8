//! Battery level effect trait

use async_trait::async_trait;

/// Device battery level provider
#[async_trait]
pub trait BatteryEffects: Send + Sync {
    /// Battery level as a fraction in `0.0..=1.0`, or `None` when the
    /// platform cannot report it.
    ///
    /// Implementations may be slow; callers bound the wait themselves.
    async fn battery_level(&self) -> Option<f32>;
}

#[async_trait]
impl<T: BatteryEffects + ?Sized> BatteryEffects for std::sync::Arc<T> {
    async fn battery_level(&self) -> Option<f32> {
        (**self).battery_level().await
    }
}
