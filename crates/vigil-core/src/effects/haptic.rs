//! Haptic feedback effect trait

use async_trait::async_trait;

/// Vibration motor
#[async_trait]
pub trait HapticEffects: Send + Sync {
    /// Fire a single vibration pulse. Fire-and-forget: a device without a
    /// motor simply ignores it.
    async fn vibrate(&self, duration_ms: u64);
}

#[async_trait]
impl<T: HapticEffects + ?Sized> HapticEffects for std::sync::Arc<T> {
    async fn vibrate(&self, duration_ms: u64) {
        (**self).vibrate(duration_ms).await;
    }
}
