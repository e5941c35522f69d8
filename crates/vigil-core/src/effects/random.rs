//! Randomness effect trait
//!
//! Identifier generation goes through this trait so tests can produce
//! deterministic session ids.

use async_trait::async_trait;
use uuid::Uuid;

/// Source of random identifiers
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// A fresh random UUID
    async fn random_uuid(&self) -> Uuid;
}

#[async_trait]
impl<T: RandomEffects + ?Sized> RandomEffects for std::sync::Arc<T> {
    async fn random_uuid(&self) -> Uuid {
        (**self).random_uuid().await
    }
}
