//! Composite host handler
//!
//! Bundles one handler per effect trait so a single value satisfies
//! `SosEffects`. Used by the CLI; tests use `vigil-testkit::MockEffects`.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use vigil_core::effects::{
    BatteryEffects, Document, DocumentFilter, DocumentStoreEffects, DocumentSubscription,
    HapticEffects, LocationEffects, LocationError, NoticeEffects, PermissionEffects,
    PhysicalTimeEffects, PositionWatch, RandomEffects, SmsEffects, SmsError, SmsSendStatus,
    TimeError, UserNotice,
};
use vigil_core::{Coordinate, PermissionStatus, PhysicalTime, Result, WatchOptions};

use crate::device::{
    LoggingHapticHandler, LoggingSmsHandler, StaticBatteryHandler, TracingNoticeHandler,
};
use crate::document::MemoryDocumentHandler;
use crate::location::SimulatedLocationHandler;
use crate::random::RealRandomHandler;
use crate::time::RealTimeHandler;

/// One handler per collaborator, wired for a host without a phone attached
#[derive(Debug, Clone)]
pub struct HostEffects {
    time: RealTimeHandler,
    random: RealRandomHandler,
    location: SimulatedLocationHandler,
    battery: StaticBatteryHandler,
    haptics: LoggingHapticHandler,
    sms: LoggingSmsHandler,
    notices: TracingNoticeHandler,
    store: MemoryDocumentHandler,
}

impl HostEffects {
    /// Host effects reporting the device at `origin` with full battery and SMS
    pub fn new(origin: Coordinate) -> Self {
        let clock: Arc<dyn PhysicalTimeEffects> = Arc::new(RealTimeHandler::new());
        Self {
            time: RealTimeHandler::new(),
            random: RealRandomHandler,
            location: SimulatedLocationHandler::new(origin, Arc::clone(&clock)),
            battery: StaticBatteryHandler::new(Some(1.0)),
            haptics: LoggingHapticHandler,
            sms: LoggingSmsHandler::default(),
            notices: TracingNoticeHandler,
            store: MemoryDocumentHandler::with_clock(clock),
        }
    }

    /// Answer location permission prompts with `permission`
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.location = self.location.with_permission(permission);
        self
    }

    /// Report a fixed battery fraction, or `None` for an unsupported device
    pub fn with_battery(mut self, level: Option<f32>) -> Self {
        self.battery = StaticBatteryHandler::new(level);
        self
    }

    /// Toggle SMS availability
    pub fn with_sms_available(mut self, available: bool) -> Self {
        self.sms = LoggingSmsHandler::new(available);
        self
    }

    /// The backing in-memory store
    pub fn store(&self) -> &MemoryDocumentHandler {
        &self.store
    }
}

#[async_trait]
impl PhysicalTimeEffects for HostEffects {
    async fn physical_time(&self) -> std::result::Result<PhysicalTime, TimeError> {
        self.time.physical_time().await
    }

    async fn sleep_ms(&self, ms: u64) {
        self.time.sleep_ms(ms).await;
    }
}

#[async_trait]
impl RandomEffects for HostEffects {
    async fn random_uuid(&self) -> Uuid {
        self.random.random_uuid().await
    }
}

#[async_trait]
impl PermissionEffects for HostEffects {
    async fn request_location_permission(&self) -> PermissionStatus {
        self.location.request_location_permission().await
    }
}

#[async_trait]
impl LocationEffects for HostEffects {
    async fn current_position(&self) -> std::result::Result<Coordinate, LocationError> {
        self.location.current_position().await
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> std::result::Result<PositionWatch, LocationError> {
        self.location.watch_position(options).await
    }
}

#[async_trait]
impl BatteryEffects for HostEffects {
    async fn battery_level(&self) -> Option<f32> {
        self.battery.battery_level().await
    }
}

#[async_trait]
impl HapticEffects for HostEffects {
    async fn vibrate(&self, duration_ms: u64) {
        self.haptics.vibrate(duration_ms).await;
    }
}

#[async_trait]
impl SmsEffects for HostEffects {
    async fn is_available(&self) -> bool {
        self.sms.is_available().await
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        body: &str,
    ) -> std::result::Result<SmsSendStatus, SmsError> {
        self.sms.send_batch(recipients, body).await
    }
}

#[async_trait]
impl NoticeEffects for HostEffects {
    async fn notify(&self, notice: UserNotice) {
        self.notices.notify(notice).await;
    }
}

#[async_trait]
impl DocumentStoreEffects for HostEffects {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.store.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.store.set(collection, id, document).await
    }

    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.store.merge(collection, id, patch).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.store.update(collection, id, patch).await
    }

    async fn add(&self, collection: &str, document: Document) -> Result<String> {
        self.store.add(collection, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.store.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<(String, Document)>> {
        self.store.query(collection, filter).await
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<DocumentSubscription> {
        self.store.subscribe(collection, id).await
    }
}
