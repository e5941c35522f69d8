//! Mock effects implementation for SOS flow testing
//!
//! `MockEffects` implements every collaborator trait with deterministic,
//! inspectable behaviour:
//!
//! - Seeded ChaCha20 RNG for session ids
//! - Simulated clock driven by tokio's (pausable) timer
//! - In-memory document store shared by every clone
//! - Injectable failures per capability (permission, location, watch,
//!   battery, SMS, individual chat threads, whole collections)
//! - Recorders for haptic pulses, SMS batches and user notices
//! - Position watches driven explicitly with [`MockEffects::push_position`]
//!
//! # Blocking Lock Usage
//!
//! Uses `std::sync::Mutex`; the lock is never held across an `.await`.

use async_trait::async_trait;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;
use vigil_core::effects::{
    BatteryEffects, Document, DocumentFilter, DocumentStoreEffects, DocumentSubscription,
    HapticEffects, LocationEffects, LocationError, NoticeEffects, PermissionEffects,
    PhysicalTimeEffects, PositionWatch, RandomEffects, SmsEffects, SmsError, SmsSendStatus,
    TimeError, UserNotice,
};
use vigil_core::{
    CancelSignal, Coordinate, PermissionStatus, PhysicalTime, Result, SubscriptionHandle,
    VigilError, WatchOptions,
};
use vigil_effects::{MemoryDocumentHandler, SimulatedTimeHandler};

/// Coordinate reported until a test moves the device
pub const DEFAULT_POSITION: Coordinate = Coordinate::new(12.9, 77.6);

const WATCH_BUFFER: usize = 16;

/// One recorded SMS send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsBatch {
    /// Phone numbers in the batch
    pub recipients: Vec<String>,
    /// Message body
    pub body: String,
}

struct ActiveWatch {
    sender: mpsc::Sender<Coordinate>,
    signal: CancelSignal,
    options: WatchOptions,
}

struct MockState {
    rng: ChaCha20Rng,
    position: Coordinate,
    permission: PermissionStatus,
    location_failure: Option<LocationError>,
    watch_failure: Option<LocationError>,
    battery: Option<f32>,
    battery_delay_ms: Option<u64>,
    sms_available: bool,
    sms_failure: Option<SmsError>,
    failing_threads: HashSet<String>,
    failing_collections: HashSet<String>,
    watches: Vec<ActiveWatch>,
    permission_requests: usize,
    haptic_pulses: Vec<u64>,
    sms_batches: Vec<SmsBatch>,
    notices: Vec<UserNotice>,
}

/// Deterministic implementation of every Vigil effect trait
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect another.
#[derive(Clone)]
pub struct MockEffects {
    state: Arc<Mutex<MockState>>,
    clock: SimulatedTimeHandler,
    store: MemoryDocumentHandler,
}

impl std::fmt::Debug for MockEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEffects")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for MockEffects {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl MockEffects {
    /// Mock effects with a fixed seed, full battery, SMS available and
    /// location permission granted
    pub fn deterministic() -> Self {
        Self::with_seed([42; 32])
    }

    /// Mock effects with a specific RNG seed
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let clock = SimulatedTimeHandler::default();
        Self {
            state: Arc::new(Mutex::new(MockState {
                rng: ChaCha20Rng::from_seed(seed),
                position: DEFAULT_POSITION,
                permission: PermissionStatus::Granted,
                location_failure: None,
                watch_failure: None,
                battery: Some(1.0),
                battery_delay_ms: None,
                sms_available: true,
                sms_failure: None,
                failing_threads: HashSet::new(),
                failing_collections: HashSet::new(),
                watches: Vec::new(),
                permission_requests: 0,
                haptic_pulses: Vec::new(),
                sms_batches: Vec::new(),
                notices: Vec::new(),
            })),
            clock,
            store: MemoryDocumentHandler::with_clock(Arc::new(clock)),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    // ----- configuration -----

    /// Answer permission prompts with `permission`
    pub fn set_permission(&self, permission: PermissionStatus) {
        self.with_state(|s| s.permission = permission);
    }

    /// Report `position` from now on
    pub fn set_position(&self, position: Coordinate) {
        self.with_state(|s| s.position = position);
    }

    /// Make one-shot position reads fail
    pub fn fail_location(&self, error: LocationError) {
        self.with_state(|s| s.location_failure = Some(error));
    }

    /// Make opening a position watch fail
    pub fn fail_watch(&self, error: LocationError) {
        self.with_state(|s| s.watch_failure = Some(error));
    }

    /// Battery fraction to report; `None` for an unsupported device
    pub fn set_battery(&self, level: Option<f32>) {
        self.with_state(|s| s.battery = level);
    }

    /// Delay battery reads by `ms` on the simulated clock
    pub fn delay_battery(&self, ms: u64) {
        self.with_state(|s| s.battery_delay_ms = Some(ms));
    }

    /// Toggle the SMS availability check
    pub fn set_sms_available(&self, available: bool) {
        self.with_state(|s| s.sms_available = available);
    }

    /// Make SMS sends fail
    pub fn fail_sms(&self, error: SmsError) {
        self.with_state(|s| s.sms_failure = Some(error));
    }

    /// Make every write touching chat thread `thread_id` fail
    pub fn fail_thread(&self, thread_id: &str) {
        self.with_state(|s| s.failing_threads.insert(thread_id.to_string()));
    }

    /// Make every write to `collection` fail
    pub fn fail_writes(&self, collection: &str) {
        self.with_state(|s| s.failing_collections.insert(collection.to_string()));
    }

    /// Let writes to `collection` succeed again
    pub fn heal_writes(&self, collection: &str) {
        self.with_state(|s| s.failing_collections.remove(collection));
    }

    // ----- driving -----

    /// Move the device and deliver the position to every open watch.
    /// Returns how many watches received it.
    pub fn push_position(&self, position: Coordinate) -> usize {
        self.with_state(|s| {
            s.position = position;
            s.watches.retain(|w| !w.signal.is_cancelled());
            s.watches
                .iter()
                .filter(|w| w.sender.try_send(position).is_ok())
                .count()
        })
    }

    // ----- inspection -----

    /// The backing document store
    pub fn store(&self) -> &MemoryDocumentHandler {
        &self.store
    }

    /// The simulated clock
    pub fn clock(&self) -> SimulatedTimeHandler {
        self.clock
    }

    /// Current simulated time
    pub fn now(&self) -> PhysicalTime {
        self.clock.now()
    }

    /// Position watches that have not been cancelled
    pub fn active_watches(&self) -> usize {
        self.with_state(|s| s.watches.iter().filter(|w| !w.signal.is_cancelled()).count())
    }

    /// Options passed to the most recent watch
    pub fn last_watch_options(&self) -> Option<WatchOptions> {
        self.with_state(|s| s.watches.last().map(|w| w.options))
    }

    /// How many permission prompts were shown
    pub fn permission_requests(&self) -> usize {
        self.with_state(|s| s.permission_requests)
    }

    /// Durations of every vibration, in order
    pub fn haptic_pulses(&self) -> Vec<u64> {
        self.with_state(|s| s.haptic_pulses.clone())
    }

    /// Every SMS batch sent
    pub fn sms_batches(&self) -> Vec<SmsBatch> {
        self.with_state(|s| s.sms_batches.clone())
    }

    /// Every notice shown to the user
    pub fn notices(&self) -> Vec<UserNotice> {
        self.with_state(|s| s.notices.clone())
    }

    fn check_write(&self, collection: &str, id: Option<&str>) -> Result<()> {
        self.with_state(|s| {
            if s.failing_collections.contains(collection) {
                return Err(VigilError::unreachable(format!(
                    "injected failure writing {collection}"
                )));
            }
            let thread = match id {
                Some(id) if collection == "chats" => Some(id),
                _ => collection
                    .strip_prefix("chats/")
                    .and_then(|rest| rest.strip_suffix("/messages")),
            };
            match thread {
                Some(thread) if s.failing_threads.contains(thread) => Err(VigilError::unreachable(
                    format!("injected failure writing thread {thread}"),
                )),
                _ => Ok(()),
            }
        })
    }
}

#[async_trait]
impl PhysicalTimeEffects for MockEffects {
    async fn physical_time(&self) -> std::result::Result<PhysicalTime, TimeError> {
        self.clock.physical_time().await
    }

    async fn sleep_ms(&self, ms: u64) {
        self.clock.sleep_ms(ms).await;
    }
}

#[async_trait]
impl RandomEffects for MockEffects {
    async fn random_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.with_state(|s| s.rng.fill_bytes(&mut bytes));
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

#[async_trait]
impl PermissionEffects for MockEffects {
    async fn request_location_permission(&self) -> PermissionStatus {
        self.with_state(|s| {
            s.permission_requests += 1;
            s.permission
        })
    }
}

#[async_trait]
impl LocationEffects for MockEffects {
    async fn current_position(&self) -> std::result::Result<Coordinate, LocationError> {
        self.with_state(|s| {
            if !s.permission.is_granted() {
                return Err(LocationError::PermissionDenied);
            }
            match &s.location_failure {
                Some(err) => Err(err.clone()),
                None => Ok(s.position),
            }
        })
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> std::result::Result<PositionWatch, LocationError> {
        self.with_state(|s| {
            if !s.permission.is_granted() {
                return Err(LocationError::PermissionDenied);
            }
            if let Some(err) = &s.watch_failure {
                return Err(err.clone());
            }
            let (sender, receiver) = mpsc::channel(WATCH_BUFFER);
            let (handle, signal) = SubscriptionHandle::new();
            s.watches.push(ActiveWatch {
                sender,
                signal,
                options,
            });
            Ok(PositionWatch::new(receiver, handle))
        })
    }
}

#[async_trait]
impl BatteryEffects for MockEffects {
    async fn battery_level(&self) -> Option<f32> {
        let (level, delay) = self.with_state(|s| (s.battery, s.battery_delay_ms));
        if let Some(ms) = delay {
            self.clock.sleep_ms(ms).await;
        }
        level
    }
}

#[async_trait]
impl HapticEffects for MockEffects {
    async fn vibrate(&self, duration_ms: u64) {
        self.with_state(|s| s.haptic_pulses.push(duration_ms));
    }
}

#[async_trait]
impl SmsEffects for MockEffects {
    async fn is_available(&self) -> bool {
        self.with_state(|s| s.sms_available)
    }

    async fn send_batch(
        &self,
        recipients: &[String],
        body: &str,
    ) -> std::result::Result<SmsSendStatus, SmsError> {
        self.with_state(|s| {
            if !s.sms_available {
                return Err(SmsError::Unavailable);
            }
            if let Some(err) = &s.sms_failure {
                return Err(err.clone());
            }
            if recipients.is_empty() {
                return Err(SmsError::NoRecipients);
            }
            s.sms_batches.push(SmsBatch {
                recipients: recipients.to_vec(),
                body: body.to_string(),
            });
            Ok(SmsSendStatus::Sent)
        })
    }
}

#[async_trait]
impl NoticeEffects for MockEffects {
    async fn notify(&self, notice: UserNotice) {
        self.with_state(|s| s.notices.push(notice));
    }
}

#[async_trait]
impl DocumentStoreEffects for MockEffects {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.store.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.check_write(collection, Some(id))?;
        self.store.set(collection, id, document).await
    }

    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.check_write(collection, Some(id))?;
        self.store.merge(collection, id, patch).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        self.check_write(collection, Some(id))?;
        self.store.update(collection, id, patch).await
    }

    async fn add(&self, collection: &str, document: Document) -> Result<String> {
        self.check_write(collection, None)?;
        self.store.add(collection, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.check_write(collection, Some(id))?;
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
