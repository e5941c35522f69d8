//! Live location sessions
//!
//! A session is one `liveLocations` record that follows the device for a
//! fixed duration. The manager owns at most one session at a time:
//!
//! 1. `start` writes the record and opens a position watch
//! 2. a publisher task overwrites the coordinate as the device moves
//! 3. an expiry task ends the session at `expiresAt`
//! 4. `stop`, expiry, `shutdown` and drop all funnel into the same
//!    take-once cleanup, so the record is deleted exactly once
//!
//! The expiry is fixed at creation and never extended.

use parking_lot::Mutex;
use std::sync::Arc;
use vigil_core::effects::{LiveLocationEffects, LocationError, PositionWatch};
use vigil_core::{
    CancelSignal, Coordinate, LiveSessionId, PhysicalTime, SubscriptionHandle, UserId,
    WatchOptions,
};

use crate::config::SosConfig;
use crate::error::{SosError, SosResult};
use crate::geo::haversine_distance_m;
use crate::records::{LiveLocationRecord, LIVE_LOCATIONS};

/// Public view of the running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSession {
    /// Session id, also the record id
    pub id: LiveSessionId,
    /// When the session was created
    pub created_at: PhysicalTime,
    /// When the session ends on its own
    pub expires_at: PhysicalTime,
}

struct ActiveSession {
    session: LiveSession,
    // Stops the publisher and expiry tasks
    handle: SubscriptionHandle,
}

struct ManagerInner<E> {
    effects: Arc<E>,
    user_id: UserId,
    watch: WatchOptions,
    share_base_url: String,
    active: Mutex<Option<ActiveSession>>,
}

/// Starts, publishes and ends live-location sessions for one user
pub struct LiveLocationManager<E: LiveLocationEffects + 'static> {
    inner: Arc<ManagerInner<E>>,
}

impl<E: LiveLocationEffects + 'static> std::fmt::Debug for LiveLocationManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveLocationManager")
            .field("user_id", &self.inner.user_id)
            .field("active", &self.current_session())
            .finish_non_exhaustive()
    }
}

pub(crate) fn location_failure(err: LocationError) -> SosError {
    match err {
        LocationError::PermissionDenied => SosError::PermissionDenied("location".to_string()),
        other => SosError::LocationUnavailable(other.to_string()),
    }
}

impl<E: LiveLocationEffects + 'static> LiveLocationManager<E> {
    /// Manager sharing `user_id`'s location
    pub fn new(effects: Arc<E>, user_id: UserId, config: &SosConfig) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                effects,
                user_id,
                watch: config.location_watch.clone().into(),
                share_base_url: config.message.live_share_base_url.clone(),
                active: Mutex::new(None),
            }),
        }
    }

    /// Open a session lasting `duration_secs`, replacing any running one.
    ///
    /// Fails with `PermissionDenied` or `LocationUnavailable` before anything
    /// is written, and with `SessionCreateFailed` when the record or the
    /// position watch cannot be established. A half-created record is
    /// removed before returning.
    pub async fn start(&self, duration_secs: u64) -> SosResult<LiveSessionId> {
        let effects = &self.inner.effects;
        if !effects.request_location_permission().await.is_granted() {
            return Err(SosError::PermissionDenied("location".to_string()));
        }

        self.shutdown().await;

        let coordinate = effects.current_position().await.map_err(location_failure)?;
        let created_at = effects
            .physical_time()
            .await
            .map_err(|e| SosError::SessionCreateFailed(e.to_string()))?;
        let session = LiveSession {
            id: LiveSessionId::from_uuid(effects.random_uuid().await),
            created_at,
            expires_at: created_at.plus_secs(duration_secs),
        };
        let record = LiveLocationRecord {
            session_id: session.id,
            user_id: self.inner.user_id.clone(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            created_at: created_at.ts_ms,
            expires_at: session.expires_at.ts_ms,
            updated_at: created_at.ts_ms,
        };

        let key = session.id.to_string();
        let document = record
            .to_document()
            .map_err(|e| SosError::SessionCreateFailed(e.to_string()))?;
        effects
            .set(LIVE_LOCATIONS, &key, document)
            .await
            .map_err(|e| SosError::SessionCreateFailed(e.to_string()))?;

        let watch = match effects.watch_position(self.inner.watch).await {
            Ok(watch) => watch,
            Err(err) => {
                self.inner.delete_record(session.id).await;
                return Err(SosError::SessionCreateFailed(format!(
                    "position watch unavailable: {err}"
                )));
            }
        };

        let (handle, signal) = SubscriptionHandle::new();
        let displaced = self.inner.active.lock().replace(ActiveSession {
            session,
            handle,
        });
        if let Some(displaced) = displaced {
            // A concurrent start won the race to install; retire its session.
            displaced.handle.cancel();
            self.inner.delete_record(displaced.session.id).await;
        }

        tokio::spawn(publish_positions(
            Arc::clone(&self.inner),
            session.id,
            watch,
            signal.clone(),
            coordinate,
            created_at.ts_ms,
        ));
        tokio::spawn(expire_session(
            Arc::clone(&self.inner),
            session.id,
            created_at.millis_until(session.expires_at),
            signal,
        ));

        tracing::info!(
            session = %session.id,
            expires_at = session.expires_at.ts_ms,
            "live location session started"
        );
        Ok(session.id)
    }

    /// End session `id`. Returns `false` when it was already ended, by an
    /// earlier stop or by expiry; never fails.
    pub async fn stop(&self, id: LiveSessionId) -> bool {
        let ended = self.inner.end_session(Some(id)).await;
        if ended {
            tracing::info!(session = %id, "live location session stopped");
        }
        ended
    }

    /// End whatever session is running. Returns whether there was one.
    pub async fn shutdown(&self) -> bool {
        self.inner.end_session(None).await
    }

    /// The running session, if any
    pub fn current_session(&self) -> Option<LiveSession> {
        self.inner.active.lock().as_ref().map(|active| active.session)
    }

    /// Link viewers open to follow session `id`
    pub fn share_link(&self, id: LiveSessionId) -> String {
        format!("{}{}", self.inner.share_base_url, id)
    }
}

impl<E: LiveLocationEffects + 'static> Drop for LiveLocationManager<E> {
    fn drop(&mut self) {
        let Some(active) = self.inner.active.lock().take() else {
            return;
        };
        active.handle.cancel();

        let id = active.session.id;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move { inner.delete_record(id).await });
            }
            Err(_) => {
                tracing::warn!(session = %id, "no runtime to delete live location record on drop");
            }
        }
    }
}

impl<E: LiveLocationEffects + 'static> ManagerInner<E> {
    /// Take the matching session (any session when `id` is `None`), stop its
    /// tasks and delete its record. Only the caller that takes it cleans up.
    async fn end_session(&self, id: Option<LiveSessionId>) -> bool {
        let taken = {
            let mut active = self.active.lock();
            match (active.as_ref(), id) {
                (Some(current), Some(id)) if current.session.id != id => None,
                _ => active.take(),
            }
        };
        let Some(active) = taken else {
            return false;
        };
        active.handle.cancel();
        self.delete_record(active.session.id).await;
        true
    }

    async fn delete_record(&self, id: LiveSessionId) {
        match self.effects.delete(LIVE_LOCATIONS, &id.to_string()).await {
            Ok(true) => tracing::debug!(session = %id, "live location record deleted"),
            Ok(false) => tracing::debug!(session = %id, "live location record already gone"),
            Err(err) => {
                tracing::warn!(session = %id, error = %err, "failed to delete live location record");
            }
        }
    }
}

async fn publish_positions<E: LiveLocationEffects + 'static>(
    inner: Arc<ManagerInner<E>>,
    id: LiveSessionId,
    mut watch: PositionWatch,
    mut signal: CancelSignal,
    mut last_written: Coordinate,
    mut last_write_ms: u64,
) {
    let key = id.to_string();
    let WatchOptions {
        interval_ms,
        distance_filter_m,
    } = inner.watch;

    loop {
        let update = tokio::select! {
            biased;
            _ = signal.cancelled() => None,
            update = watch.next() => update,
        };
        let Some(coordinate) = update else { break };

        let now = match inner.effects.physical_time().await {
            Ok(now) => now.ts_ms,
            Err(err) => {
                tracing::warn!(session = %id, error = %err, "clock unavailable, dropping update");
                continue;
            }
        };
        let moved_m = haversine_distance_m(last_written, coordinate);
        if moved_m < distance_filter_m && now.saturating_sub(last_write_ms) < interval_ms {
            continue;
        }
        if signal.is_cancelled() {
            break;
        }

        let patch = LiveLocationRecord::position_patch(coordinate, now);
        match inner.effects.update(LIVE_LOCATIONS, &key, patch).await {
            Ok(()) => {
                last_written = coordinate;
                last_write_ms = now;
                tracing::debug!(session = %id, %coordinate, moved_m, "live location published");
            }
            Err(err) => {
                tracing::warn!(session = %id, error = %err, "live location update failed");
            }
        }
    }

    watch.cancel();
    tracing::debug!(session = %id, "live location publisher stopped");
}

async fn expire_session<E: LiveLocationEffects + 'static>(
    inner: Arc<ManagerInner<E>>,
    id: LiveSessionId,
    after_ms: u64,
    mut signal: CancelSignal,
) {
    let expired = tokio::select! {
        biased;
        _ = signal.cancelled() => false,
        _ = inner.effects.sleep_ms(after_ms) => true,
    };
    if expired && inner.end_session(Some(id)).await {
        tracing::info!(session = %id, "live location session expired");
    }
}
