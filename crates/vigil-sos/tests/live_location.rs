//! Live location session lifecycle under a paused clock

use assert_matches::assert_matches;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::effects::{DocumentStoreEffects, LocationError};
use vigil_core::{Coordinate, LiveSessionId, PermissionStatus, UserId, VigilError};
use vigil_sos::records::LIVE_LOCATIONS;
use vigil_sos::{
    LiveLocationManager, LiveLocationRecord, LiveLocationUpdate, LiveLocationViewer, SosConfig,
    SosError,
};
use vigil_testkit::{MockEffects, DEFAULT_POSITION};

// Roughly one metre of latitude
const METRE_LAT: f64 = 1.0 / 111_195.0;

fn manager(effects: &MockEffects) -> LiveLocationManager<MockEffects> {
    LiveLocationManager::new(
        Arc::new(effects.clone()),
        UserId::new("alice"),
        &SosConfig::default(),
    )
}

fn north_of_start(metres: f64) -> Coordinate {
    Coordinate::new(DEFAULT_POSITION.latitude + metres * METRE_LAT, DEFAULT_POSITION.longitude)
}

/// Let spawned tasks run without moving the clock meaningfully
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn record(effects: &MockEffects, id: LiveSessionId) -> Option<LiveLocationRecord> {
    effects
        .get(LIVE_LOCATIONS, &id.to_string())
        .await
        .unwrap()
        .map(|doc| LiveLocationRecord::from_document(&doc).unwrap())
}

#[tokio::test(start_paused = true)]
async fn start_writes_record_with_fixed_expiry() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);

    let id = manager.start(3_600).await.unwrap();

    let stored = record(&effects, id).await.unwrap();
    assert_eq!(stored.session_id, id);
    assert_eq!(stored.user_id, UserId::new("alice"));
    assert_eq!(stored.coordinate(), DEFAULT_POSITION);
    assert_eq!(stored.expires_at - stored.created_at, 3_600_000);
    assert_eq!(effects.active_watches(), 1);

    let options = effects.last_watch_options().unwrap();
    assert_eq!(options.interval_ms, 5_000);
    assert_eq!(manager.current_session().map(|s| s.id), Some(id));
}

#[tokio::test(start_paused = true)]
async fn stop_twice_is_harmless() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();

    assert!(manager.stop(id).await);
    assert!(!manager.stop(id).await);
    settle().await;

    assert!(record(&effects, id).await.is_none());
    assert_eq!(effects.active_watches(), 0);
    assert!(manager.current_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn expiry_cleans_up_without_explicit_stop() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(60).await.unwrap();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(record(&effects, id).await.is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(record(&effects, id).await.is_none());
    assert_eq!(effects.active_watches(), 0);
    assert!(manager.current_session().is_none());
    assert!(!manager.stop(id).await);
}

#[tokio::test(start_paused = true)]
async fn expiry_is_not_extended_by_updates() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(30).await.unwrap();
    let expires_at = record(&effects, id).await.unwrap().expires_at;

    for step in 1..=5 {
        tokio::time::sleep(Duration::from_secs(5)).await;
        effects.push_position(north_of_start(10.0 * step as f64));
        settle().await;
        assert_eq!(record(&effects, id).await.unwrap().expires_at, expires_at);
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(record(&effects, id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn small_moves_wait_for_the_interval() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();
    let created = record(&effects, id).await.unwrap();

    effects.push_position(north_of_start(0.5));
    settle().await;
    assert_eq!(record(&effects, id).await.unwrap(), created);

    let far = north_of_start(10.0);
    effects.push_position(far);
    settle().await;
    let moved = record(&effects, id).await.unwrap();
    assert_eq!(moved.coordinate(), far);

    tokio::time::sleep(Duration::from_secs(6)).await;
    effects.push_position(far);
    settle().await;
    let refreshed = record(&effects, id).await.unwrap();
    assert_eq!(refreshed.coordinate(), far);
    assert!(refreshed.updated_at > moved.updated_at);
}

#[tokio::test(start_paused = true)]
async fn failed_update_does_not_stop_publishing() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();

    effects.fail_writes(LIVE_LOCATIONS);
    effects.push_position(north_of_start(20.0));
    settle().await;
    effects.heal_writes(LIVE_LOCATIONS);
    assert_eq!(record(&effects, id).await.unwrap().coordinate(), DEFAULT_POSITION);

    let later = north_of_start(40.0);
    effects.push_position(later);
    settle().await;
    assert_eq!(record(&effects, id).await.unwrap().coordinate(), later);
    assert_eq!(effects.active_watches(), 1);
}

#[tokio::test(start_paused = true)]
async fn record_write_failure_opens_no_watch() {
    let effects = MockEffects::deterministic();
    effects.fail_writes(LIVE_LOCATIONS);
    let manager = manager(&effects);

    assert_matches!(manager.start(600).await, Err(SosError::SessionCreateFailed(_)));
    assert_eq!(effects.active_watches(), 0);
    assert!(manager.current_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn watch_failure_removes_the_record() {
    let effects = MockEffects::deterministic();
    effects.fail_watch(LocationError::ServicesDisabled);
    let manager = manager(&effects);

    assert_matches!(manager.start(600).await, Err(SosError::SessionCreateFailed(_)));
    assert_eq!(effects.store().count(LIVE_LOCATIONS).await, 0);
    assert!(manager.current_session().is_none());
}

#[tokio::test(start_paused = true)]
async fn denied_permission_writes_nothing() {
    let effects = MockEffects::deterministic();
    effects.set_permission(PermissionStatus::Denied);
    let manager = manager(&effects);

    assert_matches!(manager.start(600).await, Err(SosError::PermissionDenied(_)));
    assert_eq!(effects.store().count(LIVE_LOCATIONS).await, 0);
    assert_eq!(effects.active_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn restarting_replaces_the_previous_session() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);

    let first = manager.start(600).await.unwrap();
    let second = manager.start(600).await.unwrap();
    settle().await;

    assert_ne!(first, second);
    assert!(record(&effects, first).await.is_none());
    assert!(record(&effects, second).await.is_some());
    assert_eq!(effects.active_watches(), 1);
    assert!(!manager.stop(first).await);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_manager_cleans_up() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();

    drop(manager);
    settle().await;

    assert!(record(&effects, id).await.is_none());
    assert_eq!(effects.active_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn share_link_embeds_the_session_id() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();

    assert_eq!(
        manager.share_link(id),
        format!("https://vigil-live.web.app/track?session={id}")
    );
}

#[tokio::test(start_paused = true)]
async fn viewer_follows_until_the_session_ends() {
    let effects = MockEffects::deterministic();
    let manager = manager(&effects);
    let id = manager.start(600).await.unwrap();

    let mut viewer = LiveLocationViewer::follow(&effects, id).await.unwrap();
    assert_matches!(
        viewer.next().await,
        Some(LiveLocationUpdate::Moved { coordinate, .. }) if coordinate == DEFAULT_POSITION
    );

    let far = north_of_start(25.0);
    effects.push_position(far);
    assert_matches!(
        viewer.next().await,
        Some(LiveLocationUpdate::Moved { coordinate, .. }) if coordinate == far
    );

    manager.stop(id).await;
    assert_eq!(viewer.next().await, Some(LiveLocationUpdate::Ended));
    assert_eq!(viewer.next().await, None);
    assert!(!viewer.unsubscribe());
    assert_eq!(effects.store().active_subscriptions().await, 0);
}

#[tokio::test]
async fn following_an_unknown_session_is_not_found() {
    let effects = MockEffects::deterministic();
    let missing: LiveSessionId = "6f1c2a7e-3b4d-4e5f-8a9b-0c1d2e3f4a5b".parse().unwrap();
    assert_matches!(
        LiveLocationViewer::follow(&effects, missing).await,
        Err(VigilError::NotFound { .. })
    );
}
