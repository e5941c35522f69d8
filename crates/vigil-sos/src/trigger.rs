//! SOS trigger state machine
//!
//! ```text
//! Idle --start--> CountingDown(N) --tick--> CountingDown(n-1) ... --> Dispatching --> Idle
//!        \                         \--cancel--> Idle
//!         \--trigger_now------------------------------------------> Dispatching
//! ```
//!
//! The coordinator composes three independent pieces: the [`CountdownTimer`],
//! the [`LiveLocationManager`] and the [`NotificationDispatcher`]. It owns the
//! phase, so the countdown and a dispatch can never overlap, and a second
//! trigger while one is in flight is a no-op.
//!
//! Cancelling bumps a generation counter under the state lock. Every tick
//! re-checks the generation under the same lock before it acts, so once
//! [`SosCoordinator::cancel`] returns no tick can move the machine into
//! `Dispatching`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use vigil_core::config::ConfigLoad;
use vigil_core::effects::{SosEffects, UserNotice};
use vigil_core::{CancelSignal, Coordinate, LiveSessionId, SubscriptionHandle, UserId};

use crate::config::SosConfig;
use crate::countdown::{CountdownTick, CountdownTimer};
use crate::dispatch::{DispatchResult, NotificationDispatcher};
use crate::error::{SosError, SosResult};
use crate::live_location::{location_failure, LiveLocationManager};
use crate::message::battery_percent;
use crate::records::{SosAlertRecord, UserProfile, SOS_ALERTS, USERS};
use crate::shake::{AccelerometerSample, ShakeDetector};

const OUTCOME_CAPACITY: usize = 16;

/// What started a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// The SOS button
    Manual,
    /// A detected shake gesture
    Shake,
    /// An auto-activate parameter passed by navigation
    Navigation,
}

/// Observable phase of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosPhase {
    /// Nothing in flight
    Idle,
    /// Waiting for the user to cancel
    CountingDown {
        /// Whole intervals left
        remaining: u32,
    },
    /// Gathering facts and fanning the alert out
    Dispatching,
}

impl SosPhase {
    /// Whether the machine is idle
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Explicit inputs the flow would otherwise read from global state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SosContext {
    /// The signed-in user raising alerts
    pub user_id: UserId,
    /// Whether shake gestures may start a trigger
    pub auto_activate_enabled: bool,
}

impl SosContext {
    /// Context for `user_id` with auto-activate off
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            auto_activate_enabled: false,
        }
    }

    /// Toggle auto-activate
    pub fn with_auto_activate(mut self, enabled: bool) -> Self {
        self.auto_activate_enabled = enabled;
        self
    }
}

/// How a start request was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// A countdown or dispatch is now running
    Started,
    /// A trigger was already in flight; nothing changed
    AlreadyActive,
    /// Auto-activate is switched off in the context
    Disabled,
    /// The user cancelled while the permission prompt was open
    Cancelled,
}

/// Everything a completed trigger did
#[derive(Debug, Clone, PartialEq)]
pub struct SosReport {
    /// What started it
    pub source: TriggerSource,
    /// Where the user was
    pub coordinate: Coordinate,
    /// Battery percentage included in the message
    pub battery_percent: u8,
    /// Live session opened for the alert, if one could be
    pub live_session: Option<LiveSessionId>,
    /// Id of the `sosAlerts` record, if it was written
    pub alert_id: Option<String>,
    /// Per-channel delivery
    pub dispatch: DispatchResult,
    /// Non-fatal failures outside the channels
    pub failures: Vec<SosError>,
}

/// How a trigger ended
#[derive(Debug, Clone, PartialEq)]
pub enum SosOutcome {
    /// Dispatch ran; see the report for what got through
    Sent(Box<SosReport>),
    /// The user cancelled the countdown
    Cancelled,
    /// Aborted before dispatch
    Aborted(SosError),
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Countdown,
    Immediate,
}

struct MachineState {
    phase: SosPhase,
    generation: u64,
    // A start is awaiting the permission prompt
    arming: bool,
    countdown: Option<SubscriptionHandle>,
}

struct CoordinatorInner<E: SosEffects + 'static> {
    effects: Arc<E>,
    config: SosConfig,
    context: SosContext,
    dispatcher: NotificationDispatcher,
    live: LiveLocationManager<E>,
    shake: Mutex<ShakeDetector>,
    state: Mutex<MachineState>,
    phase_tx: watch::Sender<SosPhase>,
    outcomes: broadcast::Sender<SosOutcome>,
}

/// Drives one user's SOS flow
pub struct SosCoordinator<E: SosEffects + 'static> {
    inner: Arc<CoordinatorInner<E>>,
}

impl<E: SosEffects + 'static> Clone for SosCoordinator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: SosEffects + 'static> std::fmt::Debug for SosCoordinator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SosCoordinator")
            .field("user_id", &self.inner.context.user_id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl<E: SosEffects + 'static> SosCoordinator<E> {
    /// Coordinator for `context.user_id`; rejects an invalid config
    pub fn new(effects: Arc<E>, config: SosConfig, context: SosContext) -> SosResult<Self> {
        config
            .validate()
            .map_err(|e| SosError::Config(e.to_string()))?;

        let dispatcher = NotificationDispatcher::new(&config, context.user_id.clone());
        let live = LiveLocationManager::new(Arc::clone(&effects), context.user_id.clone(), &config);
        let shake = Mutex::new(ShakeDetector::new(config.shake));
        let (phase_tx, _) = watch::channel(SosPhase::Idle);
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                effects,
                config,
                context,
                dispatcher,
                live,
                shake,
                state: Mutex::new(MachineState {
                    phase: SosPhase::Idle,
                    generation: 0,
                    arming: false,
                    countdown: None,
                }),
                phase_tx,
                outcomes,
            }),
        })
    }

    /// Begin the countdown
    pub async fn start(&self, source: TriggerSource) -> SosResult<StartDecision> {
        self.begin(source, Entry::Countdown).await
    }

    /// Skip the countdown and dispatch straight away
    pub async fn trigger_now(&self, source: TriggerSource) -> SosResult<StartDecision> {
        self.begin(source, Entry::Immediate).await
    }

    /// A shake was detected; starts the countdown only when auto-activate is on
    pub async fn on_shake(&self) -> SosResult<StartDecision> {
        if !self.inner.context.auto_activate_enabled {
            tracing::debug!("shake ignored, auto-activate disabled");
            return Ok(StartDecision::Disabled);
        }
        self.start(TriggerSource::Shake).await
    }

    /// Feed one accelerometer reading. Returns the start decision when the
    /// reading completes a shake, `None` otherwise.
    pub async fn on_motion(
        &self,
        sample: AccelerometerSample,
    ) -> SosResult<Option<StartDecision>> {
        if !self.inner.context.auto_activate_enabled {
            return Ok(None);
        }
        let shaken = self.inner.shake.lock().observe(sample);
        if !shaken {
            return Ok(None);
        }
        self.on_shake().await.map(Some)
    }

    /// Cancel a running countdown. Returns `false` when there was nothing to
    /// cancel, including once dispatch has begun.
    pub fn cancel(&self) -> bool {
        let countdown = {
            let mut state = self.inner.state.lock();
            if state.arming {
                state.arming = false;
                state.generation += 1;
                None
            } else if matches!(state.phase, SosPhase::CountingDown { .. }) {
                state.generation += 1;
                self.inner.set_phase(&mut state, SosPhase::Idle);
                state.countdown.take()
            } else {
                return false;
            }
        };
        if let Some(handle) = countdown {
            handle.cancel();
        }

        tracing::info!("sos countdown cancelled");
        self.inner.publish(SosOutcome::Cancelled);
        true
    }

    /// Current phase
    pub fn phase(&self) -> SosPhase {
        self.inner.state.lock().phase
    }

    /// Phase changes as they happen
    pub fn watch_phase(&self) -> watch::Receiver<SosPhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Outcomes of triggers that end after this call
    pub fn outcomes(&self) -> broadcast::Receiver<SosOutcome> {
        self.inner.outcomes.subscribe()
    }

    /// The live-location sessions opened by this flow
    pub fn live_sessions(&self) -> &LiveLocationManager<E> {
        &self.inner.live
    }

    /// Context the coordinator was built with
    pub fn context(&self) -> &SosContext {
        &self.inner.context
    }

    /// Tear the flow down: cancel any countdown and end the live session
    pub async fn shutdown(&self) {
        self.cancel();
        self.inner.live.shutdown().await;
    }

    async fn begin(&self, source: TriggerSource, entry: Entry) -> SosResult<StartDecision> {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.arming || !state.phase.is_idle() {
                tracing::debug!(?source, phase = ?state.phase, "sos already in flight");
                return Ok(StartDecision::AlreadyActive);
            }
            state.arming = true;
            state.generation += 1;
            state.generation
        };

        let permission = self.inner.effects.request_location_permission().await;
        if !permission.is_granted() {
            {
                let mut state = self.inner.state.lock();
                if state.generation == generation {
                    state.arming = false;
                }
            }
            let err = SosError::PermissionDenied("location".to_string());
            self.inner.report_abort(&err).await;
            return Err(err);
        }

        let countdown = {
            let mut state = self.inner.state.lock();
            if !state.arming || state.generation != generation {
                return Ok(StartDecision::Cancelled);
            }
            state.arming = false;
            match entry {
                Entry::Countdown => {
                    let (handle, signal) = SubscriptionHandle::new();
                    state.countdown = Some(handle);
                    let remaining = self.inner.config.countdown_seconds;
                    self.inner
                        .set_phase(&mut state, SosPhase::CountingDown { remaining });
                    Some(signal)
                }
                Entry::Immediate => {
                    self.inner.set_phase(&mut state, SosPhase::Dispatching);
                    None
                }
            }
        };

        let inner = Arc::clone(&self.inner);
        match countdown {
            Some(signal) => {
                tracing::info!(?source, seconds = inner.config.countdown_seconds, "sos countdown started");
                tokio::spawn(run_countdown(inner, source, generation, signal));
            }
            None => {
                tracing::info!(?source, "sos triggered without countdown");
                tokio::spawn(run_dispatch(inner, source));
            }
        }
        Ok(StartDecision::Started)
    }
}

async fn run_countdown<E: SosEffects + 'static>(
    inner: Arc<CoordinatorInner<E>>,
    source: TriggerSource,
    generation: u64,
    signal: CancelSignal,
) {
    let mut timer = CountdownTimer::new(
        Arc::clone(&inner.effects),
        inner.config.countdown_seconds,
        inner.config.tick_interval_ms,
        signal,
    );

    loop {
        let tick = timer.tick().await;
        let live = {
            let mut state = inner.state.lock();
            if state.generation != generation {
                false
            } else {
                match tick {
                    CountdownTick::Remaining(remaining) => {
                        inner.set_phase(&mut state, SosPhase::CountingDown { remaining });
                        true
                    }
                    CountdownTick::Elapsed => {
                        state.countdown = None;
                        inner.set_phase(&mut state, SosPhase::Dispatching);
                        true
                    }
                    CountdownTick::Cancelled => false,
                }
            }
        };
        if !live {
            tracing::debug!("countdown stopped");
            return;
        }

        tracing::debug!(?tick, "countdown tick");
        inner.effects.vibrate(inner.config.haptic_pulse_ms).await;
        if tick == CountdownTick::Elapsed {
            break;
        }
    }

    run_dispatch(inner, source).await;
}

async fn run_dispatch<E: SosEffects + 'static>(
    inner: Arc<CoordinatorInner<E>>,
    source: TriggerSource,
) {
    let outcome = match inner.dispatch_alert(source).await {
        Ok(report) => {
            inner.report_delivery(&report.dispatch).await;
            SosOutcome::Sent(Box::new(report))
        }
        Err(err) => {
            inner.report_abort(&err).await;
            SosOutcome::Aborted(err)
        }
    };

    {
        let mut state = inner.state.lock();
        inner.set_phase(&mut state, SosPhase::Idle);
    }
    inner.publish(outcome);
}

impl<E: SosEffects + 'static> CoordinatorInner<E> {
    fn set_phase(&self, state: &mut MachineState, phase: SosPhase) {
        state.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    fn publish(&self, outcome: SosOutcome) {
        // No subscribers is fine
        let _ = self.outcomes.send(outcome);
    }

    async fn read_battery(&self) -> Option<f32> {
        tokio::select! {
            level = self.effects.battery_level() => level,
            _ = self.effects.sleep_ms(self.config.battery_timeout_ms) => {
                tracing::debug!(timeout_ms = self.config.battery_timeout_ms, "battery read timed out");
                None
            }
        }
    }

    async fn read_profile(&self) -> UserProfile {
        match self.effects.get(USERS, self.context.user_id.as_str()).await {
            Ok(Some(document)) => UserProfile::from_document(&document),
            Ok(None) => UserProfile::default(),
            Err(err) => {
                tracing::warn!(error = %err, "could not read profile, no close friends");
                UserProfile::default()
            }
        }
    }

    async fn dispatch_alert(&self, source: TriggerSource) -> SosResult<SosReport> {
        let effects = &self.effects;
        let user_id = &self.context.user_id;

        let coordinate = effects
            .current_position()
            .await
            .map_err(location_failure)?;

        let mut failures = Vec::new();
        let battery = self.read_battery().await;
        if battery.is_none() {
            failures.push(SosError::BatteryUnavailable);
        }
        let battery_percent = battery_percent(battery);

        let live_session = match self.live.start(self.config.live_share_duration_secs).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "sending alert without live location");
                failures.push(err);
                None
            }
        };
        let live_link = live_session.map(|id| self.live.share_link(id));

        let profile = self.read_profile().await;
        let dispatch = self
            .dispatcher
            .dispatch(
                effects.as_ref(),
                coordinate,
                battery_percent,
                live_link.as_deref(),
                &profile.close_friends,
            )
            .await;

        let record = SosAlertRecord {
            user_id: user_id.clone(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            message: dispatch.alert.text.clone(),
            street_view_images: dispatch.alert.street_view_links.clone(),
            live_location_link: dispatch.alert.live_share_link.clone(),
            battery_level: battery_percent,
            trigger: source,
        };
        let written = match record.to_document() {
            Ok(document) => effects.add(SOS_ALERTS, document).await,
            Err(err) => Err(err),
        };
        let alert_id = match written {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "sos alert record not written");
                failures.push(SosError::RecordWriteFailed {
                    collection: SOS_ALERTS.to_string(),
                    reason: err.to_string(),
                });
                None
            }
        };

        if let Err(err) = effects
            .merge(USERS, user_id.as_str(), UserProfile::last_sos_patch())
            .await
        {
            tracing::warn!(error = %err, "lastSOS not recorded");
            failures.push(SosError::RecordWriteFailed {
                collection: USERS.to_string(),
                reason: err.to_string(),
            });
        }

        tracing::info!(
            ?source,
            %coordinate,
            battery_percent,
            alert = ?alert_id,
            "sos alert dispatched"
        );
        Ok(SosReport {
            source,
            coordinate,
            battery_percent,
            live_session,
            alert_id,
            dispatch,
            failures,
        })
    }

    async fn report_delivery(&self, dispatch: &DispatchResult) {
        let summary = format!("SMS: {}. Chat: {}.", dispatch.sms.label(), dispatch.chat.label());
        let notice = if dispatch.reached_anyone() {
            UserNotice::info("SOS sent", summary)
        } else {
            UserNotice::warning("SOS could not be delivered", summary)
        };
        self.effects.notify(notice).await;
    }

    async fn report_abort(&self, err: &SosError) {
        tracing::warn!(error = %err, "sos aborted");
        let notice = match err {
            SosError::PermissionDenied(_) => UserNotice::error(
                "Location permission required",
                "Allow location access so your alert can include where you are.",
            ),
            SosError::LocationUnavailable(_) => UserNotice::error(
                "Location unavailable",
                "Your location could not be determined. Press SOS to try again.",
            ),
            other => UserNotice::error("SOS failed", other.to_string()),
        };
        self.effects.notify(notice).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(TriggerSource::Navigation).unwrap(),
            serde_json::json!("navigation")
        );
    }

    #[test]
    fn context_defaults_auto_activate_off() {
        let context = SosContext::new("u1");
        assert!(!context.auto_activate_enabled);
        assert!(context.with_auto_activate(true).auto_activate_enabled);
    }
}
